//! Unit tests for environment population and realization order.

use std::collections::HashMap;

use crate::error::Error;
use crate::expr::Expr;
use crate::func::Function;
use crate::order::{direct_callees, populate_environment, realization_order};

fn chain() -> (Function, Function, Function) {
    let x = Expr::var("x");
    let f = Function::new("f", &["x"]);
    f.define(vec![&x * 2]);
    let g = Function::new("g", &["x"]);
    g.define(vec![f.at(vec![x.clone()]) + 1]);
    let h = Function::new("h", &["x"]);
    h.define(vec![g.at(vec![x.clone()]) + 1]);
    (f, g, h)
}

#[test]
fn test_populate_environment_transitive() {
    let (_, _, h) = chain();
    let mut env = HashMap::new();
    populate_environment(&h, &mut env);
    assert_eq!(env.len(), 3);
    assert!(env.contains_key("f"));
    assert!(env.contains_key("g"));
    assert!(env.contains_key("h"));
}

#[test]
fn test_direct_callees_deduplicated() {
    let x = Expr::var("x");
    let f = Function::new("f", &["x"]);
    f.define(vec![&x * 2]);
    let g = Function::new("g", &["x"]);
    g.define(vec![f.at(vec![&x - 1]) + f.at(vec![&x + 1])]);
    let callees = direct_callees(&g);
    assert_eq!(callees.len(), 1);
    assert!(callees[0].same_as(&f));
}

#[test]
fn test_realization_order_producers_first() {
    let (_, _, h) = chain();
    let mut env = HashMap::new();
    populate_environment(&h, &mut env);
    let order = realization_order(&[h], &env).unwrap();
    assert_eq!(order, vec!["f", "g", "h"]);
}

#[test]
fn test_realization_order_shared_producer() {
    // h consumes both g1 and g2, which share f.
    let x = Expr::var("x");
    let f = Function::new("f", &["x"]);
    f.define(vec![&x * 2]);
    let g1 = Function::new("g1", &["x"]);
    g1.define(vec![f.at(vec![x.clone()]) + 1]);
    let g2 = Function::new("g2", &["x"]);
    g2.define(vec![f.at(vec![&x + 10]) + 1]);
    let h = Function::new("h", &["x"]);
    h.define(vec![g1.at(vec![x.clone()]) + g2.at(vec![x.clone()])]);

    let mut env = HashMap::new();
    populate_environment(&h, &mut env);
    let order = realization_order(&[h.clone()], &env).unwrap();
    assert_eq!(order, vec!["f", "g1", "g2", "h"]);
}

#[test]
fn test_cycle_rejected() {
    let x = Expr::var("x");
    let f = Function::new("f", &["x"]);
    let g = Function::new("g", &["x"]);
    f.define(vec![g.at(vec![x.clone()]) + 1]);
    g.define(vec![f.at(vec![x.clone()]) + 1]);

    let mut env = HashMap::new();
    populate_environment(&f, &mut env);
    let err = realization_order(&[f], &env).unwrap_err();
    assert!(matches!(err, Error::CyclicPipeline { .. }));
}
