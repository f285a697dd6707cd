//! Pipeline builders shared across the scheduler test suites.

use mosaic_ir::{Expr, Function};

/// A three-stage pointwise chain over a 1000x1000 output. Everything should
/// end up fused into the output.
pub fn pointwise_pipeline() -> (Function, Function, Function) {
    let x = Expr::var("x");
    let y = Expr::var("y");
    let f = Function::new("f", &["x", "y"]);
    f.define(vec![(&x + &y) * (&x + &y)]);
    let g = Function::new("g", &["x", "y"]);
    g.define(vec![f.at(vec![x.clone(), y.clone()]) * 2 + 1]);
    let h = Function::new("h", &["x", "y"]);
    h.define(vec![g.at(vec![x.clone(), y.clone()]) * 2 + 1]);
    h.set_estimate("x", 0, 1000);
    h.set_estimate("y", 0, 1000);
    (f, g, h)
}

/// Two stages that each sum 100 distant samples of the previous one:
/// expensive everywhere, with enormous stencil footprints.
pub fn gather_pipeline() -> (Function, Function, Function) {
    let x = Expr::var("x");
    let y = Expr::var("y");
    let f = Function::new("f", &["x", "y"]);
    f.define(vec![
        (&x + &y) * (&x + 2 * y.clone()) * (&x + 3 * y.clone()) * (&x + 4 * y.clone()) * (&x + 5 * y.clone()),
    ]);
    let g = Function::new("g", &["x", "y"]);
    let mut e = Expr::int(0);
    for i in 0..100 {
        e = e + f.at(vec![&x + i * 10, &y + i * 10]);
    }
    g.define(vec![e]);
    let h = Function::new("h", &["x", "y"]);
    let mut e = Expr::int(0);
    for i in 0..100 {
        e = e + g.at(vec![&x + i * 10, &y + i * 10]);
    }
    h.define(vec![e]);
    h.set_estimate("x", 0, 1000);
    h.set_estimate("y", 0, 1000);
    (f, g, h)
}

/// A moderate isotropic stencil: h reads f at the corners of an 18x18
/// neighborhood of a 2048x2048 output.
pub fn wide_stencil_pipeline() -> (Function, Function) {
    let x = Expr::var("x");
    let y = Expr::var("y");
    let f = Function::new("f", &["x", "y"]);
    f.define(vec![(&x + &y) * (&x + 2 * y.clone()) * (&x + 3 * y.clone())]);
    let h = Function::new("h", &["x", "y"]);
    h.define(vec![
        f.at(vec![&x - 9, &y - 9])
            + f.at(vec![&x + 9, &y + 9])
            + f.at(vec![&x - 9, &y + 9])
            + f.at(vec![&x + 9, &y - 9]),
    ]);
    h.set_estimate("x", 0, 2048);
    h.set_estimate("y", 0, 2048);
    (f, h)
}

/// A tight 2x2 stencil over the same output size.
pub fn tight_stencil_pipeline() -> (Function, Function) {
    let x = Expr::var("x");
    let y = Expr::var("y");
    let f = Function::new("f", &["x", "y"]);
    f.define(vec![(&x + &y) * (&x + 2 * y.clone()) * (&x + 3 * y.clone())]);
    let h = Function::new("h", &["x", "y"]);
    h.define(vec![
        f.at(vec![x.clone(), y.clone()])
            + f.at(vec![&x + 1, &y + 1])
            + f.at(vec![x.clone(), &y + 1])
            + f.at(vec![&x + 1, y.clone()]),
    ]);
    h.set_estimate("x", 0, 2048);
    h.set_estimate("y", 0, 2048);
    (f, h)
}

/// An n-stage chain of 5x5 box stencils over a 2048x2048 output. Returns the
/// stages in definition order; the last one is the output.
pub fn stencil_chain_pipeline(n: usize) -> Vec<Function> {
    assert!(n >= 2);
    let x = Expr::var("x");
    let y = Expr::var("y");
    let mut stages = Vec::with_capacity(n);
    let first = Function::new("stage0", &["x", "y"]);
    first.define(vec![(&x + &y) * (&x + 2 * y.clone()) * (&x + 3 * y.clone())]);
    stages.push(first);
    for i in 1..n {
        let stage = Function::new(&format!("stage{i}"), &["x", "y"]);
        let mut e = Expr::int(0);
        for dy in -2i64..=2 {
            for dx in -2i64..=2 {
                e = e + stages[i - 1].at(vec![&x + dx, &y + dy]);
            }
        }
        stage.define(vec![e]);
        stages.push(stage);
    }
    let last = stages.last().unwrap();
    last.set_estimate("x", 0, 2048);
    last.set_estimate("y", 0, 2048);
    stages
}
