//! Environment population and realization order.

use std::collections::{HashMap, HashSet};

use crate::error::{CyclicPipelineSnafu, Result};
use crate::expr::{CallKind, Expr, ExprKind};
use crate::func::Function;

/// Functions called directly from `func`'s definitions, in first-use order.
pub fn direct_callees(func: &Function) -> Vec<Function> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut record = |e: &Expr| {
        if let ExprKind::Call { kind: CallKind::Pipeline, name, func: Some(callee), .. } = e.kind()
            && seen.insert(name.clone())
        {
            out.push(callee.clone());
        }
    };
    for v in func.values() {
        v.visit(&mut record);
    }
    for u in func.updates() {
        for a in &u.args {
            a.visit(&mut record);
        }
        for v in &u.values {
            v.visit(&mut record);
        }
    }
    out
}

/// Collect every function reachable from `func` into `env`, keyed by name.
pub fn populate_environment(func: &Function, env: &mut HashMap<String, Function>) {
    if env.contains_key(&func.name()) {
        return;
    }
    env.insert(func.name(), func.clone());
    for callee in direct_callees(func) {
        populate_environment(&callee, env);
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

fn visit(
    func: &Function,
    env: &HashMap<String, Function>,
    marks: &mut HashMap<String, Mark>,
    order: &mut Vec<String>,
) -> Result<()> {
    let name = func.name();
    match marks.get(&name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => return CyclicPipelineSnafu { func: name }.fail(),
        None => {}
    }
    marks.insert(name.clone(), Mark::Visiting);
    for callee in direct_callees(func) {
        // Resolve through the environment so aliased handles share one entry.
        if let Some(resolved) = env.get(&callee.name()) {
            visit(resolved, env, marks, order)?;
        }
    }
    marks.insert(name.clone(), Mark::Done);
    order.push(name);
    Ok(())
}

/// A topological order over `env`: every producer precedes its consumers,
/// outputs come last. Cycles are rejected.
pub fn realization_order(outputs: &[Function], env: &HashMap<String, Function>) -> Result<Vec<String>> {
    let mut marks = HashMap::new();
    let mut order = Vec::new();
    for o in outputs {
        visit(o, env, &mut marks, &mut order)?;
    }
    tracing::debug!(?order, "realization order");
    Ok(order)
}
