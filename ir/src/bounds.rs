//! Required-region queries over index expressions.
//!
//! `boxes_required` answers: for every function or image called inside an
//! expression, which region of it is touched, as symbolic intervals in the
//! variables of the given scope? This is the only bounds facility the
//! scheduler needs; regions of multiple call sites to the same callee are
//! merged with a genuine interval union.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::error::{DivisionByZeroInBoundsSnafu, NonAffineIndexSnafu, Result};
use crate::expr::{BinaryOp, CallKind, Expr, ExprKind};
use crate::interval::{Interval, Scope};
use crate::simplify::{as_const_int, simplify};

/// The region of a callee touched by some expression: one interval per
/// dimension, in call-argument order.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub bounds: Vec<Interval>,
}

/// Compute the region required of every pipeline function and input image
/// called within `expr`, given the ranges of the free variables.
///
/// The result is keyed by callee name; the map is ordered so that callers
/// iterating it are deterministic.
pub fn boxes_required(expr: &Expr, scope: &Scope) -> Result<BTreeMap<String, Region>> {
    let mut boxes = BTreeMap::new();
    collect(expr, scope, &mut boxes)?;
    Ok(boxes)
}

fn collect(e: &Expr, scope: &Scope, boxes: &mut BTreeMap<String, Region>) -> Result<()> {
    if let ExprKind::Call { kind: CallKind::Pipeline | CallKind::Image, name, args, .. } = e.kind() {
        let mut required = Region::default();
        for a in args {
            required.bounds.push(bounds_of_expr_in_scope(a, scope)?);
        }
        match boxes.entry(name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(required);
            }
            Entry::Occupied(mut slot) => {
                for (have, add) in slot.get_mut().bounds.iter_mut().zip(&required.bounds) {
                    let u = have.union(add);
                    *have = Interval::new(simplify(&u.min), simplify(&u.max));
                }
            }
        }
    }
    match e.kind() {
        ExprKind::Binary { a, b, .. } => {
            collect(a, scope, boxes)?;
            collect(b, scope, boxes)?;
        }
        ExprKind::Call { args, .. } => {
            for a in args {
                collect(a, scope, boxes)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// The interval of values an expression can take when its free variables
/// range over the scope.
pub fn bounds_of_expr_in_scope(e: &Expr, scope: &Scope) -> Result<Interval> {
    let interval = match e.kind() {
        ExprKind::IntImm(_) | ExprKind::UIntImm(_) | ExprKind::FloatImm(_) => Interval::single_point(e.clone()),
        ExprKind::Var { name, .. } => match scope.get(name) {
            Some(i) => i.clone(),
            // Free variables (parameters, symbolic bounds) are constant
            // with respect to the scope.
            None => Interval::single_point(e.clone()),
        },
        ExprKind::Call { name, .. } => {
            return NonAffineIndexSnafu { callee: name.clone() }.fail();
        }
        ExprKind::Binary { op, a, b } => {
            let ia = bounds_of_expr_in_scope(a, scope)?;
            let ib = bounds_of_expr_in_scope(b, scope)?;
            match op {
                BinaryOp::Add => interval_of(&ia.min + &ib.min, &ia.max + &ib.max),
                BinaryOp::Sub => interval_of(&ia.min - &ib.max, &ia.max - &ib.min),
                BinaryOp::Mul => mul_bounds(&ia, &ib),
                BinaryOp::Div => div_bounds(&ia, &ib)?,
                BinaryOp::Min => {
                    interval_of(Expr::min(ia.min.clone(), ib.min.clone()), Expr::min(ia.max.clone(), ib.max.clone()))
                }
                BinaryOp::Max => {
                    interval_of(Expr::max(ia.min.clone(), ib.min.clone()), Expr::max(ia.max.clone(), ib.max.clone()))
                }
            }
        }
    };
    Ok(interval)
}

fn interval_of(min: Expr, max: Expr) -> Interval {
    Interval::new(simplify(&min), simplify(&max))
}

fn mul_bounds(ia: &Interval, ib: &Interval) -> Interval {
    if let Some(b) = ib.as_single_point() {
        return scale_bounds(ia, &b, BinaryOp::Mul);
    }
    if let Some(a) = ia.as_single_point() {
        return scale_bounds(ib, &a, BinaryOp::Mul);
    }
    // General products: extremes lie among the four endpoint products.
    let products = [&ia.min * &ib.min, &ia.min * &ib.max, &ia.max * &ib.min, &ia.max * &ib.max];
    envelope(&products)
}

fn div_bounds(ia: &Interval, ib: &Interval) -> Result<Interval> {
    if let Some(b) = ib.as_single_point() {
        if as_const_int(&b) == Some(0) {
            return DivisionByZeroInBoundsSnafu.fail();
        }
        return Ok(scale_bounds(ia, &b, BinaryOp::Div));
    }
    let quotients = [&ia.min / &ib.min, &ia.min / &ib.max, &ia.max / &ib.min, &ia.max / &ib.max];
    Ok(envelope(&quotients))
}

// Scale an interval by a single-point factor, flipping endpoints when the
// factor is a known negative constant. An unknown-sign factor falls back to
// the min/max envelope of both orientations.
fn scale_bounds(i: &Interval, factor: &Expr, op: BinaryOp) -> Interval {
    let lo = Expr::binary(op, i.min.clone(), factor.clone());
    let hi = Expr::binary(op, i.max.clone(), factor.clone());
    match as_const_int(factor) {
        Some(c) if c >= 0 => interval_of(lo, hi),
        Some(_) => interval_of(hi, lo),
        None => envelope(&[lo, hi]),
    }
}

fn envelope(candidates: &[Expr]) -> Interval {
    let mut min = candidates[0].clone();
    let mut max = candidates[0].clone();
    for c in &candidates[1..] {
        min = Expr::min(min, c.clone());
        max = Expr::max(max, c.clone());
    }
    interval_of(min, max)
}
