//! Bottom-up constant folding for bounds expressions.
//!
//! Bounds expressions are built from integer literals, symbolic region
//! variables and the six binary operations. Once the scheduler substitutes
//! concrete loop bounds and parameter estimates, every expression here must
//! fold to a single integer; [`as_const_int`] extracts it.

use crate::expr::{BinaryOp, Expr, ExprKind};

/// Recursively fold constants and strip arithmetic identities.
pub fn simplify(e: &Expr) -> Expr {
    let ExprKind::Binary { op, a, b } = e.kind() else {
        return e.clone();
    };
    let a = simplify(a);
    let b = simplify(b);
    let ca = as_const_int(&a);
    let cb = as_const_int(&b);
    if let (Some(x), Some(y)) = (ca, cb)
        && let Some(v) = fold(*op, x, y)
    {
        return Expr::int(v);
    }
    match op {
        BinaryOp::Add => {
            if ca == Some(0) {
                return b;
            }
            if cb == Some(0) {
                return a;
            }
        }
        BinaryOp::Sub => {
            if cb == Some(0) {
                return a;
            }
        }
        BinaryOp::Mul => {
            if ca == Some(1) {
                return b;
            }
            if cb == Some(1) {
                return a;
            }
            if ca == Some(0) || cb == Some(0) {
                return Expr::int(0);
            }
        }
        BinaryOp::Div => {
            if cb == Some(1) {
                return a;
            }
        }
        BinaryOp::Min | BinaryOp::Max => {}
    }
    Expr::binary(*op, a, b)
}

fn fold(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0 {
                return None;
            }
            div_floor(a, b)
        }
        BinaryOp::Min => a.min(b),
        BinaryOp::Max => a.max(b),
    })
}

// Division rounds toward negative infinity, matching loop-bound semantics.
fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }
}

/// Extract an integer constant, if the expression is one.
pub fn as_const_int(e: &Expr) -> Option<i64> {
    match e.kind() {
        ExprKind::IntImm(v) => Some(*v),
        ExprKind::UIntImm(v) => i64::try_from(*v).ok(),
        _ => None,
    }
}
