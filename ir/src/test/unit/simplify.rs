//! Unit tests for constant folding.

use test_case::test_case;

use crate::expr::Expr;
use crate::simplify::{as_const_int, simplify};

#[test_case(Expr::int(2) + Expr::int(3), 5 ; "add")]
#[test_case(Expr::int(2) - Expr::int(7), -5 ; "sub")]
#[test_case(Expr::int(4) * Expr::int(3), 12 ; "mul")]
#[test_case(Expr::int(7) / Expr::int(2), 3 ; "div")]
#[test_case(Expr::int(-7) / Expr::int(2), -4 ; "div_rounds_toward_negative_infinity")]
#[test_case(Expr::min(Expr::int(2), Expr::int(3)), 2 ; "min")]
#[test_case(Expr::max(Expr::int(2), Expr::int(3)), 3 ; "max")]
#[test_case(Expr::min(Expr::int(2) + Expr::int(3), Expr::int(10) - Expr::int(1)), 5 ; "nested")]
fn test_constant_folding(e: Expr, expected: i64) {
    assert_eq!(as_const_int(&simplify(&e)), Some(expected));
}

#[test]
fn test_identities() {
    let x = Expr::var("x");
    assert!(simplify(&(&x + 0)).same_as(&x));
    assert!(simplify(&(0 + x.clone())).same_as(&x));
    assert!(simplify(&(&x - 0)).same_as(&x));
    assert!(simplify(&(&x * 1)).same_as(&x));
    assert!(simplify(&(1 * x.clone())).same_as(&x));
    assert!(simplify(&(&x / 1)).same_as(&x));
    assert_eq!(as_const_int(&simplify(&(&x * 0))), Some(0));
}

#[test]
fn test_division_by_zero_left_unfolded() {
    let e = Expr::int(4) / Expr::int(0);
    assert_eq!(as_const_int(&simplify(&e)), None);
}

#[test]
fn test_free_variables_survive() {
    let x = Expr::var("x");
    let s = simplify(&((&x + 1) + 2));
    assert_eq!(as_const_int(&s), None);
    assert_eq!(s.to_string(), "((x + 1) + 2)");
}

#[test]
fn test_as_const_int() {
    assert_eq!(as_const_int(&Expr::int(-3)), Some(-3));
    assert_eq!(as_const_int(&Expr::uint(3)), Some(3));
    assert_eq!(as_const_int(&Expr::var("x")), None);
    assert_eq!(as_const_int(&Expr::float(3.0)), None);
}
