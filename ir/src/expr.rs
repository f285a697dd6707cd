//! Reference-counted immutable expression trees.
//!
//! Expressions describe the right-hand side of pipeline function definitions
//! and the symbolic bounds the scheduler propagates through producer/consumer
//! edges. Nodes are shared through `Rc`; rebuilding a tree only allocates the
//! spine that actually changed.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dtype::DType;
use crate::func::Function;
use crate::param::Param;

/// Binary operation over two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

/// What a call expression refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Another pipeline function.
    Pipeline,
    /// An input image (never scheduled, bounds still collected).
    Image,
    /// An opaque external function.
    Extern,
}

/// Expression node payload. Access through [`Expr::kind`].
#[derive(Debug)]
pub enum ExprKind {
    IntImm(i64),
    UIntImm(u64),
    FloatImm(f64),
    Var {
        name: String,
        param: Option<Param>,
    },
    Binary {
        op: BinaryOp,
        a: Expr,
        b: Expr,
    },
    Call {
        kind: CallKind,
        name: String,
        func: Option<Function>,
        args: Vec<Expr>,
    },
}

struct ExprNode {
    kind: ExprKind,
    dtype: DType,
}

/// A shared, immutable expression.
#[derive(Clone)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    fn make(kind: ExprKind, dtype: DType) -> Self {
        Self(Rc::new(ExprNode { kind, dtype }))
    }

    /// A signed 32-bit integer literal.
    pub fn int(v: i64) -> Self {
        Self::make(ExprKind::IntImm(v), DType::Int32)
    }

    /// An unsigned integer literal.
    pub fn uint(v: u64) -> Self {
        Self::make(ExprKind::UIntImm(v), DType::UInt16)
    }

    /// A 32-bit float literal.
    pub fn float(v: f64) -> Self {
        Self::make(ExprKind::FloatImm(v), DType::Float32)
    }

    /// A free integer variable (loop coordinate or symbolic bound).
    pub fn var(name: &str) -> Self {
        Self::make(ExprKind::Var { name: name.to_string(), param: None }, DType::Int32)
    }

    /// A variable bound to a parameter (see [`Param`]).
    pub fn param_var(name: &str, param: Param, dtype: DType) -> Self {
        Self::make(ExprKind::Var { name: name.to_string(), param: Some(param) }, dtype)
    }

    pub fn binary(op: BinaryOp, a: Expr, b: Expr) -> Self {
        let dtype = a.dtype();
        Self::make(ExprKind::Binary { op, a, b }, dtype)
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::binary(BinaryOp::Max, a, b)
    }

    pub fn call(kind: CallKind, name: &str, func: Option<Function>, args: Vec<Expr>, dtype: DType) -> Self {
        Self::make(ExprKind::Call { kind, name: name.to_string(), func, args }, dtype)
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn dtype(&self) -> DType {
        self.0.dtype
    }

    /// Identity comparison (same allocation).
    pub fn same_as(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Preorder walk over every node of the tree.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self.kind() {
            ExprKind::Binary { a, b, .. } => {
                a.visit(f);
                b.visit(f);
            }
            ExprKind::Call { args, .. } => {
                for a in args {
                    a.visit(f);
                }
            }
            _ => {}
        }
    }
}

/// Replace every variable named in `map` with its substitute.
pub fn substitute(map: &HashMap<String, Expr>, e: &Expr) -> Expr {
    match e.kind() {
        ExprKind::Var { name, .. } => match map.get(name) {
            Some(replacement) => replacement.clone(),
            None => e.clone(),
        },
        ExprKind::Binary { op, a, b } => Expr::binary(*op, substitute(map, a), substitute(map, b)),
        ExprKind::Call { kind, name, func, args } => {
            let args = args.iter().map(|a| substitute(map, a)).collect();
            Expr::call(*kind, name, func.clone(), args, e.dtype())
        }
        _ => e.clone(),
    }
}

macro_rules! binary_operators {
    ($($trait:ident, $method:ident => $op:ident),+ $(,)?) => {$(
        impl std::ops::$trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary(BinaryOp::$op, self, rhs)
            }
        }

        impl std::ops::$trait for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::binary(BinaryOp::$op, self.clone(), rhs.clone())
            }
        }

        impl std::ops::$trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary(BinaryOp::$op, self.clone(), rhs)
            }
        }

        impl std::ops::$trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::binary(BinaryOp::$op, self, rhs.clone())
            }
        }

        impl std::ops::$trait<i64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                Expr::binary(BinaryOp::$op, self, Expr::int(rhs))
            }
        }

        impl std::ops::$trait<i64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                Expr::binary(BinaryOp::$op, self.clone(), Expr::int(rhs))
            }
        }

        impl std::ops::$trait<Expr> for i64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary(BinaryOp::$op, Expr::int(self), rhs)
            }
        }
    )+}
}

binary_operators! {
    Add, add => Add,
    Sub, sub => Sub,
    Mul, mul => Mul,
    Div, div => Div,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::IntImm(v) => write!(f, "{v}"),
            ExprKind::UIntImm(v) => write!(f, "{v}"),
            ExprKind::FloatImm(v) => write!(f, "{v}"),
            ExprKind::Var { name, .. } => write!(f, "{name}"),
            ExprKind::Binary { op: BinaryOp::Min, a, b } => write!(f, "min({a}, {b})"),
            ExprKind::Binary { op: BinaryOp::Max, a, b } => write!(f, "max({a}, {b})"),
            ExprKind::Binary { op, a, b } => {
                let sym = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Min | BinaryOp::Max => unreachable!(),
                };
                write!(f, "({a} {sym} {b})")
            }
            ExprKind::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
