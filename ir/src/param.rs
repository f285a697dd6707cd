//! Scalar and buffer parameters with user-supplied estimates.
//!
//! Parameters are runtime inputs to a pipeline. The scheduler cannot reason
//! about them symbolically, so the user supplies estimates: a single value
//! for scalars, per-dimension `(min, extent)` bounds for buffers. Buffer
//! bounds surface in expressions as the variables `<name>.min.<i>` and
//! `<name>.extent.<i>`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dtype::DType;
use crate::expr::Expr;

enum ParamKind {
    Scalar {
        estimate: RefCell<Option<Expr>>,
    },
    Buffer {
        dimensions: usize,
        mins: RefCell<Vec<Option<Expr>>>,
        extents: RefCell<Vec<Option<Expr>>>,
    },
}

struct ParamContents {
    name: String,
    dtype: DType,
    kind: ParamKind,
}

/// Cheap-clone handle to a pipeline parameter; identity is by allocation.
#[derive(Clone)]
pub struct Param(Rc<ParamContents>);

impl Param {
    pub fn scalar(name: &str, dtype: DType) -> Self {
        Self(Rc::new(ParamContents {
            name: name.to_string(),
            dtype,
            kind: ParamKind::Scalar { estimate: RefCell::new(None) },
        }))
    }

    pub fn buffer(name: &str, dtype: DType, dimensions: usize) -> Self {
        Self(Rc::new(ParamContents {
            name: name.to_string(),
            dtype,
            kind: ParamKind::Buffer {
                dimensions,
                mins: RefCell::new(vec![None; dimensions]),
                extents: RefCell::new(vec![None; dimensions]),
            },
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn dtype(&self) -> DType {
        self.0.dtype
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.0.kind, ParamKind::Buffer { .. })
    }

    pub fn dimensions(&self) -> usize {
        match &self.0.kind {
            ParamKind::Scalar { .. } => 0,
            ParamKind::Buffer { dimensions, .. } => *dimensions,
        }
    }

    /// Set the estimated value of a scalar parameter.
    pub fn set_estimate(&self, value: i64) {
        let ParamKind::Scalar { estimate } = &self.0.kind else {
            panic!("set_estimate called on buffer parameter \"{}\"", self.name());
        };
        *estimate.borrow_mut() = Some(Expr::int(value));
    }

    /// Set the estimated bounds of one dimension of a buffer parameter.
    pub fn set_bounds_estimate(&self, dim: usize, min: i64, extent: i64) {
        let ParamKind::Buffer { mins, extents, .. } = &self.0.kind else {
            panic!("set_bounds_estimate called on scalar parameter \"{}\"", self.name());
        };
        mins.borrow_mut()[dim] = Some(Expr::int(min));
        extents.borrow_mut()[dim] = Some(Expr::int(extent));
    }

    pub fn get_estimate(&self) -> Option<Expr> {
        match &self.0.kind {
            ParamKind::Scalar { estimate } => estimate.borrow().clone(),
            ParamKind::Buffer { .. } => None,
        }
    }

    pub fn min_constraint_estimate(&self, i: usize) -> Option<Expr> {
        match &self.0.kind {
            ParamKind::Buffer { mins, .. } => mins.borrow().get(i).cloned().flatten(),
            ParamKind::Scalar { .. } => None,
        }
    }

    pub fn extent_constraint_estimate(&self, i: usize) -> Option<Expr> {
        match &self.0.kind {
            ParamKind::Buffer { extents, .. } => extents.borrow().get(i).cloned().flatten(),
            ParamKind::Scalar { .. } => None,
        }
    }

    /// A scalar parameter as an expression.
    pub fn expr(&self) -> Expr {
        Expr::param_var(self.name(), self.clone(), self.dtype())
    }

    /// The `<name>.min.<i>` bound variable of a buffer parameter.
    pub fn min_var(&self, i: usize) -> Expr {
        Expr::param_var(&format!("{}.min.{i}", self.name()), self.clone(), DType::Int32)
    }

    /// The `<name>.extent.<i>` bound variable of a buffer parameter.
    pub fn extent_var(&self, i: usize) -> Expr {
        Expr::param_var(&format!("{}.extent.{i}", self.name()), self.clone(), DType::Int32)
    }

    pub fn same_as(&self, other: &Param) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Param({})", self.name())
    }
}
