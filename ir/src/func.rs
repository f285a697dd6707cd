//! Pipeline function handles.
//!
//! A [`Function`] is a pure stage mapping an integer index to a tuple of
//! values. Handles are cheap clones of a shared allocation; identity (and
//! therefore `Eq`/`Hash`) is by allocation, matching the host compiler's
//! `same_as` discipline.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::dtype::DType;
use crate::expr::{CallKind, Expr};
use crate::sched::{Estimate, FuncSchedule};

/// An update definition: in-place accumulation on top of the pure definition.
/// The auto-scheduler does not support these; they exist so that the error
/// path can be exercised.
#[derive(Debug, Clone)]
pub struct UpdateDefinition {
    pub args: Vec<Expr>,
    pub values: Vec<Expr>,
}

struct FuncContents {
    name: String,
    args: Vec<String>,
    values: Vec<Expr>,
    updates: Vec<UpdateDefinition>,
    schedule: FuncSchedule,
}

/// Cheap-clone handle to a pipeline function.
#[derive(Clone)]
pub struct Function(Rc<RefCell<FuncContents>>);

impl Function {
    pub fn new(name: &str, args: &[&str]) -> Self {
        Self(Rc::new(RefCell::new(FuncContents {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            values: Vec::new(),
            updates: Vec::new(),
            schedule: FuncSchedule::default(),
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Dimension (argument) names, outermost last.
    pub fn args(&self) -> Vec<String> {
        self.0.borrow().args.clone()
    }

    pub fn dimensions(&self) -> usize {
        self.0.borrow().args.len()
    }

    /// The pure definition's value expressions.
    pub fn values(&self) -> Vec<Expr> {
        self.0.borrow().values.clone()
    }

    pub fn updates(&self) -> Vec<UpdateDefinition> {
        self.0.borrow().updates.clone()
    }

    pub fn has_updates(&self) -> bool {
        !self.0.borrow().updates.is_empty()
    }

    /// Install the pure definition.
    pub fn define(&self, values: Vec<Expr>) {
        assert!(!values.is_empty(), "a definition needs at least one value");
        self.0.borrow_mut().values = values;
    }

    /// Install an update definition on top of the pure one.
    pub fn define_update(&self, args: Vec<Expr>, values: Vec<Expr>) {
        self.0.borrow_mut().updates.push(UpdateDefinition { args, values });
    }

    /// Call this function at the given index.
    pub fn at(&self, args: Vec<Expr>) -> Expr {
        assert_eq!(args.len(), self.dimensions(), "wrong arity in call to \"{}\"", self.name());
        let dtype = self.0.borrow().values.first().map_or(DType::Int32, Expr::dtype);
        Expr::call(CallKind::Pipeline, &self.name(), Some(self.clone()), args, dtype)
    }

    /// Record an output bounds estimate for one dimension.
    pub fn set_estimate(&self, var: &str, min: i64, extent: i64) {
        self.0.borrow_mut().schedule.estimates.push(Estimate {
            var: var.to_string(),
            min: Expr::int(min),
            extent: Expr::int(extent),
        });
    }

    pub fn schedule(&self) -> Ref<'_, FuncSchedule> {
        Ref::map(self.0.borrow(), |c| &c.schedule)
    }

    pub(crate) fn schedule_mut(&self) -> RefMut<'_, FuncSchedule> {
        RefMut::map(self.0.borrow_mut(), |c| &mut c.schedule)
    }

    pub fn same_as(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.0.borrow().name)
    }
}
