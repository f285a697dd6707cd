//! Pipeline front end and symbolic analysis for the mosaic auto-scheduler.
//!
//! This crate provides the narrow host surface the scheduler searches over:
//!
//! - [`expr`] - shared immutable expression trees with a single visitor
//! - [`func`] - pipeline function handles, definitions and estimates
//! - [`param`] - scalar/buffer parameters with user estimates
//! - [`interval`] / [`bounds`] - symbolic intervals and required-region queries
//! - [`simplify`] - constant folding for bounds expressions
//! - [`order`] - environment population and realization order
//! - [`sched`] - scheduling directives recorded per function
//!
//! The scheduler itself lives in `mosaic-schedule`; nothing here depends on
//! how schedules are chosen.

pub mod bounds;
pub mod dtype;
pub mod error;
pub mod expr;
pub mod func;
pub mod interval;
pub mod order;
pub mod param;
pub mod sched;
pub mod simplify;

#[cfg(test)]
pub mod test;

pub use bounds::{Region, bounds_of_expr_in_scope, boxes_required};
pub use dtype::DType;
pub use error::{Error, Result};
pub use expr::{BinaryOp, CallKind, Expr, ExprKind, substitute};
pub use func::{Function, UpdateDefinition};
pub use interval::{Interval, Scope};
pub use order::{direct_callees, populate_environment, realization_order};
pub use param::Param;
pub use sched::{Directive, Estimate, FuncSchedule, LoopLevel};
pub use simplify::{as_const_int, simplify};
