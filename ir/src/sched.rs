//! Scheduling directives and the per-function schedule transcript.
//!
//! The scheduler does not lower loop nests itself; it issues directives
//! against each function, and the backend applies them when the pipeline is
//! compiled. Here the backend surface is the transcript: directives are
//! appended in application order, which makes schedules directly assertable.

use crate::expr::Expr;
use crate::func::Function;

/// A position in some function's loop nest, or the root of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopLevel {
    Root,
    At { func: String, var: String },
}

impl LoopLevel {
    pub fn root() -> Self {
        Self::Root
    }

    pub fn at(func: &str, var: &str) -> Self {
        Self::At { func: func.to_string(), var: var.to_string() }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

/// One scheduling directive issued against a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ComputeRoot,
    ComputeAt(LoopLevel),
    StoreAt(LoopLevel),
    Split { old: String, outer: String, inner: String, factor: i64 },
    Fuse { inner: String, outer: String, fused: String },
    Reorder { vars: Vec<String> },
    Vectorize { var: String, width: i64 },
    Unroll { var: String },
    Parallel { var: String, task_size: Option<i64> },
}

/// An output bounds estimate: `var` ranges over `[min, min + extent)`.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub var: String,
    pub min: Expr,
    pub extent: Expr,
}

/// Everything scheduled onto a single function.
#[derive(Debug, Clone, Default)]
pub struct FuncSchedule {
    pub estimates: Vec<Estimate>,
    pub directives: Vec<Directive>,
}

impl Function {
    fn push_directive(&self, d: Directive) {
        self.schedule_mut().directives.push(d);
    }

    pub fn compute_root(&self) {
        self.push_directive(Directive::ComputeRoot);
    }

    pub fn compute_at(&self, level: LoopLevel) {
        self.push_directive(Directive::ComputeAt(level));
    }

    pub fn store_at(&self, level: LoopLevel) {
        self.push_directive(Directive::StoreAt(level));
    }

    pub fn split(&self, old: &str, outer: &str, inner: &str, factor: i64) {
        self.push_directive(Directive::Split {
            old: old.to_string(),
            outer: outer.to_string(),
            inner: inner.to_string(),
            factor,
        });
    }

    pub fn fuse(&self, inner: &str, outer: &str, fused: &str) {
        self.push_directive(Directive::Fuse {
            inner: inner.to_string(),
            outer: outer.to_string(),
            fused: fused.to_string(),
        });
    }

    pub fn reorder(&self, vars: Vec<String>) {
        self.push_directive(Directive::Reorder { vars });
    }

    pub fn vectorize(&self, var: &str, width: i64) {
        self.push_directive(Directive::Vectorize { var: var.to_string(), width });
    }

    pub fn unroll(&self, var: &str) {
        self.push_directive(Directive::Unroll { var: var.to_string() });
    }

    pub fn parallel(&self, var: &str) {
        self.push_directive(Directive::Parallel { var: var.to_string(), task_size: None });
    }

    pub fn parallel_tasks(&self, var: &str, task_size: i64) {
        self.push_directive(Directive::Parallel { var: var.to_string(), task_size: Some(task_size) });
    }
}
