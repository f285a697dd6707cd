//! Symbolic inclusive intervals and variable scopes.

use std::collections::HashMap;

use crate::expr::Expr;
use crate::simplify::as_const_int;

/// An inclusive interval `[min, max]` with symbolic endpoints.
#[derive(Debug, Clone)]
pub struct Interval {
    pub min: Expr,
    pub max: Expr,
}

impl Interval {
    pub fn new(min: Expr, max: Expr) -> Self {
        Self { min, max }
    }

    /// The degenerate interval containing exactly one value.
    pub fn single_point(e: Expr) -> Self {
        Self { min: e.clone(), max: e }
    }

    /// If both endpoints are provably the same value, that value.
    pub fn as_single_point(&self) -> Option<Expr> {
        if self.min.same_as(&self.max) {
            return Some(self.min.clone());
        }
        match (as_const_int(&self.min), as_const_int(&self.max)) {
            (Some(a), Some(b)) if a == b => Some(self.min.clone()),
            _ => None,
        }
    }

    /// The smallest interval containing both inputs, as symbolic min/max.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval::new(
            Expr::min(self.min.clone(), other.min.clone()),
            Expr::max(self.max.clone(), other.max.clone()),
        )
    }
}

/// Maps variable names to the interval of values they range over.
#[derive(Debug, Default)]
pub struct Scope {
    entries: HashMap<String, Interval>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, interval: Interval) {
        self.entries.insert(name.to_string(), interval);
    }

    pub fn get(&self, name: &str) -> Option<&Interval> {
        self.entries.get(name)
    }
}
