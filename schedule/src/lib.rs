//! Top-down beam-search auto-scheduler for mosaic pipelines.
//!
//! Given a pipeline of pure array-valued functions and output bounds
//! estimates, decide for every non-output function whether it is inlined or
//! realized, where its storage and compute sit in its consumers' loop nests,
//! how every realized nest is tiled, and where parallelism, vectorization
//! and unrolling apply.
//!
//! # Module Organization
//!
//! - [`dag`] - the immutable function DAG with cost coefficients
//! - [`tree`] - partial-schedule trees with memoized bounds propagation
//! - [`cost`] - the cost model over partial schedules
//! - [`tilings`] - tile-shape enumeration
//! - [`search`] - search states and the beam-search driver
//! - [`apply`] - materializing the winning tree into directives
//! - [`config`] - machine parameters and environment configuration
//!
//! # Example
//!
//! ```ignore
//! use mosaic_ir::{Expr, Function};
//! use mosaic_schedule::{MachineParams, Target, generate_schedules_top_down};
//!
//! let x = Expr::var("x");
//! let y = Expr::var("y");
//! let f = Function::new("f", &["x", "y"]);
//! f.define(vec![(&x + &y) * (&x + &y)]);
//! let g = Function::new("g", &["x", "y"]);
//! g.define(vec![f.at(vec![x.clone(), y.clone()]) * 2 + 1]);
//! g.set_estimate("x", 0, 1000);
//! g.set_estimate("y", 0, 1000);
//!
//! let params = MachineParams::default();
//! generate_schedules_top_down(&[g.clone()], &Target::host(), &params)?;
//! // g now carries compute_root/vectorize/parallel/... directives.
//! ```

use std::time::Instant;

use mosaic_ir::Function;

pub mod apply;
pub mod config;
pub mod cost;
pub mod dag;
pub mod error;
pub mod search;
pub mod tilings;
pub mod tree;

#[cfg(test)]
pub mod test;

pub use config::{MachineParams, SearchConfig, Target};
pub use cost::CostBreakdown;
pub use dag::{Edge, EdgeId, FunctionDAG, Node, NodeId};
pub use error::{Error, Result};
pub use search::{State, optimal_schedule};
pub use tilings::generate_tilings;
pub use tree::{Bound, PartialScheduleNode};

/// Auto-schedule the pipeline reaching `outputs`, reading driver settings
/// from the environment (`HL_BEAM_SIZE`, `HL_AUTO_SCHEDULE_TIME_LIMIT`).
///
/// On success the functions' schedules have been mutated; the returned
/// string is an extension point and currently always empty.
pub fn generate_schedules_top_down(
    outputs: &[Function],
    target: &Target,
    params: &MachineParams,
) -> Result<String> {
    generate_schedules_with_config(outputs, target, params, &SearchConfig::from_env())
}

/// Like [`generate_schedules_top_down`], with explicit driver settings.
pub fn generate_schedules_with_config(
    outputs: &[Function],
    target: &Target,
    params: &MachineParams,
    config: &SearchConfig,
) -> Result<String> {
    tracing::debug!(backend = target.name(), beam_size = config.beam_size, "auto-scheduling");
    let dag = FunctionDAG::new(outputs, params)?;
    dag.dump();

    let optimal = match config.time_limit {
        Some(limit) => {
            // Doubling-beam mode: rerun with twice the beam until half the
            // wall-clock budget is spent, keeping the best solution seen.
            let start = Instant::now();
            let mut best: Option<State> = None;
            let mut beam_size = 1;
            loop {
                let s = optimal_schedule(&dag, beam_size)?;
                let improved = best.as_ref().is_none_or(|b| s.cost < b.cost);
                if improved {
                    best = Some(s);
                }
                if start.elapsed() > limit / 2 {
                    break;
                }
                beam_size *= 2;
                tracing::info!(beam_size, "doubling beam");
            }
            best.expect("at least one search ran")
        }
        None => optimal_schedule(&dag, config.beam_size)?,
    };

    tracing::debug!("optimal schedule:\n{}", optimal.dump(&dag));

    optimal.apply_schedule(&dag, params)?;
    optimal.predicted_runtimes(&dag)?;

    Ok(String::new())
}
