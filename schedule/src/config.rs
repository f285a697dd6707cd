//! Search configuration and machine model.
//!
//! Environment variables are read once at the entry point and threaded
//! through the search; nothing below this module touches the environment.

use std::time::Duration;

use bon::bon;

/// Coarse model of the target machine, used by the cost model.
#[derive(Debug, Clone)]
pub struct MachineParams {
    /// Number of cores available for parallel loops.
    pub parallelism: i32,
    /// Last-level cache size in bytes.
    pub last_level_cache_size: i64,
    /// Relative cost of a cold load versus a unit of compute.
    pub balance: f64,
}

impl Default for MachineParams {
    fn default() -> Self {
        Self { parallelism: 8, last_level_cache_size: 16 * 1024 * 1024, balance: 100.0 }
    }
}

#[bon]
impl MachineParams {
    /// Create machine parameters with builder pattern.
    #[builder]
    pub fn new(
        #[builder(default = 8)] parallelism: i32,
        #[builder(default = 16 * 1024 * 1024)] last_level_cache_size: i64,
        #[builder(default = 100.0)] balance: f64,
    ) -> Self {
        Self { parallelism, last_level_cache_size, balance }
    }
}

/// Backend descriptor threaded through the entry point. The search itself is
/// target-independent; this exists so callers can express intent and future
/// backends have somewhere to hang capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
}

impl Target {
    pub fn host() -> Self {
        Self { name: "host".to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::host()
    }
}

/// Driver configuration for the beam search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of frontier states retained after each expansion pass.
    pub beam_size: usize,
    /// When set, run doubling-beam searches until half the budget is spent.
    pub time_limit: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { beam_size: 1, time_limit: None }
    }
}

#[bon]
impl SearchConfig {
    /// Create a search configuration with builder pattern.
    #[builder]
    pub fn new(
        #[builder(default = 1)] beam_size: usize,
        time_limit: Option<Duration>,
    ) -> Self {
        Self { beam_size, time_limit }
    }

    /// Read configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// * `HL_BEAM_SIZE` - beam size (positive integer, default 1)
    /// * `HL_AUTO_SCHEDULE_TIME_LIMIT` - wall-clock budget in seconds
    ///   (float); when set, selects the doubling-beam driver
    pub fn from_env() -> Self {
        let beam_size = std::env::var("HL_BEAM_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&b| b > 0)
            .unwrap_or(1);
        let time_limit = std::env::var("HL_AUTO_SCHEDULE_TIME_LIMIT")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|&t| t > 0.0)
            .map(Duration::from_secs_f64);
        Self { beam_size, time_limit }
    }
}
