//! Serializable statistics for one harness invocation.
//!
//! Reports are JSON-lines friendly; the fuzz targets emit them through
//! `tracing` when the `SHOW_REPORT` flag is set.

use serde::Serialize;

use crate::supervisor::AbortCause;

/// What the executor did with a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    /// Ops in the plan as submitted.
    pub ops_submitted: usize,
    /// Ops actually handed to the engine before completion or abort.
    pub ops_run: usize,
    /// Result rows stepped across all statements.
    pub rows_seen: u64,
    /// Engine-reported statement errors. Expected outcomes, not failures.
    pub engine_errors: usize,
    /// Whether a supervisor abort cut the plan short.
    pub interrupted: bool,
}

/// Supervisor-side counters at teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupervisorReport {
    pub callbacks: u64,
    /// Longest observed gap between consecutive progress callbacks.
    /// A large gap with no abort flags a near-hang inside one work unit.
    pub max_callback_gap_us: u64,
    pub peak_memory_bytes: i64,
    pub elapsed_us: u64,
    pub abort: Option<AbortCause>,
}

/// The full record of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scenario label from the plan that ran.
    pub scenario: &'static str,
    pub stats: PlanStats,
    pub supervisor: SupervisorReport,
}
