//! Fuzz harness entry points for the SQLite engine.
//!
//! Each module is one harness: a packet layout (from `sqlgrind-packet`), a
//! scenario selector, a planner that turns validated fields into an op
//! script, and a `run` entry point that wraps the script in a supervised
//! context. The fuzz targets under `fuzz/fuzz_targets` are one-liners over
//! these `run` functions.
//!
//! Entry points never fail. Undecodable or rejected input returns
//! [`Outcome::Skipped`]; everything else runs to teardown and returns the
//! run report. Engine crashes are the one thing allowed through — that is
//! what the fuzzer is listening for.

use std::env;
use std::time::Duration;

use sqlgrind_core::{DebugFlags, Plan, RunReport, SupervisorConfig};
use sqlgrind_engine::{ConnProfile, EngineError, FuzzContext};

pub mod advanced;
pub mod autovacuum;
pub mod btree_alloc;
pub mod cursor_nav;
pub mod lifecycle;
pub mod pragma_config;
pub mod transactions;

/// Why an input produced no test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Buffer shorter than the packet layout.
    ShortInput,
    /// A quantity field exceeded its ceiling.
    FieldRejected,
    /// The engine could not open a connection.
    EngineUnavailable,
}

/// Result of one harness invocation.
#[derive(Debug)]
pub enum Outcome {
    /// No test performed. Valid, silent, not an error.
    Skipped(Skip),
    /// The scenario ran (possibly cut short by the supervisor) and
    /// teardown completed.
    Completed(RunReport),
}

impl Outcome {
    pub fn skipped(&self) -> Option<Skip> {
        match self {
            Self::Skipped(skip) => Some(*skip),
            Self::Completed(_) => None,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Skipped(_) => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Per-process configuration for the harnesses, threaded explicitly into
/// every run.
#[derive(Debug, Clone, Copy)]
pub struct HarnessOptions {
    /// Budget template; each packet overrides the row budget.
    pub supervisor: SupervisorConfig,
    pub debug: DebugFlags,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            debug: DebugFlags::empty(),
        }
    }
}

impl HarnessOptions {
    /// Read overrides from the environment:
    ///
    /// - `SQLGRIND_DEBUG` — diagnostic flag word (hex or decimal)
    /// - `SQLGRIND_TIME_BUDGET_MS` — wall-clock budget per invocation
    /// - `SQLGRIND_MEMORY_CEILING` — supervisor memory ceiling in bytes
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(raw) = env::var("SQLGRIND_DEBUG") {
            options.debug = DebugFlags::parse(&raw);
        }
        if let Some(ms) = env_u64("SQLGRIND_TIME_BUDGET_MS") {
            options.supervisor.time_budget = Duration::from_millis(ms);
        }
        if let Some(bytes) = env_u64("SQLGRIND_MEMORY_CEILING") {
            options.supervisor.memory_ceiling = i64::try_from(bytes).unwrap_or(i64::MAX);
        }
        options
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok()?.trim().parse().ok()
}

/// Install the tracing subscriber for fuzz-target diagnostics. Idempotent;
/// later calls are no-ops.
pub fn init_diagnostics() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sqlgrind=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}

/// Shared tail of every entry point: open a context, run the plan, tear
/// down. Teardown runs on every path that reaches a context.
pub(crate) fn execute(
    plan: &Plan,
    profile: &ConnProfile,
    row_budget: u32,
    opts: &HarnessOptions,
) -> Outcome {
    let config = SupervisorConfig {
        row_budget,
        ..opts.supervisor
    };
    let mut ctx = match FuzzContext::open(profile, config, opts.debug) {
        Ok(ctx) => ctx,
        Err(err) => return skip_open_failure(err),
    };
    let stats = ctx.run(plan);
    Outcome::Completed(ctx.finish(plan.label, stats))
}

fn skip_open_failure(err: EngineError) -> Outcome {
    tracing::debug!(error = %err, "connection open failed; input skipped");
    Outcome::Skipped(Skip::EngineUnavailable)
}
