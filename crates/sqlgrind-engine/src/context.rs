//! Per-invocation context: session + supervisor + diagnostics.
//!
//! A `FuzzContext` is created at the top of a harness entry point and
//! consumed by [`FuzzContext::finish`], which performs the teardown every
//! exit path must reach: roll back anything still open, then close the
//! connections by dropping the session. Connection handles live nowhere
//! else, so "released exactly once" holds by construction.

use std::sync::Arc;

use sqlgrind_core::{
    DebugFlags, Plan, PlanStats, RunReport, Supervisor, SupervisorConfig,
};

use crate::error::EngineError;
use crate::executor;
use crate::session::{ConnProfile, EngineSession};
use crate::sqlite::SqliteSession;

pub struct FuzzContext<S: EngineSession> {
    session: S,
    supervisor: Arc<Supervisor>,
    debug: DebugFlags,
}

impl FuzzContext<SqliteSession> {
    /// Open connections per `profile` with a fresh supervisor.
    pub fn open(
        profile: &ConnProfile,
        config: SupervisorConfig,
        debug: DebugFlags,
    ) -> Result<Self, EngineError> {
        let supervisor = Supervisor::new(config);
        let session = SqliteSession::open(profile, Arc::clone(&supervisor))?;
        Ok(Self::with_session(session, supervisor, debug))
    }
}

impl<S: EngineSession> FuzzContext<S> {
    /// Wrap an already-open session; used by tests with the trace double.
    pub fn with_session(session: S, supervisor: Arc<Supervisor>, debug: DebugFlags) -> Self {
        Self {
            session,
            supervisor,
            debug,
        }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Execute a plan under the supervisor.
    pub fn run(&mut self, plan: &Plan) -> PlanStats {
        executor::run_plan(&mut self.session, &self.supervisor, self.debug, plan)
    }

    /// Mandatory teardown. Rolls back open transactions, closes the
    /// connections, and emits the run report per the debug flags.
    pub fn finish(mut self, scenario: &'static str, stats: PlanStats) -> RunReport {
        self.session.rollback_open_transactions();
        let report = RunReport {
            scenario,
            stats,
            supervisor: self.supervisor.report(),
        };

        if self.debug.contains(DebugFlags::SHOW_TIMING) {
            tracing::info!(
                scenario,
                callbacks = report.supervisor.callbacks,
                max_gap_us = report.supervisor.max_callback_gap_us,
                elapsed_us = report.supervisor.elapsed_us,
                "supervisor timing"
            );
        }
        if self.debug.contains(DebugFlags::SHOW_REPORT) {
            match serde_json::to_string(&report) {
                Ok(json) => tracing::info!(report = %json, "run report"),
                Err(err) => tracing::warn!(error = %err, "run report serialization failed"),
            }
        }

        report
    }
}
