//! Plan execution against an [`EngineSession`].
//!
//! The executor owns the error discipline for scenario bodies: every
//! engine-reported failure is counted and logged, never propagated; only a
//! supervisor interrupt (or the supervisor latching between ops) stops the
//! plan early. Either way control returns to the entry point, which runs
//! teardown.

use sqlgrind_core::{DebugFlags, EngineOp, Plan, PlanStats, Supervisor};

use crate::session::{EngineSession, ExecOutcome};
use crate::error::EngineError;

pub fn run_plan<S: EngineSession>(
    session: &mut S,
    supervisor: &Supervisor,
    debug: DebugFlags,
    plan: &Plan,
) -> PlanStats {
    let mut stats = PlanStats {
        ops_submitted: plan.len(),
        ..PlanStats::default()
    };

    for op in &plan.ops {
        // Cooperative cutoff between ops: an abort latched inside one
        // statement also stops the rest of the script.
        if supervisor.should_abort() {
            stats.interrupted = true;
            break;
        }

        if debug.contains(DebugFlags::TRACE_SQL) {
            tracing::trace!(scenario = plan.label, op = ?op, "submitting op");
        }

        let result = dispatch(session, op);
        stats.ops_run += 1;

        match result {
            Ok(outcome) => stats.rows_seen += outcome.rows,
            Err(err) if err.is_interrupt() => {
                stats.interrupted = true;
                break;
            }
            Err(err) => {
                stats.engine_errors += 1;
                if debug.contains(DebugFlags::SHOW_ERRORS) {
                    tracing::debug!(scenario = plan.label, error = %err, "engine reported error");
                }
            }
        }
    }

    stats
}

fn dispatch<S: EngineSession>(session: &mut S, op: &EngineOp) -> Result<ExecOutcome, EngineError> {
    match op {
        EngineOp::Exec { target, sql } => session.exec(*target, sql),
        EngineOp::Query { target, sql, binds } => session.query(*target, sql, binds),
        EngineOp::Script { target, sql } => session.script(*target, sql),
        EngineOp::HeapLimit { bytes } => {
            session.set_heap_limit(*bytes);
            Ok(ExecOutcome::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlgrind_core::{SupervisorConfig, SqlValue};

    use super::*;
    use crate::trace::{TraceEvent, TraceSession};

    fn generous_supervisor() -> std::sync::Arc<Supervisor> {
        Supervisor::new(SupervisorConfig {
            time_budget: Duration::from_secs(30),
            memory_ceiling: i64::MAX,
            row_budget: 10_000,
        })
    }

    fn sample_plan() -> Plan {
        let mut plan = Plan::new("sample");
        plan.exec("CREATE TABLE t(a);");
        plan.query("INSERT INTO t VALUES (?1);", vec![SqlValue::Integer(7)]);
        plan.exec("SELECT a FROM t;");
        plan
    }

    #[test]
    fn runs_every_op_in_order() {
        let supervisor = generous_supervisor();
        let mut session = TraceSession::new().with_rows(1);
        let log = session.log();
        let stats = run_plan(&mut session, &supervisor, DebugFlags::empty(), &sample_plan());
        assert_eq!(stats.ops_run, 3);
        assert_eq!(stats.rows_seen, 3);
        assert_eq!(stats.engine_errors, 0);
        assert!(!stats.interrupted);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn engine_errors_do_not_stop_the_plan() {
        let supervisor = generous_supervisor();
        let mut session = TraceSession::new().failing_on("INSERT");
        let stats = run_plan(&mut session, &supervisor, DebugFlags::empty(), &sample_plan());
        assert_eq!(stats.ops_run, 3, "plan must continue past engine errors");
        assert_eq!(stats.engine_errors, 1);
        assert!(!stats.interrupted);
    }

    #[test]
    fn interrupt_stops_the_plan_immediately() {
        let supervisor = generous_supervisor();
        let mut session = TraceSession::new().interrupting_on("INSERT");
        let log = session.log();
        let stats = run_plan(&mut session, &supervisor, DebugFlags::empty(), &sample_plan());
        assert_eq!(stats.ops_run, 2, "the interrupted op is the last run");
        assert!(stats.interrupted);
        // The trailing SELECT was never submitted.
        assert!(!log
            .snapshot()
            .iter()
            .any(|e| matches!(e, TraceEvent::Exec { sql, .. } if sql.contains("SELECT"))));
    }

    #[test]
    fn latched_abort_stops_before_the_first_op() {
        let supervisor = Supervisor::new(SupervisorConfig {
            time_budget: Duration::ZERO,
            memory_ceiling: i64::MAX,
            row_budget: 1,
        });
        let mut session = TraceSession::new();
        let log = session.log();
        let stats = run_plan(&mut session, &supervisor, DebugFlags::empty(), &sample_plan());
        assert_eq!(stats.ops_run, 0);
        assert!(stats.interrupted);
        assert!(log.is_empty());
    }

    #[test]
    fn heap_limit_ops_touch_the_session() {
        let supervisor = generous_supervisor();
        let mut plan = Plan::new("limits");
        plan.heap_limit(1_000_000);
        plan.heap_limit(0);
        let mut session = TraceSession::new();
        let log = session.log();
        let stats = run_plan(&mut session, &supervisor, DebugFlags::empty(), &plan);
        assert_eq!(stats.ops_run, 2);
        assert_eq!(
            log.snapshot(),
            vec![
                TraceEvent::HeapLimit { bytes: 1_000_000 },
                TraceEvent::HeapLimit { bytes: 0 },
            ],
        );
    }
}
