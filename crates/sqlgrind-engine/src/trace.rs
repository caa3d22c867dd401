//! A call-recording session double.
//!
//! Replays plans without an engine, logging every call in order. Tests use
//! it for the determinism property (two runs over the same bytes must
//! produce identical call logs) and for executor behavior around injected
//! failures, which are awkward to provoke on demand from the real engine.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use sqlgrind_core::{ConnTarget, SqlValue};

use crate::error::EngineError;
use crate::session::{EngineSession, ExecOutcome};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    Exec {
        target: ConnTarget,
        sql: String,
    },
    Query {
        target: ConnTarget,
        sql: String,
        binds: Vec<SqlValue>,
    },
    Script {
        target: ConnTarget,
        sql: String,
    },
    HeapLimit {
        bytes: i64,
    },
    Rollback,
}

/// Shared handle onto a trace session's event log. Stays valid after the
/// session has been consumed by a context teardown.
#[derive(Debug, Clone, Default)]
pub struct TraceLog(Arc<Mutex<Vec<TraceEvent>>>);

impl TraceLog {
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.0.lock().expect("trace log poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().expect("trace log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: TraceEvent) {
        self.0.lock().expect("trace log poisoned").push(event);
    }
}

pub struct TraceSession {
    log: TraceLog,
    rows_per_statement: u64,
    fail_on: Option<String>,
    interrupt_on: Option<String>,
    heap_limit: i64,
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSession {
    pub fn new() -> Self {
        Self {
            log: TraceLog::default(),
            rows_per_statement: 0,
            fail_on: None,
            interrupt_on: None,
            heap_limit: 0,
        }
    }

    /// Every exec/query/script op reports this many rows.
    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows_per_statement = rows;
        self
    }

    /// Ops whose SQL contains `needle` fail with an engine error.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Ops whose SQL contains `needle` report a supervisor interrupt.
    pub fn interrupting_on(mut self, needle: impl Into<String>) -> Self {
        self.interrupt_on = Some(needle.into());
        self
    }

    pub fn log(&self) -> TraceLog {
        self.log.clone()
    }

    fn outcome_for(&self, sql: &str) -> Result<ExecOutcome, EngineError> {
        if let Some(needle) = &self.interrupt_on {
            if sql.contains(needle.as_str()) {
                return Err(EngineError::Interrupted);
            }
        }
        if let Some(needle) = &self.fail_on {
            if sql.contains(needle.as_str()) {
                return Err(EngineError::Engine {
                    code: 1,
                    message: format!("injected failure for {needle:?}"),
                });
            }
        }
        Ok(ExecOutcome {
            rows: self.rows_per_statement,
        })
    }
}

impl EngineSession for TraceSession {
    fn exec(&mut self, target: ConnTarget, sql: &str) -> Result<ExecOutcome, EngineError> {
        self.log.push(TraceEvent::Exec {
            target,
            sql: sql.to_owned(),
        });
        self.outcome_for(sql)
    }

    fn query(
        &mut self,
        target: ConnTarget,
        sql: &str,
        binds: &[SqlValue],
    ) -> Result<ExecOutcome, EngineError> {
        self.log.push(TraceEvent::Query {
            target,
            sql: sql.to_owned(),
            binds: binds.to_vec(),
        });
        self.outcome_for(sql)
    }

    fn script(&mut self, target: ConnTarget, sql: &str) -> Result<ExecOutcome, EngineError> {
        self.log.push(TraceEvent::Script {
            target,
            sql: sql.to_owned(),
        });
        self.outcome_for(sql)
    }

    fn set_heap_limit(&mut self, bytes: i64) -> i64 {
        self.log.push(TraceEvent::HeapLimit { bytes });
        std::mem::replace(&mut self.heap_limit, bytes)
    }

    fn rollback_open_transactions(&mut self) {
        self.log.push(TraceEvent::Rollback);
    }

    fn has_secondary(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut session = TraceSession::new().with_rows(2);
        let log = session.log();
        session.exec(ConnTarget::Primary, "SELECT 1;").expect("ok");
        session
            .query(
                ConnTarget::Secondary,
                "SELECT ?1;",
                &[SqlValue::Integer(9)],
            )
            .expect("ok");
        session.rollback_open_transactions();
        assert_eq!(
            log.snapshot(),
            vec![
                TraceEvent::Exec {
                    target: ConnTarget::Primary,
                    sql: "SELECT 1;".into(),
                },
                TraceEvent::Query {
                    target: ConnTarget::Secondary,
                    sql: "SELECT ?1;".into(),
                    binds: vec![SqlValue::Integer(9)],
                },
                TraceEvent::Rollback,
            ],
        );
    }

    #[test]
    fn injected_failures_fire_on_matching_sql() {
        let mut session = TraceSession::new().failing_on("boom");
        assert!(session.exec(ConnTarget::Primary, "SELECT 1;").is_ok());
        let err = session
            .exec(ConnTarget::Primary, "SELECT boom;")
            .expect_err("must fail");
        assert!(!err.is_interrupt());
    }

    #[test]
    fn heap_limit_returns_previous_value() {
        let mut session = TraceSession::new();
        assert_eq!(session.set_heap_limit(100), 0);
        assert_eq!(session.set_heap_limit(0), 100);
    }
}
