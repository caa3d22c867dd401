//! The real engine session, backed by `rusqlite`.
//!
//! Opening a session wires the three supervisory hooks into every
//! connection:
//!
//! - the progress handler, invoked about every [`PROGRESS_INTERVAL_OPS`]
//!   VDBE ops, which samples engine memory and feeds the supervisor;
//! - the authorizer, which vetoes unbounded-output debug pragmas;
//! - the statement limits the original harness ran under (VDBE op count,
//!   SQL length, expression depth, and so on).

use std::sync::Arc;

use rusqlite::Connection;
use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::limits::Limit;

use sqlgrind_core::{ConnTarget, SqlValue, Supervisor};

use crate::error::EngineError;
use crate::memory;
use crate::session::{ConnProfile, EngineSession, ExecOutcome, Storage};

/// VDBE ops between progress-callback invocations.
const PROGRESS_INTERVAL_OPS: i32 = 10;

/// Hard heap limit installed at open, bytes.
const DEFAULT_HARD_HEAP_LIMIT: i64 = 20_000_000;

/// Statement limits applied to every connection, as (limit, value) pairs.
const CONNECTION_LIMITS: [(Limit, i32); 6] = [
    (Limit::SQLITE_LIMIT_VDBE_OP, 25_000),
    (Limit::SQLITE_LIMIT_LIKE_PATTERN_LENGTH, 250),
    (Limit::SQLITE_LIMIT_LENGTH, 50_000),
    (Limit::SQLITE_LIMIT_SQL_LENGTH, 100_000),
    (Limit::SQLITE_LIMIT_COLUMN, 100),
    (Limit::SQLITE_LIMIT_EXPR_DEPTH, 100),
];

pub struct SqliteSession {
    primary: Connection,
    secondary: Option<Connection>,
    supervisor: Arc<Supervisor>,
}

impl SqliteSession {
    /// Open the connection(s) described by `profile` and install hooks.
    ///
    /// Failure here (for example an unwritable path for an on-disk
    /// profile) means the invocation is skipped, not reported.
    pub fn open(profile: &ConnProfile, supervisor: Arc<Supervisor>) -> Result<Self, EngineError> {
        let primary = open_storage(&profile.storage)?;
        configure(&primary, &supervisor, profile)?;

        let secondary = if profile.dual {
            let conn = open_storage(&secondary_storage(&profile.storage))?;
            configure(&conn, &supervisor, profile)?;
            Some(conn)
        } else {
            None
        };

        memory::set_hard_heap_limit(DEFAULT_HARD_HEAP_LIMIT);

        Ok(Self {
            primary,
            secondary,
            supervisor,
        })
    }

    fn conn(&self, target: ConnTarget) -> Result<&Connection, EngineError> {
        match target {
            ConnTarget::Primary => Ok(&self.primary),
            ConnTarget::Secondary => self.secondary.as_ref().ok_or(EngineError::MissingSecondary),
        }
    }
}

impl EngineSession for SqliteSession {
    fn exec(&mut self, target: ConnTarget, sql: &str) -> Result<ExecOutcome, EngineError> {
        let conn = self.conn(target)?;
        let mut stmt = conn.prepare(sql)?;
        let rows = drain_rows(&mut stmt, &self.supervisor)?;
        Ok(ExecOutcome { rows })
    }

    fn query(
        &mut self,
        target: ConnTarget,
        sql: &str,
        binds: &[SqlValue],
    ) -> Result<ExecOutcome, EngineError> {
        let conn = self.conn(target)?;
        let mut stmt = conn.prepare(sql)?;
        for (idx, value) in binds.iter().enumerate() {
            stmt.raw_bind_parameter(idx + 1, to_engine_value(value))?;
        }
        let rows = drain_rows(&mut stmt, &self.supervisor)?;
        Ok(ExecOutcome { rows })
    }

    fn script(&mut self, target: ConnTarget, sql: &str) -> Result<ExecOutcome, EngineError> {
        let conn = self.conn(target)?;
        let mut total = 0u64;
        let mut batch = rusqlite::Batch::new(conn, sql);
        while let Some(mut stmt) = batch.next()? {
            total += drain_rows(&mut stmt, &self.supervisor)?;
            if self.supervisor.should_abort() {
                break;
            }
        }
        Ok(ExecOutcome { rows: total })
    }

    fn set_heap_limit(&mut self, bytes: i64) -> i64 {
        memory::set_hard_heap_limit(bytes)
    }

    fn rollback_open_transactions(&mut self) {
        let _ = self.primary.execute_batch("ROLLBACK;");
        if let Some(conn) = &self.secondary {
            let _ = conn.execute_batch("ROLLBACK;");
        }
    }

    fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }
}

/// Step a prepared statement to completion, touching every column of every
/// row so value decoding paths run, and charging each row against the
/// supervisor's budget.
fn drain_rows(
    stmt: &mut rusqlite::Statement<'_>,
    supervisor: &Supervisor,
) -> Result<u64, rusqlite::Error> {
    let mut rows = stmt.raw_query();
    let mut seen = 0u64;
    while let Some(row) = rows.next()? {
        let columns = row.as_ref().column_count();
        for idx in 0..columns {
            let _ = row.get_ref(idx);
        }
        seen += 1;
        if !supervisor.consume_row() {
            break;
        }
    }
    Ok(seen)
}

fn open_storage(storage: &Storage) -> Result<Connection, EngineError> {
    let conn = match storage {
        Storage::Memory => Connection::open_in_memory()?,
        Storage::OnDisk(path) => Connection::open(path)?,
    };
    Ok(conn)
}

/// The secondary connection of a dual profile gets its own database: a
/// sibling file on disk, or an independent private memory database.
fn secondary_storage(storage: &Storage) -> Storage {
    match storage {
        Storage::Memory => Storage::Memory,
        Storage::OnDisk(path) => {
            let mut second = path.as_os_str().to_owned();
            second.push("-second");
            Storage::OnDisk(second.into())
        }
    }
}

fn configure(
    conn: &Connection,
    supervisor: &Arc<Supervisor>,
    profile: &ConnProfile,
) -> Result<(), EngineError> {
    for (limit, value) in CONNECTION_LIMITS {
        conn.set_limit(limit, value);
    }

    let sup = Arc::clone(supervisor);
    conn.progress_handler(
        PROGRESS_INTERVAL_OPS,
        Some(move || sup.on_progress(memory::engine_memory_used())),
    );

    let deny = profile.deny;
    conn.authorizer(Some(move |ctx: AuthContext<'_>| match ctx.action {
        AuthAction::Pragma { pragma_name, .. } if deny.denies_pragma(pragma_name) => {
            Authorization::Deny
        }
        _ => Authorization::Allow,
    }));

    // Flag pragmas go through a plain prepare-and-step; some of them
    // (journal_mode) return a row, which execute_batch would reject.
    for pragma in profile.flags.pragmas() {
        let mut stmt = conn.prepare(pragma)?;
        let mut rows = stmt.raw_query();
        while let Some(_row) = rows.next()? {}
    }

    Ok(())
}

fn to_engine_value(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Real(r) => rusqlite::types::Value::Real(*r),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlValue::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlgrind_core::{SupervisorConfig, SqlValue};
    use sqlgrind_packet::ConnFlags;

    use super::*;

    fn open_memory(config: SupervisorConfig) -> (SqliteSession, Arc<Supervisor>) {
        let supervisor = Supervisor::new(config);
        let profile = ConnProfile::in_memory(ConnFlags::empty());
        let session =
            SqliteSession::open(&profile, Arc::clone(&supervisor)).expect("open in-memory");
        (session, supervisor)
    }

    fn generous() -> SupervisorConfig {
        SupervisorConfig {
            time_budget: Duration::from_secs(30),
            memory_ceiling: i64::MAX,
            row_budget: 10_000,
        }
    }

    #[test]
    fn exec_counts_result_rows() {
        let (mut session, _) = open_memory(generous());
        session
            .exec(ConnTarget::Primary, "CREATE TABLE t(a INTEGER);")
            .expect("create");
        session
            .exec(ConnTarget::Primary, "INSERT INTO t VALUES (1), (2), (3);")
            .expect("insert");
        let out = session
            .exec(ConnTarget::Primary, "SELECT a FROM t;")
            .expect("select");
        assert_eq!(out.rows, 3);
    }

    #[test]
    fn query_binds_typed_parameters() {
        let (mut session, _) = open_memory(generous());
        session
            .exec(ConnTarget::Primary, "CREATE TABLE kv(k TEXT, v BLOB);")
            .expect("create");
        session
            .query(
                ConnTarget::Primary,
                "INSERT INTO kv VALUES (?1, ?2);",
                &[
                    SqlValue::Text("key".into()),
                    SqlValue::Blob(vec![0xDE, 0xAD]),
                ],
            )
            .expect("bind insert");
        let out = session
            .query(
                ConnTarget::Primary,
                "SELECT v FROM kv WHERE k = ?1;",
                &[SqlValue::Text("key".into())],
            )
            .expect("bind select");
        assert_eq!(out.rows, 1);
    }

    #[test]
    fn engine_errors_are_reported_not_panicked() {
        let (mut session, _) = open_memory(generous());
        let err = session
            .exec(ConnTarget::Primary, "SELECT * FROM missing_table;")
            .expect_err("missing table must error");
        assert!(!err.is_interrupt());
    }

    #[test]
    fn authorizer_vetoes_debug_pragmas_only() {
        let (mut session, _) = open_memory(generous());
        let err = session
            .exec(ConnTarget::Primary, "PRAGMA vdbe_trace = ON;")
            .expect_err("vdbe_trace must be denied");
        match err {
            EngineError::Engine { message, .. } => {
                assert!(
                    message.contains("not authorized"),
                    "unexpected error: {message}"
                );
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
        // Ordinary pragmas still work on the same connection.
        session
            .exec(ConnTarget::Primary, "PRAGMA page_count;")
            .expect("page_count allowed");
    }

    #[test]
    fn row_budget_stops_a_large_scan() {
        let config = SupervisorConfig {
            row_budget: 5,
            ..generous()
        };
        let (mut session, supervisor) = open_memory(config);
        let out = session
            .exec(
                ConnTarget::Primary,
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x+1 FROM c LIMIT 1000) \
                 SELECT x FROM c;",
            )
            .expect("bounded scan");
        assert_eq!(out.rows, 5);
        assert!(supervisor.should_abort());
    }

    #[test]
    fn deadline_interrupts_a_long_statement() {
        let config = SupervisorConfig {
            time_budget: Duration::from_millis(50),
            memory_ceiling: i64::MAX,
            row_budget: u32::MAX,
        };
        let (mut session, supervisor) = open_memory(config);
        // Large cross join with an aggregate: produces one row only after
        // grinding through far more VDBE ops than 50ms allows.
        let err = session
            .exec(
                ConnTarget::Primary,
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x+1 FROM c LIMIT 100000) \
                 SELECT count(*) FROM c a, c b;",
            )
            .expect_err("statement must be interrupted");
        assert!(err.is_interrupt(), "expected interrupt, got {err:?}");
        assert_eq!(
            supervisor.abort_cause(),
            Some(sqlgrind_core::AbortCause::Deadline)
        );
    }

    #[test]
    fn script_runs_multiple_statements() {
        let (mut session, _) = open_memory(generous());
        let out = session
            .script(
                ConnTarget::Primary,
                "CREATE TABLE s(a); INSERT INTO s VALUES (1); SELECT a FROM s;",
            )
            .expect("script");
        assert_eq!(out.rows, 1);
    }

    #[test]
    fn dual_profile_opens_independent_databases() {
        let supervisor = Supervisor::new(generous());
        let profile = ConnProfile::in_memory(ConnFlags::empty()).dual();
        let mut session = SqliteSession::open(&profile, supervisor).expect("open dual");
        assert!(session.has_secondary());
        session
            .exec(ConnTarget::Primary, "CREATE TABLE only_here(a);")
            .expect("create on primary");
        // The secondary connection has its own private database.
        let err = session
            .exec(ConnTarget::Secondary, "SELECT * FROM only_here;")
            .expect_err("table must not exist on secondary");
        assert!(!err.is_interrupt());
    }

    #[test]
    fn missing_secondary_is_a_soft_error() {
        let (mut session, _) = open_memory(generous());
        let err = session
            .exec(ConnTarget::Secondary, "SELECT 1;")
            .expect_err("no secondary open");
        assert!(matches!(err, EngineError::MissingSecondary));
    }

    #[test]
    fn rollback_teardown_never_fails() {
        let (mut session, _) = open_memory(generous());
        // No transaction open: rollback errors are swallowed.
        session.rollback_open_transactions();
        session
            .exec(ConnTarget::Primary, "BEGIN; ")
            .expect("begin");
        session.rollback_open_transactions();
        // Transaction is gone; a new BEGIN succeeds.
        session.exec(ConnTarget::Primary, "BEGIN;").expect("begin");
        session.rollback_open_transactions();
    }

    #[test]
    fn file_backed_profile_creates_the_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("probe.db");
        let supervisor = Supervisor::new(generous());
        let profile = ConnProfile {
            storage: Storage::OnDisk(path.clone()),
            dual: false,
            flags: ConnFlags::WAL_JOURNAL,
            deny: Default::default(),
        };
        let mut session = SqliteSession::open(&profile, supervisor).expect("open on disk");
        session
            .exec(ConnTarget::Primary, "CREATE TABLE t(a); ")
            .expect("create");
        drop(session);
        assert!(path.exists());
    }
}
