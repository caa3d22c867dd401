//! The session trait plans execute against, and the connection profile
//! describing what a harness wants opened.

use std::path::PathBuf;

use sqlgrind_core::{ConnTarget, DenyPolicy, SqlValue};
use sqlgrind_packet::ConnFlags;

use crate::error::EngineError;

/// Where a connection's database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Private in-memory database, discarded on close. The default for
    /// every fuzz target.
    Memory,
    /// File-backed database at the given path. Used by tests that need a
    /// real journal on disk.
    OnDisk(PathBuf),
}

/// What to open for one harness invocation.
#[derive(Debug, Clone)]
pub struct ConnProfile {
    pub storage: Storage,
    /// Open a second, independently-owned connection for interleaved
    /// concurrency scenarios.
    pub dual: bool,
    pub flags: ConnFlags,
    pub deny: DenyPolicy,
}

impl ConnProfile {
    pub fn in_memory(flags: ConnFlags) -> Self {
        Self {
            storage: Storage::Memory,
            dual: false,
            flags,
            deny: DenyPolicy::default(),
        }
    }

    pub fn dual(mut self) -> Self {
        self.dual = true;
        self
    }
}

/// Row count produced by one op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows: u64,
}

/// One or two open engine connections plus the hooks wired into them.
///
/// The session exclusively owns its connections; dropping it closes them.
/// All methods report engine failures through [`EngineError`] — callers
/// decide whether a failure is fatal (only interrupts are).
pub trait EngineSession {
    /// Prepare and step a single statement to completion.
    fn exec(&mut self, target: ConnTarget, sql: &str) -> Result<ExecOutcome, EngineError>;

    /// Prepare a single statement, bind `binds` in order, step to
    /// completion.
    fn query(
        &mut self,
        target: ConnTarget,
        sql: &str,
        binds: &[SqlValue],
    ) -> Result<ExecOutcome, EngineError>;

    /// Run a multi-statement script, stepping each statement in turn.
    fn script(&mut self, target: ConnTarget, sql: &str) -> Result<ExecOutcome, EngineError>;

    /// Move the engine's hard heap limit; returns the previous limit.
    fn set_heap_limit(&mut self, bytes: i64) -> i64;

    /// Roll back any transaction still open on either connection. Errors
    /// are deliberately ignored — "no transaction is active" is the common
    /// case, and teardown must not fail.
    fn rollback_open_transactions(&mut self);

    fn has_secondary(&self) -> bool;
}
