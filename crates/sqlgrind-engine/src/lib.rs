//! The engine boundary: everything that touches the database bindings.
//!
//! The engine under test is stock C SQLite reached through `rusqlite`. This
//! crate keeps that dependency in one place behind the [`EngineSession`]
//! trait, so the harness crate and its tests can run the same plans against
//! either the real engine ([`SqliteSession`]) or a call-recording double
//! ([`TraceSession`]).
//!
//! Fatal engine conditions — a crash, an assertion, memory corruption — are
//! deliberately not caught anywhere in this crate. Surfacing them to the
//! fuzzer's crash detection is the point of the exercise.

pub mod context;
pub mod error;
pub mod executor;
pub mod memory;
pub mod session;
pub mod sqlite;
pub mod trace;

pub use context::FuzzContext;
pub use error::EngineError;
pub use executor::run_plan;
pub use session::{ConnProfile, EngineSession, ExecOutcome, Storage};
pub use sqlite::SqliteSession;
pub use trace::{TraceEvent, TraceLog, TraceSession};
