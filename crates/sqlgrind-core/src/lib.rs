//! Engine-agnostic core of the sqlgrind fuzz harnesses.
//!
//! This crate holds the pieces shared by every harness that do not touch
//! the engine bindings:
//!
//! - [`supervisor`] — the cooperative cutoff mechanism (wall-clock deadline,
//!   memory ceiling, result-row throttle) the engine's progress callback
//!   drives.
//! - [`plan`] — the op-script model scenario bodies emit. Plans are pure
//!   values derived from validated packet fields, which is what makes a
//!   harness invocation reproducible byte-for-byte.
//! - [`authorizer`] — the veto policy for operations that would produce
//!   unbounded diagnostic output.
//! - [`debug`] — the diagnostic flag set, threaded explicitly instead of
//!   living in process-global state.
//! - [`report`] — serializable statistics emitted at the end of a run.

pub mod authorizer;
pub mod debug;
pub mod plan;
pub mod report;
pub mod supervisor;

pub use authorizer::DenyPolicy;
pub use debug::DebugFlags;
pub use plan::{ConnTarget, EngineOp, Plan, SqlValue};
pub use report::{PlanStats, RunReport, SupervisorReport};
pub use supervisor::{AbortCause, Supervisor, SupervisorConfig};
