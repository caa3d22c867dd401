//! Error type for the engine boundary.
//!
//! Only two conditions matter to the executor: a supervisor-triggered
//! interrupt (stop the plan, go to teardown) and everything else the engine
//! can report (constraint violations, syntax errors, authorization denials,
//! corruption detections — all expected, all non-fatal). Scenario bodies
//! never see these errors; the executor counts them and moves on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine aborted the in-flight operation because the progress
    /// callback asked it to.
    #[error("operation interrupted by the supervisor")]
    Interrupted,

    /// Any engine-reported statement failure. `code` is the engine's
    /// extended result code where one exists.
    #[error("engine error ({code}): {message}")]
    Engine { code: i32, message: String },

    /// A plan op targeted the secondary connection of a single-connection
    /// context. Defensive; planners only emit secondary ops for dual
    /// profiles.
    #[error("plan targets the secondary connection but none is open")]
    MissingSecondary,
}

impl EngineError {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted) {
            return Self::Interrupted;
        }
        let code = match &err {
            rusqlite::Error::SqliteFailure(inner, _) => inner.extended_code,
            _ => 0,
        };
        Self::Engine {
            code,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_maps_from_engine_code() {
        let ffi_err = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT);
        let err: EngineError = rusqlite::Error::SqliteFailure(ffi_err, None).into();
        assert!(err.is_interrupt());
    }

    #[test]
    fn other_failures_carry_their_extended_code() {
        let ffi_err = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT);
        let err: EngineError =
            rusqlite::Error::SqliteFailure(ffi_err, Some("UNIQUE constraint failed".into())).into();
        match err {
            EngineError::Engine { code, message } => {
                assert_eq!(code, rusqlite::ffi::SQLITE_CONSTRAINT);
                assert!(message.contains("UNIQUE"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
