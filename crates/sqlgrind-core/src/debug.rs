//! Diagnostic flags, threaded explicitly through every run.
//!
//! The original harness kept a process-wide mutable bitmask behind a
//! setter. Here the flags are plain data handed to the context at
//! construction; nothing reads ambient state.

use bitflags::bitflags;

bitflags! {
    /// What to emit while a harness runs. All output goes through
    /// `tracing`; the flags only decide which events fire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u32 {
        /// Log every SQL statement before it is submitted.
        const TRACE_SQL    = 0x0001;
        /// Log callback-count and max-gap timing at teardown.
        const SHOW_TIMING  = 0x0002;
        /// Log engine-reported statement errors.
        const SHOW_ERRORS  = 0x0004;
        /// Log the full JSON run report at teardown.
        const SHOW_REPORT  = 0x0008;
    }
}

impl DebugFlags {
    /// Parse a flag word from an environment-style string: hex with an
    /// `0x` prefix, otherwise decimal. Unknown bits are dropped, malformed
    /// input means no diagnostics.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => raw.parse::<u32>(),
        };
        parsed.map(Self::from_bits_truncate).unwrap_or_default()
    }
}
