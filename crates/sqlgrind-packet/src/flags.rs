//! Connection configuration flags carried inside packets.

use bitflags::bitflags;

bitflags! {
    /// Per-connection behavior toggles decoded from packet flag words.
    ///
    /// Unknown bits are dropped at decode time (`from_bits_truncate`), so
    /// every flag word maps onto a defined configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConnFlags: u16 {
        /// Enforce foreign-key constraints.
        const FOREIGN_KEYS       = 0x0001;
        /// Allow triggers to fire recursively.
        const RECURSIVE_TRIGGERS = 0x0002;
        /// Reverse the order of unordered SELECT results.
        const REVERSE_UNORDERED  = 0x0004;
        /// Refuse writes for the whole invocation.
        const QUERY_ONLY         = 0x0008;
        /// Switch the journal to WAL before the scenario body runs.
        const WAL_JOURNAL        = 0x0010;
        /// Run the scenario with auto-vacuum FULL from the start.
        const AUTOVACUUM_FULL    = 0x0020;
    }
}

impl ConnFlags {
    /// `PRAGMA` statements realizing this flag set, in a fixed order so the
    /// setup prefix of a plan is deterministic.
    pub fn pragmas(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(Self::AUTOVACUUM_FULL) {
            out.push("PRAGMA auto_vacuum = FULL;");
        }
        if self.contains(Self::WAL_JOURNAL) {
            out.push("PRAGMA journal_mode = WAL;");
        }
        if self.contains(Self::FOREIGN_KEYS) {
            out.push("PRAGMA foreign_keys = ON;");
        }
        if self.contains(Self::RECURSIVE_TRIGGERS) {
            out.push("PRAGMA recursive_triggers = ON;");
        }
        if self.contains(Self::REVERSE_UNORDERED) {
            out.push("PRAGMA reverse_unordered_selects = ON;");
        }
        if self.contains(Self::QUERY_ONLY) {
            out.push("PRAGMA query_only = ON;");
        }
        out
    }
}
