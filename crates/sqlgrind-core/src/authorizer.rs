//! Operation veto policy.
//!
//! The engine consults a synchronous authorization hook before executing
//! certain operation categories. The only category the harnesses veto is
//! debug pragmas whose output is unbounded (`vdbe_trace` and friends);
//! everything else stays allowed so coverage is not lost. A veto denies
//! the single operation; the surrounding statement continues.

/// Policy data handed to the engine session when hooks are registered.
///
/// Plain `Copy` data so the `'static` authorizer closure can own it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenyPolicy {
    /// Deny `PRAGMA vdbe_*` and `PRAGMA parser_trace`.
    pub deny_debug_pragmas: bool,
}

impl Default for DenyPolicy {
    fn default() -> Self {
        Self {
            deny_debug_pragmas: true,
        }
    }
}

impl DenyPolicy {
    /// Whether a `PRAGMA <name>` operation must be vetoed.
    ///
    /// Matching is case-insensitive, as the engine's pragma names are.
    pub fn denies_pragma(&self, name: &str) -> bool {
        if !self.deny_debug_pragmas {
            return false;
        }
        let name = name.trim();
        starts_with_ignore_case(name, "vdbe_") || name.eq_ignore_ascii_case("parser_trace")
    }
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_vdbe_family_case_insensitively() {
        let policy = DenyPolicy::default();
        assert!(policy.denies_pragma("vdbe_trace"));
        assert!(policy.denies_pragma("VDBE_LISTING"));
        assert!(policy.denies_pragma("Vdbe_debug"));
        assert!(policy.denies_pragma("parser_trace"));
        assert!(policy.denies_pragma("PARSER_TRACE"));
    }

    #[test]
    fn allows_ordinary_pragmas() {
        let policy = DenyPolicy::default();
        assert!(!policy.denies_pragma("page_size"));
        assert!(!policy.denies_pragma("journal_mode"));
        assert!(!policy.denies_pragma("integrity_check"));
        // Prefix must match whole-word style, not substring anywhere.
        assert!(!policy.denies_pragma("not_vdbe_trace"));
    }

    #[test]
    fn disabled_policy_allows_everything() {
        let policy = DenyPolicy {
            deny_debug_pragmas: false,
        };
        assert!(!policy.denies_pragma("vdbe_trace"));
    }

    #[test]
    fn multibyte_names_do_not_panic_the_prefix_check() {
        let policy = DenyPolicy::default();
        assert!(!policy.denies_pragma("vdbé"));
        assert!(!policy.denies_pragma("é"));
    }
}
