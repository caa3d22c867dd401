//! Multi-mode harness.
//!
//! The original entry point of the suite: a two-byte header selects one of
//! seven modes and the rest of the buffer is either raw SQL (basic mode)
//! or an op stream consumed one byte at a time (the template modes).
//! The concurrent mode interleaves two independently-owned connections
//! from the same thread.

use sqlgrind_core::{ConnTarget, Plan};
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::trans::TransPacket;
use sqlgrind_packet::AdvancedHeader;

use crate::transactions;
use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvancedMode {
    /// Tail bytes run verbatim as SQL.
    Basic,
    /// Depth-tracked transaction ops from the tail byte stream.
    Transaction,
    /// Schema churn: create/alter/drop/vacuum templates.
    Schema,
    /// Built-in function battery.
    Functions,
    /// Blob construction and slicing templates.
    Blob,
    /// Two connections, interleaved writes.
    Concurrent,
    /// Statements chosen to fail: constraint, syntax, missing objects.
    ErrorInjection,
}

impl AdvancedMode {
    pub const COUNT: u8 = 7;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::Basic,
            1 => Self::Transaction,
            2 => Self::Schema,
            3 => Self::Functions,
            4 => Self::Blob,
            5 => Self::Concurrent,
            _ => Self::ErrorInjection,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "advanced_basic",
            Self::Transaction => "advanced_transaction",
            Self::Schema => "advanced_schema",
            Self::Functions => "advanced_functions",
            Self::Blob => "advanced_blob",
            Self::Concurrent => "advanced_concurrent",
            Self::ErrorInjection => "advanced_error_injection",
        }
    }
}

/// Most template ops consumed from a tail, regardless of its length.
const MAX_TEMPLATE_OPS: usize = 32;

/// Function battery, indexed by op byte.
const FUNCTION_SQL: [&str; 16] = [
    "SELECT abs(-42);",
    "SELECT coalesce(NULL, 'test');",
    "SELECT length('hello world');",
    "SELECT substr('sqlite', 1, 3);",
    "SELECT random();",
    "SELECT hex('binary');",
    "SELECT quote('O''Reilly');",
    "SELECT typeof(3.14);",
    "SELECT round(3.14159, 2);",
    "SELECT trim('  spaces  ');",
    "SELECT replace('hello', 'l', 'r');",
    "SELECT datetime('now');",
    "SELECT json_extract('{\"a\":1}', '$.a');",
    "SELECT group_concat(x) FROM (SELECT 'a' AS x UNION SELECT 'b');",
    "SELECT count(*) FROM (SELECT 1 UNION SELECT 2);",
    "SELECT upper(lower('MiXeD'));",
];

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((header, tail)) = AdvancedHeader::decode(data) else {
        return Outcome::Skipped(Skip::ShortInput);
    };
    let mode = AdvancedMode::select(header.mode);
    let plan = build_plan(mode, &header, tail);
    let mut profile = ConnProfile::in_memory(header.conn_flags());
    if plan.uses_secondary() {
        profile = profile.dual();
    }
    execute(&plan, &profile, header.row_budget(), opts)
}

pub fn plan_from_input(data: &[u8]) -> Option<Plan> {
    let (header, tail) = AdvancedHeader::decode(data)?;
    Some(build_plan(AdvancedMode::select(header.mode), &header, tail))
}

fn build_plan(mode: AdvancedMode, header: &AdvancedHeader, tail: &[u8]) -> Plan {
    let mut plan = Plan::new(mode.label());
    match mode {
        AdvancedMode::Basic => {
            if !tail.is_empty() {
                plan.script(String::from_utf8_lossy(tail).into_owned());
            } else {
                plan.exec("SELECT 1;");
            }
        }
        AdvancedMode::Transaction => push_transaction_stream(&mut plan, header, tail),
        AdvancedMode::Schema => push_schema_templates(&mut plan, tail),
        AdvancedMode::Functions => push_function_battery(&mut plan, tail),
        AdvancedMode::Blob => push_blob_templates(&mut plan, tail),
        AdvancedMode::Concurrent => push_concurrent(&mut plan, tail),
        AdvancedMode::ErrorInjection => push_error_injection(&mut plan),
    }
    plan
}

fn template_ops(tail: &[u8]) -> impl Iterator<Item = (usize, u8)> + '_ {
    tail.iter().copied().take(MAX_TEMPLATE_OPS).enumerate()
}

fn push_transaction_stream(plan: &mut Plan, header: &AdvancedHeader, tail: &[u8]) {
    // Reuse the transaction harness's op discipline over a synthetic
    // packet: the header byte seeds the savepoint names.
    let mut packet_bytes = [0u8; 32];
    packet_bytes[4] = header.config;
    let (packet, _) = TransPacket::decode(&packet_bytes).expect("fixed-size buffer decodes");
    let valid = packet.validate();
    plan.exec(
        "CREATE TABLE IF NOT EXISTS txn_t(\
         id INTEGER PRIMARY KEY, tag TEXT, body BLOB);",
    );
    let stream: Vec<u8> = tail.iter().copied().take(MAX_TEMPLATE_OPS).collect();
    if stream.is_empty() {
        plan.exec("BEGIN;");
        plan.exec("INSERT INTO txn_t(tag) VALUES ('solo');");
        plan.exec("COMMIT;");
    } else {
        transactions::push_op_stream(plan, &valid, &stream);
    }
}

fn push_schema_templates(plan: &mut Plan, tail: &[u8]) {
    if tail.is_empty() {
        plan.exec("CREATE TABLE t0(a INTEGER, b TEXT, c BLOB);");
        return;
    }
    for (_, byte) in template_ops(tail) {
        let op = u32::from(byte);
        let sql = match byte % 8 {
            0 => format!("CREATE TABLE IF NOT EXISTS t{op}(a INTEGER, b TEXT, c BLOB);"),
            1 => format!("CREATE INDEX IF NOT EXISTS i{op} ON t{}(a);", op % 4),
            2 => format!("ALTER TABLE t{} ADD COLUMN d REAL;", op % 4),
            3 => format!("CREATE VIEW IF NOT EXISTS v{op} AS SELECT * FROM t{};", op % 4),
            4 => format!(
                "CREATE TRIGGER IF NOT EXISTS tr{op} AFTER INSERT ON t{} \
                 BEGIN SELECT 1; END;",
                op % 4
            ),
            5 => format!("DROP TABLE IF EXISTS t{};", op % 4),
            6 => format!("DROP INDEX IF EXISTS i{op};"),
            _ => "VACUUM;".to_owned(),
        };
        plan.exec(sql);
    }
}

fn push_function_battery(plan: &mut Plan, tail: &[u8]) {
    if tail.is_empty() {
        plan.exec(FUNCTION_SQL[0]);
        return;
    }
    for (_, byte) in template_ops(tail) {
        plan.exec(FUNCTION_SQL[usize::from(byte) % FUNCTION_SQL.len()]);
    }
}

fn push_blob_templates(plan: &mut Plan, tail: &[u8]) {
    plan.exec("CREATE TABLE IF NOT EXISTS blob_test(id INTEGER, data BLOB);");
    if tail.is_empty() {
        plan.exec("SELECT zeroblob(16);");
        return;
    }
    for (i, byte) in template_ops(tail) {
        let size = u32::from(byte) % 100 + 1;
        let sql = match byte % 6 {
            0 => format!("SELECT randomblob({size});"),
            1 => format!("SELECT zeroblob({size});"),
            2 => format!("SELECT length(randomblob({size}));"),
            3 => format!("SELECT hex(randomblob({size}));"),
            4 => format!(
                "INSERT INTO blob_test VALUES ({i}, randomblob({size}));"
            ),
            _ => format!("SELECT substr(randomblob({size}), 1, {});", size / 2 + 1),
        };
        plan.exec(sql);
    }
}

/// Interleave schema and writes across two connections. The databases are
/// independent, so this exercises cross-connection state in the engine's
/// global layers (memory, pcache), not lock contention.
fn push_concurrent(plan: &mut Plan, tail: &[u8]) {
    plan.exec("CREATE TABLE IF NOT EXISTS concurrent_test(id INTEGER);");
    plan.exec_on(
        ConnTarget::Secondary,
        "CREATE TABLE IF NOT EXISTS concurrent_test(id INTEGER);",
    );
    let rounds = tail.first().map_or(2, |b| usize::from(b % 8) + 1);
    for round in 0..rounds {
        plan.exec(format!("INSERT INTO concurrent_test VALUES ({round});"));
        plan.exec_on(
            ConnTarget::Secondary,
            format!("INSERT INTO concurrent_test VALUES ({round});"),
        );
    }
    plan.exec("SELECT count(*) FROM concurrent_test;");
    plan.exec_on(
        ConnTarget::Secondary,
        "SELECT count(*) FROM concurrent_test;",
    );
}

/// Statements that must fail, each down a different error path. All are
/// expected outcomes; the run report counts them.
fn push_error_injection(plan: &mut Plan) {
    plan.exec(
        "CREATE TABLE IF NOT EXISTS err_t(\
         id INTEGER PRIMARY KEY, val TEXT NOT NULL CHECK (length(val) < 10));",
    );
    plan.exec("INSERT INTO err_t VALUES (1, 'ok');");
    plan.exec("INSERT INTO err_t VALUES (1, 'dup');"); // PRIMARY KEY
    plan.exec("INSERT INTO err_t VALUES (2, NULL);"); // NOT NULL
    plan.exec("INSERT INTO err_t VALUES (3, 'far too long for the check');"); // CHECK
    plan.exec("SELEC 1;"); // syntax
    plan.exec("SELECT * FROM no_such_table;"); // missing object
    plan.exec("SELECT count(*) FROM err_t;"); // and the connection still works
}

#[cfg(test)]
mod tests {
    use sqlgrind_core::EngineOp;

    use super::*;

    #[test]
    fn mode_selection_is_total() {
        for raw in 0..=u8::MAX {
            let _ = AdvancedMode::select(raw);
        }
        assert_eq!(AdvancedMode::select(7), AdvancedMode::Basic);
    }

    #[test]
    fn one_byte_input_is_skipped_without_a_plan() {
        assert!(plan_from_input(&[0]).is_none());
    }

    #[test]
    fn basic_mode_feeds_the_tail_as_sql() {
        let mut input = vec![0u8, 0];
        input.extend_from_slice(b"SELECT 42;");
        let plan = plan_from_input(&input).expect("decodable");
        assert_eq!(plan.len(), 1);
        match &plan.ops[0] {
            EngineOp::Script { sql, .. } => assert_eq!(sql, "SELECT 42;"),
            other => panic!("expected script, got {other:?}"),
        }
    }

    #[test]
    fn every_mode_produces_work_even_with_an_empty_tail() {
        for mode in 0..AdvancedMode::COUNT {
            let plan = plan_from_input(&[mode, 0]).expect("decodable");
            assert!(!plan.is_empty(), "mode {mode} produced an empty plan");
        }
    }

    #[test]
    fn template_modes_cap_their_op_count() {
        let mut input = vec![2u8, 0]; // Schema
        input.extend(std::iter::repeat(0u8).take(500));
        let plan = plan_from_input(&input).expect("decodable");
        assert!(plan.len() <= MAX_TEMPLATE_OPS + 1);
    }

    #[test]
    fn concurrent_mode_uses_both_connections() {
        let plan = plan_from_input(&[5, 0, 3]).expect("decodable");
        assert!(plan.uses_secondary());
    }

    #[test]
    fn non_concurrent_modes_stay_on_the_primary() {
        for mode in [0u8, 1, 2, 3, 4, 6] {
            let plan = plan_from_input(&[mode, 0, 9, 9, 9]).expect("decodable");
            assert!(!plan.uses_secondary(), "mode {mode} leaked to secondary");
        }
    }
}
