//! Cursor-navigation harness.
//!
//! Seeds a keyed table and walks it the ways a cursor can move: point
//! lookups, range scans, full ordered traversals in both directions, and
//! traversal interleaved with mutation. The probe keys are bound
//! parameters typed by the packet, so the comparison paths for integer,
//! text, blob, and NULL keys all run against the same tree.

use sqlgrind_core::{Plan, SqlValue};
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::cursor::{AccessMode, CursorPacket, KeyType, ValidatedCursor};
use sqlgrind_packet::ConnFlags;

use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorScenario {
    PointLookups,
    RangeScan,
    OrderedWalk,
    MutatingWalk,
}

impl CursorScenario {
    pub const COUNT: u8 = 4;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::PointLookups,
            1 => Self::RangeScan,
            2 => Self::OrderedWalk,
            _ => Self::MutatingWalk,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PointLookups => "cursor_point_lookups",
            Self::RangeScan => "cursor_range_scan",
            Self::OrderedWalk => "cursor_ordered_walk",
            Self::MutatingWalk => "cursor_mutating_walk",
        }
    }
}

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((packet, tail)) = CursorPacket::decode(data) else {
        return Outcome::Skipped(Skip::ShortInput);
    };
    let Some(valid) = packet.validate() else {
        return Outcome::Skipped(Skip::FieldRejected);
    };
    let plan = build_plan(&valid, tail);
    let profile = ConnProfile::in_memory(ConnFlags::empty());
    execute(&plan, &profile, valid.row_budget, opts)
}

pub fn plan_from_input(data: &[u8]) -> Option<Plan> {
    let (packet, tail) = CursorPacket::decode(data)?;
    let valid = packet.validate()?;
    Some(build_plan(&valid, tail))
}

fn build_plan(valid: &ValidatedCursor, tail: &[u8]) -> Plan {
    let scenario = CursorScenario::select((valid.scenario & 0xFF) as u8);
    let mut plan = Plan::new(scenario.label());

    plan.exec("CREATE TABLE IF NOT EXISTS nav(id INTEGER PRIMARY KEY, k, v BLOB);");
    plan.exec("CREATE INDEX IF NOT EXISTS nav_k ON nav(k);");

    for row in 0..valid.seed_rows {
        plan.query(
            "INSERT OR REPLACE INTO nav(id, k, v) VALUES (?1, ?2, randomblob(24));".to_owned(),
            vec![SqlValue::Integer(i64::from(row)), seed_key(valid, row)],
        );
    }

    match scenario {
        CursorScenario::PointLookups => {
            for probe in 0..valid.key_span {
                plan.query(
                    "SELECT id, k, v FROM nav WHERE k = ?1;".to_owned(),
                    vec![probe_key(valid, probe)],
                );
            }
        }
        CursorScenario::RangeScan => {
            plan.query(
                "SELECT id, k FROM nav WHERE k BETWEEN ?1 AND ?2 ORDER BY k;".to_owned(),
                vec![probe_key(valid, 0), probe_key(valid, valid.key_span)],
            );
            plan.query(
                "SELECT id, k FROM nav WHERE k >= ?1 ORDER BY k DESC;".to_owned(),
                vec![probe_key(valid, valid.key_span / 2)],
            );
        }
        CursorScenario::OrderedWalk => {
            plan.exec("SELECT id, k FROM nav ORDER BY k ASC;");
            plan.exec("SELECT id, k FROM nav ORDER BY k DESC;");
            plan.exec("SELECT min(k), max(k), count(*) FROM nav;");
        }
        CursorScenario::MutatingWalk => {
            push_mutation(&mut plan, valid);
            plan.exec("SELECT id, k FROM nav ORDER BY k ASC;");
        }
    }

    if !tail.is_empty() {
        plan.script(String::from_utf8_lossy(tail).into_owned());
    }

    plan
}

fn push_mutation(plan: &mut Plan, valid: &ValidatedCursor) {
    match valid.access_mode {
        AccessMode::Read => {
            plan.exec("SELECT count(*) FROM nav;");
        }
        AccessMode::Write => {
            for probe in 0..valid.key_span {
                plan.query(
                    "UPDATE nav SET v = randomblob(8) WHERE k = ?1;".to_owned(),
                    vec![probe_key(valid, probe)],
                );
            }
        }
        AccessMode::Delete => {
            let stride = valid.key_span + 1;
            plan.exec(format!("DELETE FROM nav WHERE id % {stride} = 0;"));
        }
    }
}

/// Key stored with row `row` at seed time.
fn seed_key(valid: &ValidatedCursor, row: u32) -> SqlValue {
    typed_key(valid, row)
}

/// Key probed during navigation. Shares the derivation with [`seed_key`]
/// so some probes hit and the rest land between entries.
fn probe_key(valid: &ValidatedCursor, probe: u32) -> SqlValue {
    typed_key(valid, probe.wrapping_mul(3))
}

fn typed_key(valid: &ValidatedCursor, n: u32) -> SqlValue {
    let salt = u32::from(valid.key_data[n as usize % 20]);
    match valid.key_type {
        KeyType::Integer => SqlValue::Integer(i64::from(n) * 257 + i64::from(salt)),
        KeyType::Text => SqlValue::Text(format!("key_{salt:03}_{n:06}")),
        KeyType::Blob => {
            let mut bytes = valid.key_data.to_vec();
            bytes.rotate_left(n as usize % 20);
            SqlValue::Blob(bytes)
        }
        KeyType::Null => SqlValue::Null,
    }
}
