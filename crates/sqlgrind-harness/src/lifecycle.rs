//! Table-lifecycle harness: create a batch of tables, populate them, drop
//! a packet-chosen subset, and verify the survivors.
//!
//! Population goes through bound parameters rather than SQL literals so
//! the prepare/bind/step/finalize path runs alongside the one-shot exec
//! path the other harnesses lean on.

use sqlgrind_core::{Plan, SqlValue};
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::lifecycle::{DropMode, LifecyclePacket, ValidatedLifecycle};
use sqlgrind_packet::ConnFlags;

use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleScenario {
    /// Plain tables.
    Bare,
    /// Tables plus an index on every even-numbered one.
    Indexed,
    /// Tables plus views and triggers layered on top.
    Derived,
}

impl LifecycleScenario {
    pub const COUNT: u8 = 3;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::Bare,
            1 => Self::Indexed,
            _ => Self::Derived,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bare => "lifecycle_bare",
            Self::Indexed => "lifecycle_indexed",
            Self::Derived => "lifecycle_derived",
        }
    }
}

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((packet, tail)) = LifecyclePacket::decode(data) else {
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
    let (packet, tail) = LifecyclePacket::decode(data)?;
    let valid = packet.validate()?;
    Some(build_plan(&valid, tail))
}

fn build_plan(valid: &ValidatedLifecycle, tail: &[u8]) -> Plan {
    let scenario = LifecycleScenario::select((valid.scenario & 0xFF) as u8);
    let mut plan = Plan::new(scenario.label());

    for t in 0..valid.table_count {
        plan.exec(format!(
            "CREATE TABLE IF NOT EXISTS life_t{t}(\
             id INTEGER PRIMARY KEY, data BLOB, tag TEXT);"
        ));
        match scenario {
            LifecycleScenario::Bare => {}
            LifecycleScenario::Indexed => {
                if t % 2 == 0 {
                    plan.exec(format!(
                        "CREATE INDEX IF NOT EXISTS life_i{t} ON life_t{t}(tag);"
                    ));
                }
            }
            LifecycleScenario::Derived => {
                plan.exec(format!(
                    "CREATE VIEW IF NOT EXISTS life_v{t} AS SELECT id, tag FROM life_t{t};"
                ));
                plan.exec(format!(
                    "CREATE TRIGGER IF NOT EXISTS life_tr{t} \
                     AFTER INSERT ON life_t{t} BEGIN SELECT 1; END;"
                ));
            }
        }

        for row in 0..valid.rows_per_table {
            plan.query(
                format!("INSERT INTO life_t{t}(data, tag) VALUES (?1, ?2);"),
                vec![
                    SqlValue::Blob(blob_payload(valid, row)),
                    SqlValue::Text(format!("t{t}_row{row}")),
                ],
            );
        }
    }

    push_drops(&mut plan, valid);

    plan.exec("PRAGMA quick_check;");

    if !tail.is_empty() {
        plan.script(String::from_utf8_lossy(tail).into_owned());
    }

    plan
}

fn push_drops(plan: &mut Plan, valid: &ValidatedLifecycle) {
    match valid.drop_mode {
        DropMode::EvenHalf => {
            for t in (0..valid.table_count).step_by(2) {
                plan.exec(format!("DROP TABLE IF EXISTS life_t{t};"));
            }
        }
        DropMode::TailHalf => {
            for t in valid.table_count / 2..valid.table_count {
                plan.exec(format!("DROP TABLE IF EXISTS life_t{t};"));
            }
        }
        DropMode::AllThenRecreate => {
            for t in 0..valid.table_count {
                plan.exec(format!("DROP TABLE IF EXISTS life_t{t};"));
            }
            plan.exec(
                "CREATE TABLE IF NOT EXISTS life_t0(\
                 id INTEGER PRIMARY KEY, data BLOB, tag TEXT);",
            );
        }
        DropMode::Keep => {}
    }
}

/// Deterministic blob built by cycling the packet payload out to the
/// validated size.
fn blob_payload(valid: &ValidatedLifecycle, row: u32) -> Vec<u8> {
    valid
        .payload
        .iter()
        .cycle()
        .skip(row as usize % valid.payload.len())
        .take(valid.blob_bytes as usize)
        .copied()
        .collect()
}
