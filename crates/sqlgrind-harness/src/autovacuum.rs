//! Auto-vacuum harness.
//!
//! Exercises the commit-time vacuum path: fill a database, fragment it
//! with patterned deletes, and commit or incrementally vacuum so the
//! engine relocates pages. The page size and vacuum mode come from the
//! packet, so the same scenarios run across the whole page-size ladder.

use sqlgrind_core::Plan;
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::autovacuum::{AutoVacuumPacket, ValidatedAutoVacuum};
use sqlgrind_packet::ConnFlags;

use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoVacuumScenario {
    /// Fill, fragment, commit inside an immediate transaction.
    FillAndCommit,
    /// Incremental vacuum with a packet-driven page count.
    Incremental,
    /// Integrity probes layered over the fill path.
    CorruptionCheck,
    /// Delete ratio mimicking a custom vacuum callback.
    CallbackShape,
    /// Incremental vacuum then integrity probes.
    IncrementalChecked,
    /// Fill path then callback-shaped deletes.
    FillCallback,
    /// Fill, incremental, and probes back to back.
    Stress,
    /// Everything. Fallback branch.
    Comprehensive,
}

impl AutoVacuumScenario {
    pub const COUNT: u8 = 8;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::FillAndCommit,
            1 => Self::Incremental,
            2 => Self::CorruptionCheck,
            3 => Self::CallbackShape,
            4 => Self::IncrementalChecked,
            5 => Self::FillCallback,
            6 => Self::Stress,
            _ => Self::Comprehensive,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FillAndCommit => "autovac_fill_commit",
            Self::Incremental => "autovac_incremental",
            Self::CorruptionCheck => "autovac_corruption_check",
            Self::CallbackShape => "autovac_callback_shape",
            Self::IncrementalChecked => "autovac_incremental_checked",
            Self::FillCallback => "autovac_fill_callback",
            Self::Stress => "autovac_stress",
            Self::Comprehensive => "autovac_comprehensive",
        }
    }
}

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((packet, tail)) = AutoVacuumPacket::decode(data) else {
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
    let (packet, tail) = AutoVacuumPacket::decode(data)?;
    let valid = packet.validate()?;
    Some(build_plan(&valid, tail))
}

fn build_plan(valid: &ValidatedAutoVacuum, tail: &[u8]) -> Plan {
    let scenario = AutoVacuumScenario::select((valid.scenario & 0xFF) as u8);
    let mut plan = Plan::new(scenario.label());

    // Page size and vacuum mode must land before any table exists.
    plan.exec(format!("PRAGMA page_size = {};", valid.page_size));
    plan.exec(format!(
        "PRAGMA auto_vacuum = {};",
        valid.vacuum_mode.keyword()
    ));
    plan.exec(format!(
        "CREATE TABLE IF NOT EXISTS autovac_main(\
         id INTEGER PRIMARY KEY, payload BLOB, metadata TEXT DEFAULT 'autovac_{}');",
        valid.corruption_seed % 1000
    ));

    match scenario {
        AutoVacuumScenario::FillAndCommit => push_fill_and_commit(&mut plan, valid),
        AutoVacuumScenario::Incremental => push_incremental(&mut plan, valid),
        AutoVacuumScenario::CorruptionCheck => {
            push_corruption_probe(&mut plan, valid);
            push_fill_and_commit(&mut plan, valid);
        }
        AutoVacuumScenario::CallbackShape => push_callback_shape(&mut plan, valid),
        AutoVacuumScenario::IncrementalChecked => {
            push_incremental(&mut plan, valid);
            push_corruption_probe(&mut plan, valid);
        }
        AutoVacuumScenario::FillCallback => {
            push_fill_and_commit(&mut plan, valid);
            push_callback_shape(&mut plan, valid);
        }
        AutoVacuumScenario::Stress => {
            push_fill_and_commit(&mut plan, valid);
            push_incremental(&mut plan, valid);
            push_corruption_probe(&mut plan, valid);
        }
        AutoVacuumScenario::Comprehensive => {
            push_fill_and_commit(&mut plan, valid);
            push_incremental(&mut plan, valid);
            push_callback_shape(&mut plan, valid);
            push_corruption_probe(&mut plan, valid);
        }
    }

    if !tail.is_empty() {
        plan.script(String::from_utf8_lossy(tail).into_owned());
    }

    plan
}

fn push_fill(plan: &mut Plan, valid: &ValidatedAutoVacuum, rows: u32, size_base: u32, offset: usize) {
    for i in 0..rows {
        let byte = valid.test_data[(i as usize + offset) % 24];
        let blob = u32::from(byte) % size_base + 100;
        plan.exec(format!(
            "INSERT INTO autovac_main(payload) VALUES (randomblob({blob}));"
        ));
    }
}

fn push_fill_and_commit(plan: &mut Plan, valid: &ValidatedAutoVacuum) {
    push_fill(plan, valid, valid.fill_rows, 2_000, 0);

    let stride = valid.vacuum_pages % 9 + 1;
    plan.exec(format!("DELETE FROM autovac_main WHERE id % {stride} = 0;"));

    // Commit-time vacuum fires when the transaction closes.
    plan.exec("BEGIN IMMEDIATE;");
    push_fill(plan, valid, valid.fill_rows / 4, 1_000, 12);
    plan.exec("COMMIT;");
}

fn push_incremental(plan: &mut Plan, valid: &ValidatedAutoVacuum) {
    plan.exec("PRAGMA auto_vacuum = INCREMENTAL;");
    push_fill(plan, valid, valid.fill_rows / 2 + 10, 5_000, 0);
    plan.exec("DELETE FROM autovac_main WHERE id % 2 = 0;");
    plan.exec(format!(
        "PRAGMA incremental_vacuum({});",
        valid.vacuum_pages
    ));
}

fn push_corruption_probe(plan: &mut Plan, valid: &ValidatedAutoVacuum) {
    plan.exec("PRAGMA cell_size_check = ON;");
    plan.exec(format!(
        "PRAGMA integrity_check({});",
        valid.corruption_seed % 100 + 1
    ));
    plan.exec("PRAGMA quick_check;");
    plan.exec("PRAGMA freelist_count;");
}

/// Delete a fraction of rows shaped like a custom vacuum callback's answer:
/// none, all free pages, half, three quarters, or a packet-chosen count.
fn push_callback_shape(plan: &mut Plan, valid: &ValidatedAutoVacuum) {
    push_fill(plan, valid, valid.fill_rows, 1_000, 6);
    let free = valid.fill_rows / 3 + 1;
    let reclaim = match valid.custom_vac % 5 {
        0 => 0,
        1 => free,
        2 => free / 2,
        3 => free * 3 / 4,
        _ => valid.vacuum_pages % free + 1,
    };
    if reclaim > 0 {
        let stride = valid.fill_rows / reclaim + 1;
        plan.exec(format!("DELETE FROM autovac_main WHERE id % {stride} = 0;"));
    }
    plan.exec("PRAGMA freelist_count;");
}
