//! Page-allocation harness.
//!
//! Drives the engine's B-tree page allocator through its interesting
//! regimes: allocation from a fragmented freelist, allocation under a
//! lowered heap limit, and allocation interleaved with integrity checks
//! that walk the structures just built.

use sqlgrind_core::Plan;
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::alloc::{AllocPacket, InsertOrder, ValidatedAlloc};

use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocScenario {
    /// Fill pages, delete a stride, refill from the freelist.
    FreelistChurn,
    /// Churn plus integrity probes over the result.
    FreelistFull,
    /// Churn under a lowered hard heap limit.
    MemoryStress,
    /// Integrity and quick checks only.
    CorruptionProbe,
    /// Everything above in sequence. Fallback branch.
    Mixed,
}

impl AllocScenario {
    pub const COUNT: u8 = 5;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::FreelistChurn,
            1 => Self::FreelistFull,
            2 => Self::MemoryStress,
            3 => Self::CorruptionProbe,
            _ => Self::Mixed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FreelistChurn => "alloc_freelist_churn",
            Self::FreelistFull => "alloc_freelist_full",
            Self::MemoryStress => "alloc_memory_stress",
            Self::CorruptionProbe => "alloc_corruption_probe",
            Self::Mixed => "alloc_mixed",
        }
    }
}

/// Hard heap limit restored after the memory-stress phase.
const BASELINE_HEAP_LIMIT: i64 = 20_000_000;

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((packet, tail)) = AllocPacket::decode(data) else {
        return Outcome::Skipped(Skip::ShortInput);
    };
    let Some(valid) = packet.validate() else {
        return Outcome::Skipped(Skip::FieldRejected);
    };
    let plan = build_plan(&valid, tail);
    let profile = ConnProfile::in_memory(valid.conn_flags);
    execute(&plan, &profile, valid.row_budget, opts)
}

/// Decode, validate, and plan without touching the engine. `None` mirrors
/// the skip cases of [`run`].
pub fn plan_from_input(data: &[u8]) -> Option<Plan> {
    let (packet, tail) = AllocPacket::decode(data)?;
    let valid = packet.validate()?;
    Some(build_plan(&valid, tail))
}

fn build_plan(valid: &ValidatedAlloc, tail: &[u8]) -> Plan {
    let scenario = AllocScenario::select(valid.scenario);
    let mut plan = Plan::new(scenario.label());

    plan.exec(format!(
        "CREATE TABLE IF NOT EXISTS btree_test(\
         id INTEGER PRIMARY KEY, data BLOB, extra TEXT DEFAULT 'padding_{}');",
        valid.nearby_pgno % 1000
    ));

    match scenario {
        AllocScenario::FreelistChurn => push_freelist_churn(&mut plan, valid),
        AllocScenario::FreelistFull => {
            push_freelist_churn(&mut plan, valid);
            push_corruption_probe(&mut plan, valid);
        }
        AllocScenario::MemoryStress => push_memory_stress(&mut plan, valid),
        AllocScenario::CorruptionProbe => push_corruption_probe(&mut plan, valid),
        AllocScenario::Mixed => {
            push_freelist_churn(&mut plan, valid);
            push_memory_stress(&mut plan, valid);
            push_corruption_probe(&mut plan, valid);
        }
    }

    if !tail.is_empty() {
        plan.script(String::from_utf8_lossy(tail).into_owned());
    }

    plan
}

/// Fill pages, delete a stride to fragment the freelist, then refill so
/// the allocator has to reuse freed pages.
fn push_freelist_churn(plan: &mut Plan, valid: &ValidatedAlloc) {
    let iterations = u32::from(valid.payload[1] % 48) + 1;
    for i in 0..iterations {
        let blob = u32::from(valid.payload[i as usize % 32]) % 1000 + 100;
        plan.exec(insert_sql(valid.insert_order, valid, i, blob));
    }

    let stride = valid.corruption_mask % 7 + 1;
    plan.exec(format!("DELETE FROM btree_test WHERE id % {stride} = 0;"));

    for i in 0..iterations / 2 {
        let blob = u32::from(valid.payload[(i as usize + 16) % 32]) % 500 + 50;
        plan.exec(insert_sql(valid.insert_order, valid, i + iterations, blob));
    }
}

/// Lower the hard heap limit, push one oversized insert into it, restore.
fn push_memory_stress(plan: &mut Plan, valid: &ValidatedAlloc) {
    let lowered = i64::from(valid.heap_pressure.max(1_000_000));
    plan.heap_limit(lowered);
    let blob = valid.nearby_pgno % 50_000 + 1_000;
    plan.exec(format!(
        "INSERT INTO btree_test(data) VALUES (randomblob({blob}));"
    ));
    plan.heap_limit(BASELINE_HEAP_LIMIT);
}

fn push_corruption_probe(plan: &mut Plan, valid: &ValidatedAlloc) {
    let check_rows = valid.corruption_mask % 100 + 1;
    plan.exec(format!("PRAGMA integrity_check({check_rows});"));
    plan.exec("PRAGMA quick_check;");
    plan.exec("PRAGMA freelist_count;");
}

fn insert_sql(order: InsertOrder, valid: &ValidatedAlloc, i: u32, blob: u32) -> String {
    match order {
        InsertOrder::Sequential => format!(
            "INSERT INTO btree_test(data) VALUES (randomblob({blob}));"
        ),
        InsertOrder::Reverse => format!(
            "INSERT OR REPLACE INTO btree_test(id, data) VALUES ({}, randomblob({blob}));",
            1_000_000 - i64::from(i)
        ),
        InsertOrder::Scattered => {
            let stride = u32::from(valid.payload[2] % 97) + 1;
            let id = (u64::from(i) * u64::from(stride)) % 100_000;
            format!(
                "INSERT OR REPLACE INTO btree_test(id, data) VALUES ({id}, randomblob({blob}));"
            )
        }
    }
}
