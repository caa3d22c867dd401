//! Configuration harness: drives the engine's tuning surface.
//!
//! Page geometry, journal modes, cache sizing, and a battery of
//! introspection pragmas — including the debug pragmas the authorizer is
//! expected to veto. The veto is part of the scenario: the denied
//! statement fails, the plan continues, and the denial shows up as an
//! ordinary engine error in the stats.

use sqlgrind_core::Plan;
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::config::{ConfigPacket, JournalMode, ValidatedConfig};
use sqlgrind_packet::validate::PAGE_SIZES;
use sqlgrind_packet::ConnFlags;

use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScenario {
    /// Page-size changes with VACUUM to rebuild the file.
    PageGeometry,
    /// Cycle journal modes, checkpointing where WAL is active.
    JournalSpin,
    /// Cache and mmap sizing knobs.
    CacheTuning,
    /// Introspection battery plus the vetoed debug pragmas.
    ProbeBattery,
}

impl ConfigScenario {
    pub const COUNT: u8 = 4;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::PageGeometry,
            1 => Self::JournalSpin,
            2 => Self::CacheTuning,
            _ => Self::ProbeBattery,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PageGeometry => "config_page_geometry",
            Self::JournalSpin => "config_journal_spin",
            Self::CacheTuning => "config_cache_tuning",
            Self::ProbeBattery => "config_probe_battery",
        }
    }
}

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((packet, tail)) = ConfigPacket::decode(data) else {
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
    let (packet, tail) = ConfigPacket::decode(data)?;
    let valid = packet.validate()?;
    Some(build_plan(&valid, tail))
}

fn build_plan(valid: &ValidatedConfig, tail: &[u8]) -> Plan {
    let scenario = ConfigScenario::select((valid.scenario & 0xFF) as u8);
    let mut plan = Plan::new(scenario.label());

    plan.exec(format!("PRAGMA page_size = {};", valid.page_size));
    plan.exec(format!(
        "PRAGMA journal_mode = {};",
        valid.journal_mode.keyword()
    ));
    plan.exec(format!("PRAGMA cache_size = -{};", valid.cache_kib));
    plan.exec("CREATE TABLE IF NOT EXISTS cfg_t(id INTEGER PRIMARY KEY, body BLOB);");
    for i in 0..8 {
        let blob = u32::from(valid.payload[i]) % 900 + 100;
        plan.exec(format!(
            "INSERT INTO cfg_t(body) VALUES (randomblob({blob}));"
        ));
    }

    match scenario {
        ConfigScenario::PageGeometry => push_page_geometry(&mut plan, valid),
        ConfigScenario::JournalSpin => push_journal_spin(&mut plan, valid),
        ConfigScenario::CacheTuning => push_cache_tuning(&mut plan, valid),
        ConfigScenario::ProbeBattery => push_probe_battery(&mut plan, valid),
    }

    if !tail.is_empty() {
        plan.script(String::from_utf8_lossy(tail).into_owned());
    }

    plan
}

/// Change the page size after the file has content; only VACUUM can apply
/// it, which rewrites every page.
fn push_page_geometry(plan: &mut Plan, valid: &ValidatedConfig) {
    let other = PAGE_SIZES[(valid.probe_mask as usize + 1) % PAGE_SIZES.len()];
    plan.exec("PRAGMA page_count;");
    plan.exec(format!("PRAGMA page_size = {other};"));
    plan.exec("VACUUM;");
    plan.exec("PRAGMA page_size;");
    plan.exec("PRAGMA page_count;");
}

fn push_journal_spin(plan: &mut Plan, valid: &ValidatedConfig) {
    for step in 0..3u32 {
        let idx = (valid.probe_mask.wrapping_add(step)) % u32::from(JournalMode::COUNT);
        let mode = JournalMode::select(idx as u8);
        plan.exec(format!("PRAGMA journal_mode = {};", mode.keyword()));
        plan.exec(format!(
            "INSERT INTO cfg_t(body) VALUES (randomblob({}));",
            step * 64 + 32
        ));
        if mode == JournalMode::Wal {
            plan.exec("PRAGMA wal_checkpoint(TRUNCATE);");
        }
    }
    plan.exec("PRAGMA journal_size_limit = 65536;");
}

fn push_cache_tuning(plan: &mut Plan, valid: &ValidatedConfig) {
    plan.exec(format!("PRAGMA cache_size = {};", valid.cache_kib % 500 + 10));
    plan.exec("PRAGMA cache_spill = ON;");
    plan.exec(format!(
        "PRAGMA mmap_size = {};",
        (valid.probe_mask % 2) * 65_536
    ));
    plan.exec("PRAGMA shrink_memory;");
    plan.exec("SELECT count(*) FROM cfg_t;");
}

fn push_probe_battery(plan: &mut Plan, valid: &ValidatedConfig) {
    // The authorizer denies these two; the statements fail and the plan
    // keeps going.
    plan.exec("PRAGMA vdbe_trace = ON;");
    plan.exec("PRAGMA parser_trace = ON;");

    plan.exec(format!(
        "PRAGMA integrity_check({});",
        valid.probe_mask % 100 + 1
    ));
    plan.exec("PRAGMA freelist_count;");
    plan.exec("PRAGMA journal_mode;");
    plan.exec("SELECT count(*) FROM cfg_t;");
    // Last: emits a row per compile option and may eat the row budget.
    plan.exec("PRAGMA compile_options;");
}

#[cfg(test)]
mod tests {
    use sqlgrind_core::EngineOp;
    use sqlgrind_packet::config::CONFIG_PACKET_LEN;

    use super::*;

    fn buf(scenario: u8) -> [u8; CONFIG_PACKET_LEN] {
        let mut buf = [0u8; CONFIG_PACKET_LEN];
        buf[2] = scenario;
        buf
    }

    fn sqls(plan: &Plan) -> Vec<&str> {
        plan.ops
            .iter()
            .filter_map(|op| match op {
                EngineOp::Exec { sql, .. } => Some(sql.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn scenario_selection_is_total() {
        for raw in 0..=u8::MAX {
            let _ = ConfigScenario::select(raw);
        }
    }

    #[test]
    fn probe_battery_includes_the_vetoed_pragmas() {
        let plan = plan_from_input(&buf(3)).expect("valid packet");
        let sqls = sqls(&plan);
        assert!(sqls.contains(&"PRAGMA vdbe_trace = ON;"));
        assert!(sqls.contains(&"PRAGMA parser_trace = ON;"));
        // And work that must still succeed after the denials.
        assert!(sqls.contains(&"SELECT count(*) FROM cfg_t;"));
    }

    #[test]
    fn page_geometry_vacuums_after_resizing() {
        let plan = plan_from_input(&buf(0)).expect("valid packet");
        let sqls = sqls(&plan);
        let resize = sqls
            .iter()
            .rposition(|s| s.starts_with("PRAGMA page_size ="))
            .expect("resize present");
        let vacuum = sqls.iter().position(|s| *s == "VACUUM;").expect("vacuum present");
        assert!(vacuum > resize, "VACUUM must follow the resize");
    }

    #[test]
    fn journal_spin_checkpoints_only_in_wal() {
        // probe_mask = 0 walks DELETE, TRUNCATE, PERSIST: no checkpoint.
        let plan = plan_from_input(&buf(1)).expect("valid packet");
        assert!(!sqls(&plan).iter().any(|s| s.contains("wal_checkpoint")));

        let mut b = buf(1);
        b[8..12].copy_from_slice(&4u32.to_le_bytes()); // probe_mask = 4 → WAL first
        let plan = plan_from_input(&b).expect("valid packet");
        assert!(sqls(&plan).iter().any(|s| s.contains("wal_checkpoint")));
    }
}
