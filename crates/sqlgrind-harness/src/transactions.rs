//! Transaction-state harness.
//!
//! Walks the engine through transaction and savepoint state transitions:
//! nested savepoint ladders, byte-stream-driven op sequences, and
//! immediate/exclusive lock cycles. The planner tracks nesting depth so
//! commits and rollbacks only appear where the engine could accept them;
//! anything left open at the end is the teardown rollback's problem, which
//! is exactly the path that needs fuzzing.

use sqlgrind_core::Plan;
use sqlgrind_engine::ConnProfile;
use sqlgrind_packet::trans::{TransPacket, ValidatedTrans};

use crate::{execute, HarnessOptions, Outcome, Skip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransScenario {
    /// BEGIN, a ladder of savepoints, partial release/rollback, COMMIT.
    SavepointLadder,
    /// Each packet byte drives one depth-tracked transaction op.
    OpStream,
    /// BEGIN IMMEDIATE / EXCLUSIVE cycles with work inside.
    LockCycle,
    /// Ladder then op stream; transaction may be left open on purpose.
    Mixed,
}

impl TransScenario {
    pub const COUNT: u8 = 4;

    pub fn select(raw: u8) -> Self {
        match raw % Self::COUNT {
            0 => Self::SavepointLadder,
            1 => Self::OpStream,
            2 => Self::LockCycle,
            _ => Self::Mixed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SavepointLadder => "trans_savepoint_ladder",
            Self::OpStream => "trans_op_stream",
            Self::LockCycle => "trans_lock_cycle",
            Self::Mixed => "trans_mixed",
        }
    }
}

pub fn run(data: &[u8], opts: &HarnessOptions) -> Outcome {
    let Some((packet, tail)) = TransPacket::decode(data) else {
        return Outcome::Skipped(Skip::ShortInput);
    };
    let valid = packet.validate();
    let plan = build_plan(&valid, tail);
    let profile = ConnProfile::in_memory(valid.conn_flags);
    execute(&plan, &profile, valid.row_budget, opts)
}

pub fn plan_from_input(data: &[u8]) -> Option<Plan> {
    let (packet, tail) = TransPacket::decode(data)?;
    let valid = packet.validate();
    Some(build_plan(&valid, tail))
}

fn build_plan(valid: &ValidatedTrans, tail: &[u8]) -> Plan {
    let scenario = TransScenario::select((valid.scenario & 0xFF) as u8);
    let mut plan = Plan::new(scenario.label());

    plan.exec(
        "CREATE TABLE IF NOT EXISTS txn_t(\
         id INTEGER PRIMARY KEY, tag TEXT, body BLOB);",
    );

    match scenario {
        TransScenario::SavepointLadder => push_savepoint_ladder(&mut plan, valid),
        TransScenario::OpStream => push_op_stream(&mut plan, valid, &valid.test_data),
        TransScenario::LockCycle => push_lock_cycle(&mut plan, valid),
        TransScenario::Mixed => {
            push_savepoint_ladder(&mut plan, valid);
            push_op_stream(&mut plan, valid, &valid.test_data);
        }
    }

    if !tail.is_empty() {
        plan.script(String::from_utf8_lossy(tail).into_owned());
    }

    plan
}

fn push_savepoint_ladder(plan: &mut Plan, valid: &ValidatedTrans) {
    let depth = u32::from(valid.test_data[1] % 6) + 1;
    plan.exec(begin_sql(valid.write_txn));
    for level in 0..depth {
        plan.exec(format!("SAVEPOINT {};", savepoint_name(valid, level)));
        plan.exec(format!(
            "INSERT INTO txn_t(tag, body) VALUES ('level{level}', randomblob(16));"
        ));
    }
    // Unwind: odd packet bytes release, even bytes roll back to.
    for level in (0..depth).rev() {
        let name = savepoint_name(valid, level);
        if valid.test_data[2 + level as usize % 18] % 2 == 1 {
            plan.exec(format!("RELEASE {name};"));
        } else {
            plan.exec(format!("ROLLBACK TO {name};"));
        }
    }
    plan.exec("COMMIT;");
}

/// One transaction op per byte, with the same depth discipline the
/// original harness kept: structural ops that the current depth cannot
/// accept degrade to an insert, so no byte is wasted.
pub(crate) fn push_op_stream(plan: &mut Plan, valid: &ValidatedTrans, stream: &[u8]) {
    let mut depth = 0u32;
    for (i, &byte) in stream.iter().enumerate() {
        match byte % 8 {
            0 if depth == 0 => {
                depth += 1;
                plan.exec("BEGIN TRANSACTION;");
            }
            1 if depth > 0 => {
                depth -= 1;
                plan.exec("COMMIT;");
            }
            2 if depth > 0 => {
                depth -= 1;
                plan.exec("ROLLBACK;");
            }
            3 => plan.exec(format!(
                "SAVEPOINT {};",
                savepoint_name(valid, u32::from(byte >> 3) % 4)
            )),
            4 => plan.exec(format!(
                "RELEASE {};",
                savepoint_name(valid, u32::from(byte >> 3) % 4)
            )),
            5 => plan.exec(format!(
                "ROLLBACK TO {};",
                savepoint_name(valid, u32::from(byte >> 3) % 4)
            )),
            6 if depth == 0 => {
                depth += 1;
                plan.exec("BEGIN IMMEDIATE;");
            }
            7 if depth == 0 => {
                depth += 1;
                plan.exec("BEGIN EXCLUSIVE;");
            }
            _ => plan.exec(format!(
                "INSERT OR IGNORE INTO txn_t VALUES ({i}, 'test{i}', randomblob(10));"
            )),
        }
    }
}

fn push_lock_cycle(plan: &mut Plan, valid: &ValidatedTrans) {
    let rounds = u32::from(valid.test_data[3] % 4) + 1;
    for round in 0..rounds {
        let keyword = if (valid.corruption_mask >> round) & 1 == 0 {
            "IMMEDIATE"
        } else {
            "EXCLUSIVE"
        };
        plan.exec(format!("BEGIN {keyword};"));
        plan.exec(format!(
            "INSERT INTO txn_t(tag, body) VALUES ('round{round}', randomblob(32));"
        ));
        if round % 2 == 0 {
            plan.exec("COMMIT;");
        } else {
            plan.exec("ROLLBACK;");
        }
    }
}

fn begin_sql(write: bool) -> &'static str {
    if write {
        "BEGIN IMMEDIATE;"
    } else {
        "BEGIN DEFERRED;"
    }
}

fn savepoint_name(valid: &ValidatedTrans, level: u32) -> String {
    format!("sp{}_{level}", valid.name_seed % 97)
}

#[cfg(test)]
mod tests {
    use sqlgrind_core::EngineOp;
    use sqlgrind_packet::trans::TRANS_PACKET_LEN;

    use super::*;

    fn plan_for(scenario: u8, stream: [u8; 20]) -> Plan {
        let mut buf = [0u8; TRANS_PACKET_LEN];
        buf[2] = scenario;
        buf[12..32].copy_from_slice(&stream);
        plan_from_input(&buf).expect("valid packet")
    }

    fn sql_ops(plan: &Plan) -> Vec<&str> {
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
            let _ = TransScenario::select(raw);
        }
    }

    #[test]
    fn ladder_opens_and_closes_in_balance() {
        let plan = plan_for(0, [0u8; 20]);
        let ops = sql_ops(&plan);
        let savepoints = ops.iter().filter(|s| s.starts_with("SAVEPOINT")).count();
        let unwinds = ops
            .iter()
            .filter(|s| s.starts_with("RELEASE") || s.starts_with("ROLLBACK TO"))
            .count();
        assert_eq!(savepoints, unwinds);
        assert_eq!(*ops.last().unwrap(), "COMMIT;");
    }

    #[test]
    fn op_stream_never_commits_below_depth_zero() {
        // All bytes select COMMIT; without an open transaction every one
        // must degrade to the insert fallback.
        let plan = plan_for(1, [1u8; 20]);
        let ops = sql_ops(&plan);
        assert!(!ops.iter().any(|s| *s == "COMMIT;"));
        assert!(ops.iter().any(|s| s.starts_with("INSERT OR IGNORE")));
    }

    #[test]
    fn op_stream_opens_at_most_one_transaction() {
        let plan = plan_for(1, [0u8; 20]);
        let ops = sql_ops(&plan);
        let begins = ops.iter().filter(|s| s.starts_with("BEGIN")).count();
        assert_eq!(begins, 1, "depth discipline allows a single open BEGIN");
    }

    #[test]
    fn lock_cycle_pairs_every_begin_with_an_end() {
        let mut stream = [0u8; 20];
        stream[3] = 3; // rounds = 4
        let plan = plan_for(2, stream);
        let ops = sql_ops(&plan);
        let begins = ops.iter().filter(|s| s.starts_with("BEGIN")).count();
        let ends = ops
            .iter()
            .filter(|s| **s == "COMMIT;" || **s == "ROLLBACK;")
            .count();
        assert_eq!(begins, ends);
    }
}
