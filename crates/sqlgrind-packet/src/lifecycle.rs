//! Packet layout for the table-lifecycle harness (create, populate, drop).

use serde::Serialize;

use crate::reader::PacketReader;
use crate::validate::{ceilings, quantity, reduce};

pub const LIFECYCLE_PACKET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePacket {
    pub table_count: u8,
    pub drop_mode: u8,
    pub scenario: u16,
    pub rows_per_table: u32,
    pub blob_bytes: u32,
    pub payload: [u8; 20],
}

/// Which of the created tables are dropped before teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropMode {
    /// Drop every even-indexed table (roughly half).
    EvenHalf,
    /// Drop the second half of the tables in creation order.
    TailHalf,
    /// Drop all tables, then recreate the first one.
    AllThenRecreate,
    /// Drop nothing; teardown closes over live tables.
    Keep,
}

impl DropMode {
    pub const COUNT: u8 = 4;

    pub fn select(raw: u8) -> Self {
        match reduce(raw, Self::COUNT) {
            0 => Self::EvenHalf,
            1 => Self::TailHalf,
            2 => Self::AllThenRecreate,
            _ => Self::Keep,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLifecycle {
    /// Tables to create, 1..=MAX_TABLE_COUNT.
    pub table_count: u32,
    pub drop_mode: DropMode,
    pub scenario: u16,
    pub rows_per_table: u32,
    pub blob_bytes: u32,
    pub payload: [u8; 20],
    pub row_budget: u32,
}

impl LifecyclePacket {
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let packet = Self {
            table_count: r.u8()?,
            drop_mode: r.u8()?,
            scenario: r.u16_le()?,
            rows_per_table: r.u32_le()?,
            blob_bytes: r.u32_le()?,
            payload: r.array()?,
        };
        Some((packet, r.tail()))
    }

    pub fn validate(&self) -> Option<ValidatedLifecycle> {
        let table_count = quantity(u32::from(self.table_count), ceilings::MAX_TABLE_COUNT)?.max(1);
        let rows_per_table =
            quantity(self.rows_per_table, ceilings::MAX_ROWS_PER_TABLE)?.max(1);
        let blob_bytes = quantity(self.blob_bytes, ceilings::MAX_BLOB_BYTES)?.max(1);
        Some(ValidatedLifecycle {
            table_count,
            drop_mode: DropMode::select(self.drop_mode),
            scenario: self.scenario,
            rows_per_table,
            blob_bytes,
            payload: self.payload,
            row_budget: u32::from(self.payload[0] % 50) + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_count_is_a_true_upper_bound() {
        let mut buf = [0u8; LIFECYCLE_PACKET_LEN];
        buf[0] = ceilings::MAX_TABLE_COUNT as u8;
        let (p, _) = LifecyclePacket::decode(&buf).unwrap();
        assert_eq!(p.validate().unwrap().table_count, ceilings::MAX_TABLE_COUNT);

        buf[0] = ceilings::MAX_TABLE_COUNT as u8 + 1;
        let (p, _) = LifecyclePacket::decode(&buf).unwrap();
        assert!(p.validate().is_none());
    }

    #[test]
    fn blob_bytes_reject_above_ceiling() {
        let mut buf = [0u8; LIFECYCLE_PACKET_LEN];
        buf[8..12].copy_from_slice(&(ceilings::MAX_BLOB_BYTES + 1).to_le_bytes());
        let (p, _) = LifecyclePacket::decode(&buf).unwrap();
        assert!(p.validate().is_none());
    }

    #[test]
    fn drop_mode_is_total() {
        for raw in 0..=u8::MAX {
            let _ = DropMode::select(raw);
        }
    }
}
