//! Packet layout for the transaction-state harness.
//!
//! The test_data bytes double as the op stream: the planner walks them one
//! byte at a time, each byte selecting the next transaction operation, the
//! same way the original harness consumed its input cursor.

use crate::flags::ConnFlags;
use crate::reader::PacketReader;

pub const TRANS_PACKET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransPacket {
    pub trans_type: u8,
    pub flags: u8,
    pub scenario: u16,
    pub schema_version: u32,
    pub corruption_mask: u32,
    pub test_data: [u8; 20],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTrans {
    /// Whether the opening transaction takes a write lock immediately.
    pub write_txn: bool,
    pub conn_flags: ConnFlags,
    pub scenario: u16,
    /// Seed for savepoint name suffixes; consumed modulo at use.
    pub name_seed: u32,
    pub corruption_mask: u32,
    pub test_data: [u8; 20],
    pub row_budget: u32,
}

impl TransPacket {
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let packet = Self {
            trans_type: r.u8()?,
            flags: r.u8()?,
            scenario: r.u16_le()?,
            schema_version: r.u32_le()?,
            corruption_mask: r.u32_le()?,
            test_data: r.array()?,
        };
        Some((packet, r.tail()))
    }

    /// No quantity fields here; validation normalizes and never rejects.
    pub fn validate(&self) -> ValidatedTrans {
        ValidatedTrans {
            write_txn: self.trans_type % 2 == 1,
            conn_flags: ConnFlags::from_bits_truncate(u16::from(self.flags)),
            scenario: self.scenario,
            name_seed: self.schema_version,
            corruption_mask: self.corruption_mask,
            test_data: self.test_data,
            row_budget: u32::from(self.test_data[0] % 50) + 1,
        }
    }
}
