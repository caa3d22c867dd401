//! Packet layout for the B-tree page-allocation harness.
//!
//! Layout (48 bytes):
//!
//! | Offset | Width | Field           | Policy                      |
//! |--------|-------|-----------------|-----------------------------|
//! | 0      | 1     | scenario        | categorical (harness enum)  |
//! | 1      | 1     | insert_order    | categorical (mod 3)         |
//! | 2      | 2     | conn flags      | flag word, truncated        |
//! | 4      | 4     | nearby_pgno     | quantity, reject > ceiling  |
//! | 8      | 4     | corruption_mask | seed, passthrough           |
//! | 12     | 4     | heap_pressure   | quantity, reject > ceiling  |
//! | 16     | 32    | payload         | seed bytes, passthrough     |
//!
//! Bytes past offset 48 are the SQL tail.

use serde::Serialize;

use crate::flags::ConnFlags;
use crate::reader::PacketReader;
use crate::validate::{ceilings, quantity, reduce};

pub const ALLOC_PACKET_LEN: usize = 48;

/// Raw decoded packet; see [`AllocPacket::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocPacket {
    pub scenario: u8,
    pub insert_order: u8,
    pub flags: u16,
    pub nearby_pgno: u32,
    pub corruption_mask: u32,
    pub heap_pressure: u32,
    pub payload: [u8; 32],
}

/// How the fill loops order their rowids, biasing which pages the engine
/// allocates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsertOrder {
    /// Ascending rowids, append-mostly page allocation.
    Sequential,
    /// Descending rowids, forces interior-page splits.
    Reverse,
    /// Rowids scattered by a payload-derived stride.
    Scattered,
}

impl InsertOrder {
    pub const COUNT: u8 = 3;

    pub fn select(raw: u8) -> Self {
        match reduce(raw, Self::COUNT) {
            0 => Self::Sequential,
            1 => Self::Reverse,
            _ => Self::Scattered,
        }
    }
}

/// Range-checked view consumed by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAlloc {
    pub scenario: u8,
    pub insert_order: InsertOrder,
    pub conn_flags: ConnFlags,
    pub nearby_pgno: u32,
    pub corruption_mask: u32,
    pub heap_pressure: u32,
    pub payload: [u8; 32],
    /// Result-row budget for the supervisor, 1..=50.
    pub row_budget: u32,
}

impl AllocPacket {
    /// Decode a packet from the front of `data`, returning the SQL tail.
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let packet = Self {
            scenario: r.u8()?,
            insert_order: r.u8()?,
            flags: r.u16_le()?,
            nearby_pgno: r.u32_le()?,
            corruption_mask: r.u32_le()?,
            heap_pressure: r.u32_le()?,
            payload: r.array()?,
        };
        Some((packet, r.tail()))
    }

    /// Apply the range policy. `None` means the input is skipped.
    pub fn validate(&self) -> Option<ValidatedAlloc> {
        let nearby_pgno = quantity(self.nearby_pgno, ceilings::MAX_PGNO_HINT)?;
        let heap_pressure = quantity(self.heap_pressure, ceilings::MAX_HEAP_PRESSURE)?;
        Some(ValidatedAlloc {
            scenario: self.scenario,
            insert_order: InsertOrder::select(self.insert_order),
            conn_flags: ConnFlags::from_bits_truncate(self.flags),
            nearby_pgno,
            corruption_mask: self.corruption_mask,
            heap_pressure,
            payload: self.payload,
            row_budget: u32::from(self.payload[0] % 50) + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf_with(scenario: u8, pgno: u32, pressure: u32) -> Vec<u8> {
        let mut buf = vec![0u8; ALLOC_PACKET_LEN];
        buf[0] = scenario;
        buf[4..8].copy_from_slice(&pgno.to_le_bytes());
        buf[12..16].copy_from_slice(&pressure.to_le_bytes());
        buf
    }

    #[test]
    fn decode_requires_full_packet() {
        assert!(AllocPacket::decode(&[0u8; ALLOC_PACKET_LEN - 1]).is_none());
        let (packet, tail) = AllocPacket::decode(&[0u8; ALLOC_PACKET_LEN]).unwrap();
        assert_eq!(packet.scenario, 0);
        assert!(tail.is_empty());
    }

    #[test]
    fn tail_is_returned_verbatim() {
        let mut buf = buf_with(1, 7, 0);
        buf.extend_from_slice(b"SELECT 1;");
        let (_, tail) = AllocPacket::decode(&buf).unwrap();
        assert_eq!(tail, b"SELECT 1;");
    }

    #[test]
    fn oversized_quantities_reject() {
        let (packet, _) =
            AllocPacket::decode(&buf_with(0, ceilings::MAX_PGNO_HINT + 1, 0)).unwrap();
        assert!(packet.validate().is_none());

        let (packet, _) =
            AllocPacket::decode(&buf_with(0, 0, ceilings::MAX_HEAP_PRESSURE + 1)).unwrap();
        assert!(packet.validate().is_none());
    }

    #[test]
    fn row_budget_is_bounded() {
        let mut buf = buf_with(0, 0, 0);
        buf[16] = 0xFF; // payload[0]
        let (packet, _) = AllocPacket::decode(&buf).unwrap();
        let valid = packet.validate().unwrap();
        assert!((1..=50).contains(&valid.row_budget));
    }
}
