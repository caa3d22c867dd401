//! Packet layout for the cursor-navigation harness.

use serde::Serialize;

use crate::reader::PacketReader;
use crate::validate::{quantity, reduce};

pub const CURSOR_PACKET_LEN: usize = 32;

/// Rows seeded into the navigation table. Small on purpose: navigation
/// coverage comes from key shape, not volume.
pub const MAX_SEED_ROWS: u32 = 128;

/// Width of the probe window in `BETWEEN` range scans.
pub const MAX_KEY_SPAN: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPacket {
    pub access_mode: u8,
    pub key_type: u8,
    pub scenario: u16,
    pub seed_rows: u32,
    pub key_span: u32,
    pub key_data: [u8; 20],
}

/// How the scenario touches the table it navigates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessMode {
    /// Pure read traversal.
    Read,
    /// Traversal interleaved with updates.
    Write,
    /// Traversal interleaved with deletes.
    Delete,
}

impl AccessMode {
    pub const COUNT: u8 = 3;

    pub fn select(raw: u8) -> Self {
        match reduce(raw, Self::COUNT) {
            0 => Self::Read,
            1 => Self::Write,
            _ => Self::Delete,
        }
    }
}

/// Type of the probe key bound into navigation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyType {
    Integer,
    Text,
    Blob,
    Null,
}

impl KeyType {
    pub const COUNT: u8 = 4;

    pub fn select(raw: u8) -> Self {
        match reduce(raw, Self::COUNT) {
            0 => Self::Integer,
            1 => Self::Text,
            2 => Self::Blob,
            _ => Self::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCursor {
    pub access_mode: AccessMode,
    pub key_type: KeyType,
    pub scenario: u16,
    pub seed_rows: u32,
    pub key_span: u32,
    pub key_data: [u8; 20],
    pub row_budget: u32,
}

impl CursorPacket {
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let packet = Self {
            access_mode: r.u8()?,
            key_type: r.u8()?,
            scenario: r.u16_le()?,
            seed_rows: r.u32_le()?,
            key_span: r.u32_le()?,
            key_data: r.array()?,
        };
        Some((packet, r.tail()))
    }

    pub fn validate(&self) -> Option<ValidatedCursor> {
        let seed_rows = quantity(self.seed_rows, MAX_SEED_ROWS)?.max(1);
        let key_span = quantity(self.key_span, MAX_KEY_SPAN)?.max(1);
        Some(ValidatedCursor {
            access_mode: AccessMode::select(self.access_mode),
            key_type: KeyType::select(self.key_type),
            scenario: self.scenario,
            seed_rows,
            key_span,
            key_data: self.key_data,
            row_budget: u32::from(self.key_data[0] % 50) + 1,
        })
    }
}
