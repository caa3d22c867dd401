//! Packet layout for the configuration/PRAGMA harness.

use serde::Serialize;

use crate::reader::PacketReader;
use crate::validate::{ceilings, page_size, quantity, reduce};

pub const CONFIG_PACKET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPacket {
    pub page_size: u8,
    pub journal_mode: u8,
    pub scenario: u16,
    pub cache_kib: u32,
    pub probe_mask: u32,
    pub payload: [u8; 20],
}

/// Journal modes the engine accepts, in the order `PRAGMA journal_mode`
/// documents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub const COUNT: u8 = 6;

    pub fn select(raw: u8) -> Self {
        match reduce(raw, Self::COUNT) {
            0 => Self::Delete,
            1 => Self::Truncate,
            2 => Self::Persist,
            3 => Self::Memory,
            4 => Self::Wal,
            _ => Self::Off,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub page_size: u32,
    pub journal_mode: JournalMode,
    pub scenario: u16,
    /// Cache size in KiB, 1..=MAX_CACHE_KIB.
    pub cache_kib: u32,
    /// Seed selecting which pragma probes run; consumed modulo at use.
    pub probe_mask: u32,
    pub payload: [u8; 20],
    pub row_budget: u32,
}

impl ConfigPacket {
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let packet = Self {
            page_size: r.u8()?,
            journal_mode: r.u8()?,
            scenario: r.u16_le()?,
            cache_kib: r.u32_le()?,
            probe_mask: r.u32_le()?,
            payload: r.array()?,
        };
        Some((packet, r.tail()))
    }

    pub fn validate(&self) -> Option<ValidatedConfig> {
        let cache_kib = quantity(self.cache_kib, ceilings::MAX_CACHE_KIB)?.max(1);
        Some(ValidatedConfig {
            page_size: page_size(self.page_size),
            journal_mode: JournalMode::select(self.journal_mode),
            scenario: self.scenario,
            cache_kib,
            probe_mask: self.probe_mask,
            payload: self.payload,
            row_budget: u32::from(self.payload[0] % 50) + 1,
        })
    }
}
