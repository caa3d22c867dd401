//! Packet layout for the auto-vacuum commit harness.
//!
//! Layout (44 bytes): vacuum mode, page-size selector, a 16-bit scenario
//! word, two quantity fields (fill rows, vacuum pages), two seed words, and
//! 24 bytes of seed data. Bytes past offset 44 are the SQL tail.

use serde::Serialize;

use crate::reader::PacketReader;
use crate::validate::{ceilings, page_size, quantity, reduce};

pub const AUTOVACUUM_PACKET_LEN: usize = 44;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoVacuumPacket {
    pub vacuum_mode: u8,
    pub page_size: u8,
    pub scenario: u16,
    pub db_pages: u32,
    pub free_pages: u32,
    pub corruption_seed: u32,
    pub custom_vac: u32,
    pub test_data: [u8; 24],
}

/// The three auto-vacuum modes the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VacuumMode {
    None,
    Full,
    Incremental,
}

impl VacuumMode {
    pub const COUNT: u8 = 3;

    pub fn select(raw: u8) -> Self {
        match reduce(raw, Self::COUNT) {
            0 => Self::None,
            1 => Self::Full,
            _ => Self::Incremental,
        }
    }

    /// The keyword used in `PRAGMA auto_vacuum = <mode>`.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Full => "FULL",
            Self::Incremental => "INCREMENTAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAutoVacuum {
    pub vacuum_mode: VacuumMode,
    pub page_size: u32,
    pub scenario: u16,
    /// Rows inserted by the fill phase, 1..=MAX_FILL_ROWS.
    pub fill_rows: u32,
    /// Pages handed to `PRAGMA incremental_vacuum(N)`, 1..=MAX_VACUUM_PAGES.
    pub vacuum_pages: u32,
    pub corruption_seed: u32,
    pub custom_vac: u32,
    pub test_data: [u8; 24],
    pub row_budget: u32,
}

impl AutoVacuumPacket {
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let packet = Self {
            vacuum_mode: r.u8()?,
            page_size: r.u8()?,
            scenario: r.u16_le()?,
            db_pages: r.u32_le()?,
            free_pages: r.u32_le()?,
            corruption_seed: r.u32_le()?,
            custom_vac: r.u32_le()?,
            test_data: r.array()?,
        };
        Some((packet, r.tail()))
    }

    pub fn validate(&self) -> Option<ValidatedAutoVacuum> {
        let fill_rows = quantity(self.db_pages, ceilings::MAX_FILL_ROWS)?.max(1);
        let vacuum_pages = quantity(self.free_pages, ceilings::MAX_VACUUM_PAGES)?.max(1);
        Some(ValidatedAutoVacuum {
            vacuum_mode: VacuumMode::select(self.vacuum_mode),
            page_size: page_size(self.page_size),
            scenario: self.scenario,
            fill_rows,
            vacuum_pages,
            corruption_seed: self.corruption_seed,
            custom_vac: self.custom_vac,
            test_data: self.test_data,
            row_budget: u32::from(self.test_data[0] % 50) + 1,
        })
    }
}
