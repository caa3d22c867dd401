//! Two-byte header for the multi-mode harness.
//!
//! The oldest harness in the suite predates the fixed-layout packets: one
//! mode byte, one flag byte, and everything after is free-form SQL (or, for
//! the template-driven modes, an op stream consumed a byte at a time).

use crate::flags::ConnFlags;
use crate::reader::PacketReader;

pub const ADVANCED_HEADER_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedHeader {
    pub mode: u8,
    pub config: u8,
}

impl AdvancedHeader {
    pub fn decode(data: &[u8]) -> Option<(Self, &[u8])> {
        let mut r = PacketReader::new(data);
        let header = Self {
            mode: r.u8()?,
            config: r.u8()?,
        };
        Some((header, r.tail()))
    }

    /// Low bits of the config byte select connection flags.
    pub fn conn_flags(&self) -> ConnFlags {
        ConnFlags::from_bits_truncate(u16::from(self.config & 0x3F))
    }

    /// Result-row budget: 1..=128, from the low seven bits.
    pub fn row_budget(&self) -> u32 {
        u32::from(self.config & 0x7F) + 1
    }
}
