#![no_main]

//! Structured lifecycle fuzzing.
//!
//! The raw-byte lifecycle target spends most of its entropy on packets the
//! validator rejects (quantity fields are rejected above their ceilings,
//! not wrapped). This target lets `arbitrary` build an in-range packet
//! directly, so every execution reaches a scenario body.

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use sqlgrind_harness::HarnessOptions;
use sqlgrind_packet::validate::ceilings;

fn options() -> &'static HarnessOptions {
    static OPTIONS: OnceLock<HarnessOptions> = OnceLock::new();
    OPTIONS.get_or_init(|| {
        sqlgrind_harness::init_diagnostics();
        HarnessOptions::from_env()
    })
}

/// An always-in-range lifecycle packet.
#[derive(Debug, Arbitrary)]
struct StructuredLifecycle {
    table_count: u8,
    drop_mode: u8,
    scenario: u16,
    rows_per_table: u32,
    blob_bytes: u32,
    payload: [u8; 20],
    tail: Vec<u8>,
}

impl StructuredLifecycle {
    fn to_packet_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.tail.len());
        buf.push(self.table_count % (ceilings::MAX_TABLE_COUNT as u8 + 1));
        buf.push(self.drop_mode);
        buf.extend_from_slice(&self.scenario.to_le_bytes());
        buf.extend_from_slice(&(self.rows_per_table % (ceilings::MAX_ROWS_PER_TABLE + 1)).to_le_bytes());
        buf.extend_from_slice(&(self.blob_bytes % (ceilings::MAX_BLOB_BYTES + 1)).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.tail);
        buf
    }
}

fuzz_target!(|input: StructuredLifecycle| {
    let bytes = input.to_packet_bytes();
    let _ = sqlgrind_harness::lifecycle::run(&bytes, options());
});
