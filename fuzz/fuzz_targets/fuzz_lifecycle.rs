#![no_main]

//! Fuzz table lifecycle: create a batch of tables, populate them through
//! bound parameters, drop a packet-chosen subset, verify the rest.

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;

use sqlgrind_harness::HarnessOptions;

fn options() -> &'static HarnessOptions {
    static OPTIONS: OnceLock<HarnessOptions> = OnceLock::new();
    OPTIONS.get_or_init(|| {
        sqlgrind_harness::init_diagnostics();
        HarnessOptions::from_env()
    })
}

fuzz_target!(|data: &[u8]| {
    let _ = sqlgrind_harness::lifecycle::run(data, options());
});
