#![no_main]

//! Fuzz the page-allocation harness: freelist churn, memory-stress, and
//! corruption-probe scenarios over a 48-byte packet plus a SQL tail.

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
    let _ = sqlgrind_harness::btree_alloc::run(data, options());
});
