#![no_main]

//! Fuzz the multi-mode harness. Two header bytes pick the mode and the
//! budget; the rest of the input is raw SQL or a template op stream,
//! including the dual-connection interleave mode.

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
    let _ = sqlgrind_harness::advanced::run(data, options());
});
