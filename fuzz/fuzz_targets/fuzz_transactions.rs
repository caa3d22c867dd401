#![no_main]

//! Fuzz transaction and savepoint state transitions. The packet's byte
//! stream drives depth-tracked BEGIN/COMMIT/ROLLBACK/SAVEPOINT sequences;
//! whatever is left open exercises the teardown rollback.

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
    let _ = sqlgrind_harness::transactions::run(data, options());
});
