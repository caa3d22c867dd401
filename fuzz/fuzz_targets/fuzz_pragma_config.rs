#![no_main]

//! Fuzz the configuration surface: page geometry, journal modes, cache
//! sizing, and the introspection battery (including the pragmas the
//! authorizer vetoes).

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
    let _ = sqlgrind_harness::pragma_config::run(data, options());
});
