//! Field range policy shared by every packet.
//!
//! Two policies, applied by field semantics, consistently across all
//! harnesses:
//!
//! - **Quantity** fields (row counts, table counts, blob sizes, vacuum page
//!   counts, heap-pressure values) are *rejected* when they exceed the
//!   ceilings below. A rejected packet means the whole input is skipped;
//!   this keeps huge-allocation near-duplicates out of the corpus.
//! - **Categorical** fields (scenario selectors, mode bytes, ladder
//!   selectors) are *normalized* by modulo reduction so that every raw
//!   value maps onto a defined branch and no entropy is wasted on discards.
//!
//! Seed and mask fields (`corruption_mask`, payload bytes) are neither: they
//! pass through unchanged and are always consumed modulo some small range at
//! the point of use.

/// Ceilings for quantity fields. A packet whose quantity field exceeds its
/// ceiling is skipped outright.
pub mod ceilings {
    /// Rows inserted by a single fill loop.
    pub const MAX_FILL_ROWS: u32 = 256;

    /// Tables created by the lifecycle harness.
    pub const MAX_TABLE_COUNT: u32 = 32;

    /// Rows inserted per table by the lifecycle harness.
    pub const MAX_ROWS_PER_TABLE: u32 = 64;

    /// Bytes handed to `randomblob()` / `zeroblob()`.
    pub const MAX_BLOB_BYTES: u32 = 4096;

    /// Pages passed to `PRAGMA incremental_vacuum(N)` and used as delete
    /// moduli.
    pub const MAX_VACUUM_PAGES: u32 = 64;

    /// Page-number hints (name suffixes, nearby-page arguments).
    pub const MAX_PGNO_HINT: u32 = 100_000;

    /// Heap-limit reduction applied by the memory-stress scenarios, in
    /// bytes. Chosen below the supervisor's memory ceiling so the stress
    /// path exercises allocation failure, not the abort guard.
    pub const MAX_HEAP_PRESSURE: u32 = 8_000_000;

    /// Cache size in KiB for the config harness.
    pub const MAX_CACHE_KIB: u32 = 8192;

    /// Rows requested from `PRAGMA integrity_check(N)`.
    pub const MAX_INTEGRITY_ROWS: u32 = 100;
}

/// Accept a quantity field, rejecting values above `ceiling`.
pub fn quantity(raw: u32, ceiling: u32) -> Option<u32> {
    (raw <= ceiling).then_some(raw)
}

/// Reduce a categorical byte onto `0..count`. Total and deterministic for
/// every input byte; `count` must be nonzero.
pub fn reduce(raw: u8, count: u8) -> u8 {
    debug_assert!(count > 0);
    raw % count
}

/// The page-size ladder used by the autovacuum and config harnesses.
///
/// Indexing is categorical: any selector byte maps onto one of the seven
/// sizes the engine accepts.
pub const PAGE_SIZES: [u32; 7] = [512, 1024, 2048, 4096, 8192, 16384, 32768];

pub fn page_size(selector: u8) -> u32 {
    PAGE_SIZES[usize::from(selector) % PAGE_SIZES.len()]
}
