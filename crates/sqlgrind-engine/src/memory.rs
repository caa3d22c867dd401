//! Engine memory accounting.
//!
//! Thin safe wrappers over the engine's global memory API. The supervisor
//! samples [`engine_memory_used`] from inside the progress callback; the
//! memory-stress scenarios move the hard heap limit around through plan
//! ops.

/// Bytes of memory currently attributed to the engine across the process.
pub fn engine_memory_used() -> i64 {
    unsafe { rusqlite::ffi::sqlite3_memory_used() }
}

/// Install a hard heap limit, returning the previous limit. Zero removes
/// the limit. Allocations beyond the limit fail inside the engine (which
/// reports `SQLITE_NOMEM` on the statement) rather than growing the
/// process.
pub fn set_hard_heap_limit(bytes: i64) -> i64 {
    unsafe { rusqlite::ffi::sqlite3_hard_heap_limit64(bytes) }
}
