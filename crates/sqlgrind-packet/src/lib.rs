//! Fixed-layout packet decoding for the sqlgrind fuzz harnesses.
//!
//! Every harness interprets a prefix of the raw fuzz input as a packet: an
//! ordered record of little-endian integers, flag words, and fixed-capacity
//! byte arrays. Decoding is strictly bounds-checked and fails closed — a
//! buffer shorter than the packet layout yields `None`, which callers treat
//! as "no test performed" rather than an error.
//!
//! Decoding and validation are separate steps with separate types:
//!
//! 1. `decode` produces the raw packet plus the unconsumed tail of the
//!    input buffer (most harnesses feed the tail to the engine as SQL).
//! 2. `validate` applies the range policy from [`validate`] and produces a
//!    `Validated*` value whose fields are safe to use as loop bounds,
//!    allocation sizes, and name suffixes.
//!
//! Scenario bytes are carried through raw; reducing them onto a concrete
//! scenario enum is the harness's job.

pub mod advanced;
pub mod alloc;
pub mod autovacuum;
pub mod config;
pub mod cursor;
pub mod flags;
pub mod lifecycle;
pub mod reader;
pub mod trans;
pub mod validate;

pub use advanced::AdvancedHeader;
pub use alloc::{AllocPacket, ValidatedAlloc};
pub use autovacuum::{AutoVacuumPacket, ValidatedAutoVacuum};
pub use config::{ConfigPacket, ValidatedConfig};
pub use cursor::{CursorPacket, ValidatedCursor};
pub use flags::ConnFlags;
pub use lifecycle::{LifecyclePacket, ValidatedLifecycle};
pub use reader::PacketReader;
pub use trans::{TransPacket, ValidatedTrans};
