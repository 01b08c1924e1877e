//! Boundary layer over the WFST engine.
//!
//! Raw pointers never cross an interop line: callers hold opaque 32-bit
//! handles into per-kind [`table::HandleTable`]s. Slots carry generation
//! counters and pin counts, which detect double-free and use-after-free,
//! defer destruction under concurrent readers, and drive the
//! optimistic-commit protocol used by the in-place mutating operations.
//!
//! [`boundary`] is the call surface itself: lifecycle, builders, operations
//! and string utilities, all keyed by handles and serialized through the
//! table mutexes. Heavy computation always runs on snapshots or pinned
//! objects outside any lock.

pub mod boundary;
pub mod table;

pub use boundary::{INVALID_HANDLE, Status};
pub use table::HandleTable;
