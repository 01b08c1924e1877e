//! Weighted finite-state transducer data model.
//!
//! This crate provides the two-phase FST representation used by the rest of
//! the workspace: a mutable builder ([`MutableFst`]) and a frozen contiguous
//! snapshot ([`FrozenFst`]) suitable for concurrent runtime queries, together
//! with the weight semirings, string helpers, and the text/binary container
//! formats.
//!
//! # Architecture
//!
//! - [`semiring`] -- weight algebra (tropical and log) with storage bit images
//! - [`arc`] -- arc and label primitives, sentinel constants
//! - [`mutable`] -- the builder structure with structural mutation and a
//!   generation counter for invalidation diagnostics
//! - [`format`] -- binary container header and record layouts
//! - [`frozen`] -- the immutable snapshot: freeze, binary search, zero-copy load
//! - [`strings`] -- byte-string compilation and character-class acceptors
//! - [`text`] -- the AT&T tabular text format

pub mod arc;
pub mod format;
pub mod frozen;
pub mod mutable;
pub mod semiring;
pub mod strings;
pub mod text;

pub use arc::{Arc, EPSILON, Label, NO_STATE, StateId};
pub use frozen::FrozenFst;
pub use mutable::MutableFst;
pub use semiring::{LogWeight, Semiring, TropicalWeight, WeightKind};

/// Error type shared by the FST data model and the operations built on it.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("state id {state} out of range (num_states = {num_states})")]
    InvalidState { state: StateId, num_states: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("external tool failed: {0}")]
    ExternalToolFailed(String),
    #[error("invalid container format: {0}")]
    InvalidFormat(String),
    #[error("invalid magic number in container header")]
    InvalidMagic,
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u16),
    #[error("weight type mismatch: expected {expected:?}, got {actual:?}")]
    WeightTypeMismatch {
        expected: WeightKind,
        actual: WeightKind,
    },
    #[error("unexpected end of input: expected at least {expected} bytes, got {actual}")]
    UnexpectedEof { expected: usize, actual: usize },
    #[error("invalid repeat range {min}..{max}")]
    InvalidRange { min: u32, max: u32 },
    #[error("cyclic dependency between replacement labels")]
    CyclicDependency,
    #[error("label space exhausted while encoding label pairs")]
    LabelOverflow,
    #[error("rewrite rule components must carry unit weights")]
    UnsupportedWeightedRewrite,
    #[error("only single shortest-path extraction is supported (requested n = {0})")]
    UnsupportedNShortest(u32),
    #[error("no accepting path")]
    NoAcceptingPath,
}
