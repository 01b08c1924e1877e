//! Algebraic operations over weighted finite-state transducers.
//!
//! Every operation here consumes and produces the data model of
//! [`wfst_core`]: pure operations take `&MutableFst` and return a fresh FST;
//! in-place operations mutate their first argument and document their
//! failure behavior. Scratch structures are per-call locals, discarded on
//! return; results own their storage.
//!
//! # Modules
//!
//! - [`compose`] -- composition with the epsilon-sequencing filter, the
//!   frozen right-hand variant, and the fused compose-shortest-path
//! - [`rm_epsilon`] -- epsilon removal via weighted closures
//! - [`determinize`] -- weighted subset construction
//! - [`minimize`] -- signature-refinement minimization
//! - [`shortest_path`] -- single-source best path with deterministic ties
//! - [`combine`] -- union, concatenation, closure, bounded repetition
//! - [`project`] -- tape projection and inversion
//! - [`connect`] -- accessibility/coaccessibility trimming
//! - [`encode`] -- label-pair encoding for transducer determinization
//! - [`optimize`] -- the canonical optimization pipeline
//! - [`difference`] -- difference via complementation
//! - [`replace`] -- recursive label substitution
//! - [`reverse`] -- transduction reversal
//! - [`rewrite`] -- obligatory context-dependent rewrite compilation

pub mod combine;
pub mod compose;
pub mod connect;
pub mod determinize;
pub mod difference;
pub mod encode;
pub mod minimize;
pub mod optimize;
pub mod project;
pub mod replace;
pub mod reverse;
pub mod rewrite;
pub mod rm_epsilon;
pub mod shortest_path;

pub use combine::{ClosureType, closure, concat, repeat, union};
pub use compose::{compose, compose_frozen, compose_frozen_shortest_path};
pub use connect::connect;
pub use determinize::determinize;
pub use difference::difference;
pub use minimize::minimize;
pub use optimize::optimize;
pub use project::{ProjectType, invert, project};
pub use replace::replace;
pub use reverse::reverse;
pub use rewrite::{cdrewrite, rewrite};
pub use rm_epsilon::rm_epsilon;
pub use shortest_path::shortest_path;
