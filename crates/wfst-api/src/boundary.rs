// The opaque-handle call surface: lifecycle, builders, operations, string
// utilities, and global teardown, all over two process-wide handle tables.
//
// Concurrency model: table bookkeeping is serialized by the table mutexes;
// heavy computation runs on snapshots (mutable FSTs) or pinned objects
// (frozen FSTs) outside any lock. In-place mutators use the
// optimistic-commit protocol, so two racing mutations of one handle resolve
// to one winner and one `Status::InvalidArg`.

use std::path::Path;
use std::process::Command;

use wfst_core::frozen::{FrozenFst, OwnedFrozenFst};
use wfst_core::semiring::{Semiring, TropicalWeight};
use wfst_core::strings::{compile_bytes, print_output_string, print_string};
use wfst_core::text::{parse_text, read_text_file};
use wfst_core::{Arc, FstError, Label, MutableFst, NO_STATE, StateId};

use wfst_ops as ops;
pub use wfst_ops::{ClosureType, ProjectType};

use crate::table::HandleTable;

/// The boundary is monomorphized over the tropical semiring; weights cross
/// it as raw `f64`. Log-typed binaries are refused at load time.
type W = TropicalWeight;

/// Sentinel returned instead of a handle when an operation fails.
pub const INVALID_HANDLE: u32 = u32::MAX;

/// Coarse status codes for in-place and side-effecting calls. Detailed
/// error variants stay internal to the library crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Oom,
    InvalidArg,
    InvalidState,
    IoError,
}

impl From<&FstError> for Status {
    fn from(e: &FstError) -> Status {
        match e {
            FstError::OutOfMemory => Status::Oom,
            FstError::InvalidState { .. } => Status::InvalidState,
            FstError::Io(_)
            | FstError::ExternalToolFailed(_)
            | FstError::InvalidFormat(_)
            | FstError::InvalidMagic
            | FstError::UnsupportedVersion(_)
            | FstError::WeightTypeMismatch { .. }
            | FstError::UnexpectedEof { .. } => Status::IoError,
            _ => Status::InvalidArg,
        }
    }
}

/// Arc record as it crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcRecord {
    pub ilabel: u32,
    pub olabel: u32,
    pub weight: f64,
    pub nextstate: u32,
}

static MUTABLE: HandleTable<MutableFst<W>> = HandleTable::new();
static FROZEN: HandleTable<OwnedFrozenFst<W>> = HandleTable::new();

fn insert_mutable(fst: MutableFst<W>) -> u32 {
    MUTABLE.insert(fst)
}

fn insert_frozen(fst: OwnedFrozenFst<W>) -> u32 {
    FROZEN.insert(fst)
}

// ── Mutable FST lifecycle ───────────────────────────────────────

pub fn mutable_new() -> u32 {
    insert_mutable(MutableFst::new())
}

pub fn mutable_clone(h: u32) -> u32 {
    match MUTABLE.with(h, |fst| fst.clone()) {
        Ok(copy) => insert_mutable(copy),
        Err(_) => INVALID_HANDLE,
    }
}

pub fn mutable_free(h: u32) -> Status {
    if MUTABLE.remove(h) {
        Status::Ok
    } else {
        Status::InvalidArg
    }
}

// ── Mutable FST builders ────────────────────────────────────────

pub fn mutable_add_state(h: u32) -> u32 {
    MUTABLE.with_mut(h, |fst| fst.add_state()).unwrap_or(NO_STATE)
}

pub fn mutable_add_states(h: u32, n: u32) -> u32 {
    MUTABLE
        .with_mut(h, |fst| fst.add_states(n))
        .unwrap_or(NO_STATE)
}

fn checked_state(fst: &MutableFst<W>, s: StateId) -> Result<(), FstError> {
    if s < fst.num_states() {
        Ok(())
    } else {
        Err(FstError::InvalidState {
            state: s,
            num_states: fst.num_states(),
        })
    }
}

fn status_of(result: Result<Result<(), FstError>, FstError>) -> Status {
    match result {
        Ok(Ok(())) => Status::Ok,
        Ok(Err(e)) => Status::from(&e),
        Err(e) => Status::from(&e),
    }
}

pub fn mutable_set_start(h: u32, s: StateId) -> Status {
    status_of(MUTABLE.with_mut(h, |fst| {
        checked_state(fst, s)?;
        fst.set_start(s);
        Ok(())
    }))
}

pub fn mutable_set_final(h: u32, s: StateId, weight: f64) -> Status {
    status_of(MUTABLE.with_mut(h, |fst| {
        checked_state(fst, s)?;
        fst.set_final(s, W::from_value(weight));
        Ok(())
    }))
}

pub fn mutable_add_arc(
    h: u32,
    src: StateId,
    ilabel: Label,
    olabel: Label,
    weight: f64,
    nextstate: StateId,
) -> Status {
    status_of(MUTABLE.with_mut(h, |fst| {
        checked_state(fst, src)?;
        checked_state(fst, nextstate)?;
        fst.add_arc(src, Arc::new(ilabel, olabel, W::from_value(weight), nextstate));
        Ok(())
    }))
}

// ── Mutable FST queries ─────────────────────────────────────────

pub fn mutable_start(h: u32) -> u32 {
    MUTABLE.with(h, |fst| fst.start()).unwrap_or(NO_STATE)
}

pub fn mutable_num_states(h: u32) -> u32 {
    MUTABLE.with(h, |fst| fst.num_states()).unwrap_or(0)
}

pub fn mutable_num_arcs(h: u32, s: StateId) -> u32 {
    MUTABLE
        .with(h, |fst| {
            if s < fst.num_states() { fst.num_arcs(s) } else { 0 }
        })
        .unwrap_or(0)
}

pub fn mutable_final_weight(h: u32, s: StateId) -> f64 {
    MUTABLE
        .with(h, |fst| {
            if s < fst.num_states() {
                fst.final_weight(s).value()
            } else {
                f64::INFINITY
            }
        })
        .unwrap_or(f64::INFINITY)
}

pub fn mutable_get_arcs(h: u32, s: StateId) -> Vec<ArcRecord> {
    MUTABLE
        .with(h, |fst| {
            if s >= fst.num_states() {
                return Vec::new();
            }
            fst.arcs(s)
                .iter()
                .map(|a| ArcRecord {
                    ilabel: a.ilabel,
                    olabel: a.olabel,
                    weight: a.weight.value(),
                    nextstate: a.nextstate,
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── Freeze and frozen lifecycle ─────────────────────────────────

pub fn freeze(h: u32) -> u32 {
    match MUTABLE.with(h, FrozenFst::freeze) {
        Ok(Ok(frozen)) => insert_frozen(frozen),
        _ => INVALID_HANDLE,
    }
}

pub fn frozen_free(h: u32) -> Status {
    if FROZEN.remove(h) {
        Status::Ok
    } else {
        Status::InvalidArg
    }
}

pub fn frozen_start(h: u32) -> u32 {
    FROZEN.with(h, |fst| fst.start()).unwrap_or(NO_STATE)
}

pub fn frozen_num_states(h: u32) -> u32 {
    FROZEN.with(h, |fst| fst.num_states()).unwrap_or(0)
}

pub fn frozen_num_arcs(h: u32, s: StateId) -> u32 {
    FROZEN
        .with(h, |fst| {
            if s < fst.num_states() { fst.num_arcs(s) } else { 0 }
        })
        .unwrap_or(0)
}

pub fn frozen_final_weight(h: u32, s: StateId) -> f64 {
    FROZEN
        .with(h, |fst| {
            if s < fst.num_states() {
                fst.final_weight(s).value()
            } else {
                f64::INFINITY
            }
        })
        .unwrap_or(f64::INFINITY)
}

pub fn frozen_get_arcs(h: u32, s: StateId) -> Vec<ArcRecord> {
    FROZEN
        .with(h, |fst| {
            if s >= fst.num_states() {
                return Vec::new();
            }
            fst.arcs(s)
                .map(|a| ArcRecord {
                    ilabel: a.ilabel,
                    olabel: a.olabel,
                    weight: a.weight.value(),
                    nextstate: a.nextstate,
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── I/O ─────────────────────────────────────────────────────────

/// Load a native binary container into a frozen handle.
pub fn load(path: impl AsRef<Path>) -> u32 {
    match FrozenFst::read_file(path) {
        Ok(frozen) => insert_frozen(frozen),
        Err(_) => INVALID_HANDLE,
    }
}

/// Read an AT&T text file into a mutable handle.
pub fn load_text(path: impl AsRef<Path>) -> u32 {
    match read_text_file::<W>(path) {
        Ok(fst) => insert_mutable(fst),
        Err(_) => INVALID_HANDLE,
    }
}

/// Import through an external AT&T-printing tool: runs `tool path`, parses
/// its stdout as AT&T text.
pub fn load_via_tool(tool: &str, path: &str) -> u32 {
    match load_via_tool_inner(tool, path) {
        Ok(fst) => insert_mutable(fst),
        Err(_) => INVALID_HANDLE,
    }
}

fn load_via_tool_inner(tool: &str, path: &str) -> Result<MutableFst<W>, FstError> {
    let output = Command::new(tool)
        .arg(path)
        .output()
        .map_err(|e| FstError::ExternalToolFailed(format!("{tool}: {e}")))?;
    if !output.status.success() {
        return Err(FstError::ExternalToolFailed(format!(
            "{tool} exited with {}",
            output.status
        )));
    }
    let text = String::from_utf8(output.stdout)
        .map_err(|_| FstError::ExternalToolFailed(format!("{tool}: non-UTF-8 output")))?;
    parse_text(&text)
}

/// Save a frozen FST to a native binary container file.
pub fn save(h: u32, path: impl AsRef<Path>) -> Status {
    match FROZEN.with(h, |fst| fst.write_file(path)) {
        Ok(Ok(())) => Status::Ok,
        Ok(Err(e)) => Status::from(&e),
        Err(e) => Status::from(&e),
    }
}

// ── Pure operations (new handles) ───────────────────────────────

fn snapshot_pair(a: u32, b: u32) -> Result<(MutableFst<W>, MutableFst<W>), FstError> {
    let (fst_a, _) = MUTABLE.snapshot(a)?;
    let (fst_b, _) = MUTABLE.snapshot(b)?;
    Ok((fst_a, fst_b))
}

pub fn compose(a: u32, b: u32) -> u32 {
    match snapshot_pair(a, b) {
        Ok((fst_a, fst_b)) => insert_mutable(ops::compose(&fst_a, &fst_b)),
        Err(_) => INVALID_HANDLE,
    }
}

/// Composition against a pinned frozen right-hand side; the frozen body is
/// read outside the table lock, concurrently with other pinned readers.
pub fn compose_frozen(a: u32, b: u32) -> u32 {
    let Ok((fst_a, _)) = MUTABLE.snapshot(a) else {
        return INVALID_HANDLE;
    };
    let Ok(pin) = FROZEN.pin(b) else {
        return INVALID_HANDLE;
    };
    insert_mutable(ops::compose_frozen(&fst_a, &pin))
}

pub fn compose_frozen_shortest_path(a: u32, b: u32, n: u32) -> u32 {
    let Ok((fst_a, _)) = MUTABLE.snapshot(a) else {
        return INVALID_HANDLE;
    };
    let Ok(pin) = FROZEN.pin(b) else {
        return INVALID_HANDLE;
    };
    match ops::compose_frozen_shortest_path(&fst_a, &pin, n) {
        Ok(path) => insert_mutable(path),
        Err(_) => INVALID_HANDLE,
    }
}

fn pure_op(h: u32, op: impl FnOnce(&MutableFst<W>) -> Result<MutableFst<W>, FstError>) -> u32 {
    let Ok((fst, _)) = MUTABLE.snapshot(h) else {
        return INVALID_HANDLE;
    };
    match op(&fst) {
        Ok(result) => insert_mutable(result),
        Err(_) => INVALID_HANDLE,
    }
}

pub fn determinize(h: u32) -> u32 {
    pure_op(h, |fst| Ok(ops::determinize(fst)))
}

pub fn rm_epsilon(h: u32) -> u32 {
    pure_op(h, |fst| Ok(ops::rm_epsilon(fst)))
}

pub fn shortest_path(h: u32, n: u32) -> u32 {
    pure_op(h, |fst| ops::shortest_path(fst, n))
}

pub fn optimize(h: u32) -> u32 {
    pure_op(h, ops::optimize)
}

pub fn repeat(h: u32, min: u32, max: u32) -> u32 {
    pure_op(h, |fst| ops::repeat(fst, min, max))
}

pub fn reverse(h: u32) -> u32 {
    pure_op(h, |fst| Ok(ops::reverse(fst)))
}

pub fn difference(a: u32, b: u32) -> u32 {
    match snapshot_pair(a, b) {
        Ok((fst_a, fst_b)) => insert_mutable(ops::difference(&fst_a, &fst_b)),
        Err(_) => INVALID_HANDLE,
    }
}

pub fn cdrewrite(tau: u32, lambda: u32, rho: u32, sigma: &[Label]) -> u32 {
    let parts = (|| -> Result<_, FstError> {
        let (t, _) = MUTABLE.snapshot(tau)?;
        let (l, _) = MUTABLE.snapshot(lambda)?;
        let (r, _) = MUTABLE.snapshot(rho)?;
        Ok((t, l, r))
    })();
    let Ok((t, l, r)) = parts else {
        return INVALID_HANDLE;
    };
    match ops::cdrewrite(&t, &l, &r, sigma) {
        Ok(rule) => insert_mutable(rule),
        Err(_) => INVALID_HANDLE,
    }
}

pub fn replace(root: u32, substitutions: &[(Label, u32)]) -> u32 {
    let bodies = (|| -> Result<Vec<(Label, MutableFst<W>)>, FstError> {
        substitutions
            .iter()
            .map(|&(label, h)| Ok((label, MUTABLE.snapshot(h)?.0)))
            .collect()
    })();
    let Ok(bodies) = bodies else {
        return INVALID_HANDLE;
    };
    let Ok((root_fst, _)) = MUTABLE.snapshot(root) else {
        return INVALID_HANDLE;
    };
    let refs: Vec<(Label, &MutableFst<W>)> = bodies.iter().map(|(l, f)| (*l, f)).collect();
    match ops::replace(&root_fst, &refs) {
        Ok(result) => insert_mutable(result),
        Err(_) => INVALID_HANDLE,
    }
}

// ── In-place operations (optimistic commit) ─────────────────────

/// The optimistic-commit protocol: snapshot under lock, compute outside,
/// re-check the generation on reacquisition and swap. Interference from a
/// concurrent mutation surfaces as `Status::InvalidArg`.
fn commit_op(h: u32, op: impl FnOnce(&mut MutableFst<W>) -> Result<(), FstError>) -> Status {
    let (mut snapshot, generation) = match MUTABLE.snapshot(h) {
        Ok(pair) => pair,
        Err(e) => return Status::from(&e),
    };
    if let Err(e) = op(&mut snapshot) {
        return Status::from(&e);
    }
    match MUTABLE.commit(h, generation, snapshot) {
        Ok(()) => Status::Ok,
        Err(e) => Status::from(&e),
    }
}

pub fn minimize(h: u32) -> Status {
    commit_op(h, |fst| {
        ops::minimize(fst);
        Ok(())
    })
}

pub fn union(a: u32, b: u32) -> Status {
    let Ok((other, _)) = MUTABLE.snapshot(b) else {
        return Status::InvalidArg;
    };
    commit_op(a, |fst| {
        ops::union(fst, &other);
        Ok(())
    })
}

pub fn concat(a: u32, b: u32) -> Status {
    let Ok((other, _)) = MUTABLE.snapshot(b) else {
        return Status::InvalidArg;
    };
    commit_op(a, |fst| {
        ops::concat(fst, &other);
        Ok(())
    })
}

pub fn closure(h: u32, ct: ClosureType) -> Status {
    commit_op(h, |fst| {
        ops::closure(fst, ct);
        Ok(())
    })
}

pub fn invert(h: u32) -> Status {
    commit_op(h, |fst| {
        ops::invert(fst);
        Ok(())
    })
}

pub fn project(h: u32, pt: ProjectType) -> Status {
    commit_op(h, |fst| {
        ops::project(fst, pt);
        Ok(())
    })
}

pub fn connect(h: u32) -> Status {
    commit_op(h, |fst| {
        ops::connect(fst);
        Ok(())
    })
}

// ── String utilities ────────────────────────────────────────────

/// Compile a byte string into a linear acceptor handle.
pub fn compile(text: &str) -> u32 {
    insert_mutable(compile_bytes(text.as_bytes()))
}

/// Read the byte string on a linear FST's input tape.
pub fn print(h: u32) -> Result<String, Status> {
    match MUTABLE.with(h, |fst| print_string(fst)) {
        Ok(Ok(s)) => Ok(s),
        Ok(Err(e)) => Err(Status::from(&e)),
        Err(e) => Err(Status::from(&e)),
    }
}

/// Read the byte string on a linear FST's output tape.
pub fn print_output(h: u32) -> Result<String, Status> {
    match MUTABLE.with(h, |fst| print_output_string(fst)) {
        Ok(Ok(s)) => Ok(s),
        Ok(Err(e)) => Err(Status::from(&e)),
        Err(e) => Err(Status::from(&e)),
    }
}

// ── Teardown ────────────────────────────────────────────────────

/// Drop every live object in both tables. The caller must guarantee
/// quiescence: no boundary calls in flight and no outstanding pins.
pub fn teardown() {
    MUTABLE.clear();
    FROZEN.clear();
}
