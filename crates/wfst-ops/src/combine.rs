// Rational operations: union, concatenation, closure, bounded repetition.
//
// The three in-place operations grow the recipient by state-offset splicing.
// On allocation failure mid-operation the recipient is left inconsistent;
// callers needing rollback must clone first.

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, EPSILON, FstError, MutableFst, NO_STATE, StateId};

/// Kleene closure variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureType {
    /// Zero or more repetitions.
    Star,
    /// One or more repetitions.
    Plus,
    /// Zero or one occurrence.
    Optional,
}

/// Append `src`'s states (arcs retargeted) onto `dst`; returns the offset
/// added to every `src` state id. Final weights are copied.
fn append<W: Semiring>(dst: &mut MutableFst<W>, src: &MutableFst<W>) -> StateId {
    let offset = dst.num_states();
    dst.add_states(src.num_states());
    for s in src.state_ids() {
        for arc in src.arcs(s) {
            dst.add_arc(
                offset + s,
                Arc::new(arc.ilabel, arc.olabel, arc.weight, offset + arc.nextstate),
            );
        }
        let fw = src.final_weight(s);
        if !fw.is_zero() {
            dst.set_final(offset + s, fw);
        }
    }
    offset
}

/// In-place union: `a` afterwards accepts what `a` or `b` accepted. A fresh
/// super-start is added with unit-weight epsilon arcs to both original
/// starts.
pub fn union<W: Semiring>(a: &mut MutableFst<W>, b: &MutableFst<W>) {
    let start_a = a.start();
    let offset = append(a, b);
    let start_b = b.start();

    let super_start = a.add_state();
    if start_a != NO_STATE {
        a.add_arc(super_start, Arc::new(EPSILON, EPSILON, W::one(), start_a));
    }
    if start_b != NO_STATE {
        a.add_arc(
            super_start,
            Arc::new(EPSILON, EPSILON, W::one(), offset + start_b),
        );
    }
    a.set_start(super_start);
}

/// In-place concatenation: `a` afterwards relates x·y iff `a` related x and
/// `b` related y. Every final state of `a` is spliced to `b`'s start with an
/// epsilon arc carrying its final weight, then cleared.
pub fn concat<W: Semiring>(a: &mut MutableFst<W>, b: &MutableFst<W>) {
    let old_states = a.num_states();
    let offset = append(a, b);
    for s in 0..old_states {
        let fw = a.final_weight(s);
        if fw.is_zero() {
            continue;
        }
        if b.start() != NO_STATE {
            a.add_arc(s, Arc::new(EPSILON, EPSILON, fw, offset + b.start()));
        }
        a.set_final(s, W::zero());
    }
}

/// In-place Kleene closure.
///
/// - `Star`: a new final super-start with an epsilon arc to the old start,
///   plus epsilon back-arcs from every old final to the old start, each
///   weighted by that state's final weight.
/// - `Plus`: the back-arcs only.
/// - `Optional`: the new final super-start only.
pub fn closure<W: Semiring>(fst: &mut MutableFst<W>, ct: ClosureType) {
    let old_start = fst.start();
    if old_start == NO_STATE {
        if matches!(ct, ClosureType::Star | ClosureType::Optional) {
            // Closure of the empty language still accepts the empty string.
            let s = fst.add_state();
            fst.set_final(s, W::one());
            fst.set_start(s);
        }
        return;
    }

    if matches!(ct, ClosureType::Star | ClosureType::Plus) {
        let finals: Vec<(StateId, W)> = fst
            .state_ids()
            .filter(|&s| fst.is_final(s))
            .map(|s| (s, fst.final_weight(s)))
            .collect();
        for (f, fw) in finals {
            fst.add_arc(f, Arc::new(EPSILON, EPSILON, fw, old_start));
        }
    }

    if matches!(ct, ClosureType::Star | ClosureType::Optional) {
        let super_start = fst.add_state();
        fst.set_final(super_start, W::one());
        fst.add_arc(super_start, Arc::new(EPSILON, EPSILON, W::one(), old_start));
        fst.set_start(super_start);
    }
}

/// Bounded repetition: `min` mandatory copies concatenated with
/// `max - min` optional copies. `max` must be at least `min` and nonzero.
pub fn repeat<W: Semiring>(
    fst: &MutableFst<W>,
    min: u32,
    max: u32,
) -> Result<MutableFst<W>, FstError> {
    if max < min || max == 0 {
        return Err(FstError::InvalidRange { min, max });
    }

    let mut optional = fst.clone();
    closure(&mut optional, ClosureType::Optional);

    let mut out;
    let extra;
    if min == 0 {
        out = optional.clone();
        extra = max - 1;
    } else {
        out = fst.clone();
        for _ in 1..min {
            concat(&mut out, fst);
        }
        extra = max - min;
    }
    for _ in 0..extra {
        concat(&mut out, &optional);
    }
    Ok(out)
}
