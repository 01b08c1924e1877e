// Difference via complementation of the right-hand acceptor.

use hashbrown::HashSet;

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, Label, MutableFst, NO_STATE};

use crate::compose::compose;

/// Complete `fst` over `labels` with a sink state and swap final and
/// non-final states. The input must be a deterministic epsilon-free
/// acceptor; that precondition is the caller's obligation and is not
/// validated here.
fn complement<W: Semiring>(fst: &mut MutableFst<W>, labels: &[Label]) {
    if fst.start() == NO_STATE {
        // Complement of the empty language: a sink accepting everything.
        fst.delete_states();
        let s = fst.add_state();
        fst.set_start(s);
    }

    let old_states = fst.num_states();
    let sink = fst.add_state();
    for &l in labels {
        fst.add_arc(sink, Arc::new(l, l, W::one(), sink));
    }

    // Route every missing (state, label) transition to the sink.
    for s in 0..old_states {
        let present: HashSet<Label> = fst.arcs(s).iter().map(|a| a.ilabel).collect();
        for &l in labels {
            if !present.contains(&l) {
                fst.add_arc(s, Arc::new(l, l, W::one(), sink));
            }
        }
    }

    // Swap finality; the sink was non-final and becomes accepting.
    for s in fst.state_ids() {
        if fst.is_final(s) {
            fst.set_final(s, W::zero());
        } else {
            fst.set_final(s, W::one());
        }
    }
}

/// The weighted relation of `a` restricted to strings `b` rejects:
/// difference(a, b) = a ∩ complement(b). `b` must be a deterministic
/// acceptor without epsilon transitions. The complement alphabet is the
/// union of the labels used by `a` and `b`.
pub fn difference<W: Semiring>(a: &MutableFst<W>, b: &MutableFst<W>) -> MutableFst<W> {
    let mut labels = a.input_labels();
    labels.extend(b.input_labels());
    labels.sort_unstable();
    labels.dedup();

    let mut comp = b.clone();
    complement(&mut comp, &labels);
    compose(a, &comp)
}
