// Epsilon removal via per-state weighted closures.

use std::collections::VecDeque;

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, MutableFst, NO_STATE, StateId};

/// Remove epsilon transitions (arcs with both labels epsilon).
///
/// The result keeps the same state set and start. For each state `s`, the
/// epsilon closure of `s` is computed by breadth-first search; each closure
/// member carries the ⊗-accumulated weight of its discovery path. The final
/// weight of `s` becomes fw(s) ⊕ Σ over closure members t of w(s→t) ⊗ fw(t),
/// and every non-epsilon arc leaving a closure member is re-rooted at `s`
/// with its weight prefixed by the closure path weight.
pub fn rm_epsilon<W: Semiring>(fst: &MutableFst<W>) -> MutableFst<W> {
    let n = fst.num_states();
    let mut out = MutableFst::new();
    out.add_states(n);
    if fst.start() != NO_STATE {
        out.set_start(fst.start());
    }

    let snapshot = fst.generation();
    let mut visited = vec![false; n as usize];

    for s in fst.state_ids() {
        // First-visit BFS closure: (member, path weight), excluding s itself.
        visited.fill(false);
        visited[s as usize] = true;
        let mut closure: Vec<(StateId, W)> = Vec::new();
        let mut queue: VecDeque<(StateId, W)> = VecDeque::new();
        queue.push_back((s, W::one()));
        while let Some((t, wt)) = queue.pop_front() {
            for arc in fst.arcs(t) {
                if arc.is_epsilon() && !visited[arc.nextstate as usize] {
                    visited[arc.nextstate as usize] = true;
                    let wu = wt.times(arc.weight);
                    closure.push((arc.nextstate, wu));
                    queue.push_back((arc.nextstate, wu));
                }
            }
        }

        let mut final_weight = fst.final_weight(s);
        for &(t, wt) in &closure {
            final_weight = final_weight.plus(wt.times(fst.final_weight(t)));
        }
        if !final_weight.is_zero() {
            out.set_final(s, final_weight);
        }

        for (t, wt) in std::iter::once((s, W::one())).chain(closure.into_iter()) {
            for arc in fst.arcs(t) {
                if !arc.is_epsilon() {
                    out.add_arc(
                        s,
                        Arc::new(arc.ilabel, arc.olabel, wt.times(arc.weight), arc.nextstate),
                    );
                }
            }
        }
    }

    fst.assert_generation(snapshot);
    out
}
