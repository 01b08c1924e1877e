// Trimming: keep only states that are both accessible and coaccessible.

use std::collections::VecDeque;

use wfst_core::semiring::Semiring;
use wfst_core::{MutableFst, NO_STATE, StateId};

/// Remove states that are not reachable from the start or cannot reach a
/// final state, renumbering the survivors contiguously (id order preserved).
/// An FST with no start, or whose start is dead, becomes empty.
pub fn connect<W: Semiring>(fst: &mut MutableFst<W>) {
    if fst.start() == NO_STATE {
        fst.delete_states();
        return;
    }
    let n = fst.num_states() as usize;

    // Forward BFS from the start.
    let mut accessible = vec![false; n];
    let mut queue: VecDeque<StateId> = VecDeque::new();
    accessible[fst.start() as usize] = true;
    queue.push_back(fst.start());
    while let Some(s) = queue.pop_front() {
        for arc in fst.arcs(s) {
            if !accessible[arc.nextstate as usize] {
                accessible[arc.nextstate as usize] = true;
                queue.push_back(arc.nextstate);
            }
        }
    }

    // Backward BFS from the final states over reversed arcs.
    let mut preds: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for s in fst.state_ids() {
        for arc in fst.arcs(s) {
            preds[arc.nextstate as usize].push(s);
        }
    }
    let mut coaccessible = vec![false; n];
    for s in fst.state_ids() {
        if fst.is_final(s) {
            coaccessible[s as usize] = true;
            queue.push_back(s);
        }
    }
    while let Some(s) = queue.pop_front() {
        for &p in &preds[s as usize] {
            if !coaccessible[p as usize] {
                coaccessible[p as usize] = true;
                queue.push_back(p);
            }
        }
    }

    let mut mapping: Vec<StateId> = Vec::with_capacity(n);
    let mut next: StateId = 0;
    for s in 0..n {
        if accessible[s] && coaccessible[s] {
            mapping.push(next);
            next += 1;
        } else {
            mapping.push(NO_STATE);
        }
    }

    if mapping[fst.start() as usize] == NO_STATE {
        fst.delete_states();
        return;
    }
    fst.remap_states(&mapping);
}
