// Single-source shortest path with deterministic tie-breaking.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use wfst_core::semiring::Semiring;
use wfst_core::{FstError, MutableFst, NO_STATE, StateId};

use crate::compose::backtrace;

struct QueueEntry<W> {
    weight: W,
    state: StateId,
}

impl<W: Semiring> PartialEq for QueueEntry<W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<W: Semiring> Eq for QueueEntry<W> {}

impl<W: Semiring> Ord for QueueEntry<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for the max-heap: cheapest weight first, then the lower
        // state id.
        other
            .weight
            .compare(self.weight)
            .then(other.state.cmp(&self.state))
    }
}

impl<W: Semiring> PartialOrd for QueueEntry<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Extract the best accepting path as a linear FST.
///
/// Dijkstra over state ids: the queue is keyed on accumulated weight with
/// ties broken by ascending state id; relaxation ties prefer the smaller
/// previous state, then the smaller arc index. After all reachable states
/// settle, the best final state by dist(s) ⊗ fw(s) (ties toward the lower
/// id) is backtraced.
///
/// Only `n = 1` is supported; `n = 0` returns the empty FST.
pub fn shortest_path<W: Semiring>(
    fst: &MutableFst<W>,
    n: u32,
) -> Result<MutableFst<W>, FstError> {
    if n == 0 {
        return Ok(MutableFst::new());
    }
    if n != 1 {
        return Err(FstError::UnsupportedNShortest(n));
    }
    let start = fst.start();
    if start == NO_STATE {
        return Err(FstError::NoAcceptingPath);
    }

    let n_states = fst.num_states() as usize;
    let mut dist: Vec<W> = vec![W::zero(); n_states];
    let mut reached = vec![false; n_states];
    let mut settled = vec![false; n_states];
    // (previous state, arc index within it) per reached non-start state.
    let mut back: Vec<Option<(StateId, usize)>> = vec![None; n_states];
    let mut heap: BinaryHeap<QueueEntry<W>> = BinaryHeap::new();

    dist[start as usize] = W::one();
    reached[start as usize] = true;
    heap.push(QueueEntry {
        weight: W::one(),
        state: start,
    });

    while let Some(QueueEntry { weight, state }) = heap.pop() {
        let u = state as usize;
        if settled[u] {
            continue;
        }
        if weight != dist[u] {
            continue;
        }
        settled[u] = true;

        for (idx, arc) in fst.arcs(state).iter().enumerate() {
            let v = arc.nextstate as usize;
            if settled[v] {
                continue;
            }
            let nd = dist[u].times(arc.weight);
            if nd.is_zero() {
                continue;
            }
            if !reached[v] {
                reached[v] = true;
                dist[v] = nd;
                back[v] = Some((state, idx));
                heap.push(QueueEntry {
                    weight: nd,
                    state: arc.nextstate,
                });
            } else {
                match nd.compare(dist[v]) {
                    Ordering::Less => {
                        dist[v] = nd;
                        back[v] = Some((state, idx));
                        heap.push(QueueEntry {
                            weight: nd,
                            state: arc.nextstate,
                        });
                    }
                    Ordering::Equal => {
                        // Equal distance: prefer the smaller previous state,
                        // then the smaller arc index.
                        if let Some(old) = back[v] {
                            if (state, idx) < old {
                                back[v] = Some((state, idx));
                            }
                        }
                    }
                    Ordering::Greater => {}
                }
            }
        }
    }

    // Best final state by total weight, ties toward the lower id.
    let mut best: Option<(StateId, W)> = None;
    for s in fst.state_ids() {
        if !settled[s as usize] {
            continue;
        }
        let fw = fst.final_weight(s);
        if fw.is_zero() {
            continue;
        }
        let total = dist[s as usize].times(fw);
        let better = match best {
            None => true,
            Some((_, w)) => total.compare(w) == Ordering::Less,
        };
        if better {
            best = Some((s, total));
        }
    }

    let (best_state, _) = best.ok_or(FstError::NoAcceptingPath)?;

    Ok(backtrace(best_state, fst.final_weight(best_state), |s| {
        back[s as usize].map(|(prev, idx)| {
            let arc = fst.arcs(prev)[idx];
            (prev, arc.ilabel, arc.olabel, arc.weight)
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::strings::print_string;
    use wfst_core::Arc;

    use wfst_core::semiring::TropicalWeight as T;

    #[test]
    fn picks_the_cheaper_branch() {
        // Two routes to the final state: direct (weight 5) and two-hop
        // (weight 1 + 1).
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T(5.0), s2));
        fst.add_arc(s0, Arc::new(2, 2, T(1.0), s1));
        fst.add_arc(s1, Arc::new(3, 3, T(1.0), s2));
        fst.set_final(s2, T::one());

        let path = shortest_path(&fst, 1).unwrap();
        let labels: Vec<u32> = path
            .state_ids()
            .flat_map(|s| path.arcs(s).iter().map(|a| a.ilabel).collect::<Vec<_>>())
            .collect();
        assert_eq!(labels, vec![2, 3]);
    }

    #[test]
    fn final_weight_participates_in_the_total() {
        // Reaching s1 is cheap but accepting there is expensive.
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T(1.0), s1));
        fst.add_arc(s0, Arc::new(2, 2, T(2.0), s2));
        fst.set_final(s1, T(10.0));
        fst.set_final(s2, T(0.5));

        let path = shortest_path(&fst, 1).unwrap();
        assert_eq!(path.arcs(path.start())[0].ilabel, 2);
        // The linear FST reproduces the accepting weight.
        let last = path.num_states() - 1;
        assert_eq!(path.final_weight(last), T(0.5));
    }

    #[test]
    fn equal_weights_break_toward_lower_ids() {
        // Two equal-weight a-paths; the one through the lower state id wins.
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        let s3 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T(1.0), s1));
        fst.add_arc(s0, Arc::new(2, 2, T(1.0), s2));
        fst.add_arc(s1, Arc::new(9, 9, T(1.0), s3));
        fst.add_arc(s2, Arc::new(8, 8, T(1.0), s3));
        fst.set_final(s3, T::one());

        let path = shortest_path(&fst, 1).unwrap();
        let labels: Vec<u32> = path
            .state_ids()
            .flat_map(|s| path.arcs(s).iter().map(|a| a.ilabel).collect::<Vec<_>>())
            .collect();
        // s3's back-pointer prefers prev state 1 over 2.
        assert_eq!(labels, vec![1, 9]);
    }

    #[test]
    fn accepts_at_start_state() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s0, T(2.5));
        // A worse loop exists but the empty path is best.
        fst.add_arc(s0, Arc::new(1, 1, T(9.0), s0));

        let path = shortest_path(&fst, 1).unwrap();
        assert_eq!(path.num_states(), 1);
        assert_eq!(path.final_weight(0), T(2.5));
        assert_eq!(print_string(&path).unwrap(), "");
    }

    #[test]
    fn unreachable_final_is_no_accepting_path() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, T::one());
        assert!(matches!(
            shortest_path(&fst, 1),
            Err(FstError::NoAcceptingPath)
        ));
    }

    #[test]
    fn n_zero_and_n_many() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s0, T::one());
        assert_eq!(shortest_path(&fst, 0).unwrap().num_states(), 0);
        assert!(matches!(
            shortest_path(&fst, 2),
            Err(FstError::UnsupportedNShortest(2))
        ));
    }
}
