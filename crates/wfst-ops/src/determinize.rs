// Weighted determinization by subset construction.

use std::collections::VecDeque;

use hashbrown::HashMap;

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, EPSILON, Label, MutableFst, NO_STATE, StateId};

/// A result state: a weighted set of input states, canonicalized by
/// ascending state id with the common weight factored out.
type Subset<W> = Vec<(StateId, W)>;

/// Canonical byte encoding of a subset: 4 bytes state id + 8 bytes weight
/// bits per element, little-endian. Equivalent subsets must hash equal, so
/// the encoding runs over the residual weights after factoring.
fn subset_key<W: Semiring>(subset: &Subset<W>) -> Vec<u8> {
    let mut key = Vec::with_capacity(subset.len() * 12);
    for &(s, w) in subset {
        key.extend_from_slice(&s.to_le_bytes());
        key.extend_from_slice(&w.to_bits().to_le_bytes());
    }
    key
}

/// Determinize an epsilon-free FST: the result has at most one arc per
/// input label out of every state. The input's epsilon-freeness is the
/// caller's obligation (the optimize pipeline guarantees it); label 0 is
/// skipped like any conventional subset construction.
///
/// Non-determinizable inputs (in the weighted sense) can expand without
/// bound; callers are expected to pre-optimize to tractable cases.
pub fn determinize<W: Semiring>(fst: &MutableFst<W>) -> MutableFst<W> {
    let mut out = MutableFst::new();
    if fst.start() == NO_STATE {
        return out;
    }

    let mut subsets: Vec<Subset<W>> = Vec::new();
    let mut ids: HashMap<Vec<u8>, StateId> = HashMap::new();
    let mut queue: VecDeque<StateId> = VecDeque::new();

    let initial: Subset<W> = vec![(fst.start(), W::one())];
    ids.insert(subset_key(&initial), out.add_state());
    subsets.push(initial);
    out.set_start(0);
    queue.push_back(0);

    while let Some(id) = queue.pop_front() {
        let subset = subsets[id as usize].clone();

        // Distinct non-epsilon input labels leaving this subset, ascending.
        let mut labels: Vec<Label> = subset
            .iter()
            .flat_map(|&(s, _)| fst.arcs(s).iter().map(|a| a.ilabel))
            .filter(|&l| l != EPSILON)
            .collect();
        labels.sort_unstable();
        labels.dedup();

        for label in labels {
            // Gather successors, merging duplicate targets with ⊕.
            let mut gathered: HashMap<StateId, W> = HashMap::new();
            let mut order: Vec<StateId> = Vec::new();
            let mut olabel: Option<Label> = None;
            for &(s, r) in &subset {
                for arc in fst.arcs(s) {
                    if arc.ilabel != label {
                        continue;
                    }
                    if olabel.is_none() {
                        // Output label of the first matching arc in the
                        // first subset element that has one.
                        olabel = Some(arc.olabel);
                    }
                    let w = r.times(arc.weight);
                    gathered
                        .entry(arc.nextstate)
                        .and_modify(|acc| *acc = acc.plus(w))
                        .or_insert_with(|| {
                            order.push(arc.nextstate);
                            w
                        });
                }
            }

            let mut next: Subset<W> = order
                .into_iter()
                .map(|s| (s, gathered[&s]))
                .collect();
            next.sort_unstable_by_key(|&(s, _)| s);

            // Factor the common weight out as the arc weight.
            let mut common = W::zero();
            for &(_, w) in &next {
                common = common.plus(w);
            }
            for (_, w) in &mut next {
                *w = w.divide(common);
            }

            let key = subset_key(&next);
            let dest = match ids.get(&key) {
                Some(&d) => d,
                None => {
                    let d = out.add_state();
                    ids.insert(key, d);
                    subsets.push(next);
                    queue.push_back(d);
                    d
                }
            };
            out.add_arc(id, Arc::new(label, olabel.unwrap_or(label), common, dest));
        }

        // ⊕-fold the residual-weighted final weights of the members.
        let mut final_weight = W::zero();
        for &(s, r) in &subsets[id as usize] {
            let fw = fst.final_weight(s);
            if !fw.is_zero() {
                final_weight = final_weight.plus(r.times(fw));
            }
        }
        if !final_weight.is_zero() {
            out.set_final(id, final_weight);
        }
    }

    out
}
