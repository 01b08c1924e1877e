// Minimization by iterative signature refinement.

use hashbrown::HashMap;

use wfst_core::semiring::Semiring;
use wfst_core::{MutableFst, StateId};

/// Merge states with indistinguishable futures, in place.
///
/// The input must be deterministic and epsilon-free (run determinize
/// first). States start partitioned by a structural signature -- final
/// weight bits plus the (ilabel, olabel, weight bits) of every outgoing
/// arc -- and the partition is refined with arc-destination classes until
/// it stabilizes. The partition only ever refines, so termination is
/// guaranteed. The quotient keeps the first state of each class as the
/// representative and renumbers through the remap primitive.
pub fn minimize<W: Semiring>(fst: &mut MutableFst<W>) {
    let n = fst.num_states() as usize;
    if n == 0 {
        return;
    }

    fst.sort_all_arcs();

    // Initial partition by structural signature.
    let mut classes: Vec<u32> = vec![0; n];
    let mut initial: HashMap<Vec<u8>, u32> = HashMap::new();
    for s in 0..n {
        let mut sig = Vec::new();
        sig.extend_from_slice(&fst.final_weight(s as StateId).to_bits().to_le_bytes());
        for arc in fst.arcs(s as StateId) {
            sig.extend_from_slice(&arc.ilabel.to_le_bytes());
            sig.extend_from_slice(&arc.olabel.to_le_bytes());
            sig.extend_from_slice(&arc.weight.to_bits().to_le_bytes());
        }
        let next = initial.len() as u32;
        classes[s] = *initial.entry(sig).or_insert(next);
    }
    let mut num_classes = initial.len();
    drop(initial);

    // Refine with destination classes until the class count stabilizes.
    loop {
        let mut seen: HashMap<(u32, Vec<u32>), u32> = HashMap::new();
        let mut next_classes = vec![0u32; n];
        for s in 0..n {
            let dests: Vec<u32> = fst
                .arcs(s as StateId)
                .iter()
                .map(|a| classes[a.nextstate as usize])
                .collect();
            let next = seen.len() as u32;
            next_classes[s] = *seen.entry((classes[s], dests)).or_insert(next);
        }
        let refined = seen.len();
        classes = next_classes;
        if refined == num_classes {
            break;
        }
        num_classes = refined;
    }

    // Quotient: first state of each class is the representative; classes are
    // renumbered in order of first appearance.
    let mut class_to_new: Vec<StateId> = vec![u32::MAX; num_classes];
    let mut mapping: Vec<StateId> = Vec::with_capacity(n);
    let mut next_id: StateId = 0;
    for s in 0..n {
        let c = classes[s] as usize;
        if class_to_new[c] == u32::MAX {
            class_to_new[c] = next_id;
            next_id += 1;
        }
        mapping.push(class_to_new[c]);
    }

    fst.remap_states(&mapping);
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::Arc;

    use wfst_core::semiring::TropicalWeight as T;

    #[test]
    fn merges_equivalent_suffixes() {
        // 0 -a-> 1 -b-> 2(F)
        // 0 -c-> 3 -b-> 4(F)
        // States 1/3 and 2/4 are pairwise equivalent.
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        let s3 = fst.add_state();
        let s4 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T::one(), s1));
        fst.add_arc(s1, Arc::new(2, 2, T::one(), s2));
        fst.add_arc(s0, Arc::new(3, 3, T::one(), s3));
        fst.add_arc(s3, Arc::new(2, 2, T::one(), s4));
        fst.set_final(s2, T::one());
        fst.set_final(s4, T::one());

        minimize(&mut fst);
        assert_eq!(fst.num_states(), 3);
        assert_eq!(fst.start(), 0);
        // Both branches converge on the shared middle and final classes.
        assert_eq!(fst.num_arcs(0), 2);
    }

    #[test]
    fn distinguishes_by_final_weight_bits() {
        // Same shape, different final weights: not mergeable.
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T::one(), s1));
        fst.add_arc(s0, Arc::new(2, 2, T::one(), s2));
        fst.set_final(s1, T(1.0));
        fst.set_final(s2, T(2.0));

        minimize(&mut fst);
        assert_eq!(fst.num_states(), 3);
    }

    #[test]
    fn distinguishes_by_future_not_just_signature() {
        // 1 and 3 share arc labels and weights but their destinations
        // differ in finality; refinement must keep them apart.
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        let s3 = fst.add_state();
        let s4 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T::one(), s1));
        fst.add_arc(s0, Arc::new(2, 2, T::one(), s3));
        fst.add_arc(s1, Arc::new(5, 5, T::one(), s2));
        fst.add_arc(s3, Arc::new(5, 5, T::one(), s4));
        fst.set_final(s2, T::one());
        // s4 is not final, so s3's future differs from s1's.

        minimize(&mut fst);
        assert_eq!(fst.num_states(), 5);
    }

    #[test]
    fn idempotent_on_state_count() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T::one(), s1));
        fst.add_arc(s0, Arc::new(2, 2, T::one(), s2));
        fst.set_final(s1, T::one());
        fst.set_final(s2, T::one());

        minimize(&mut fst);
        let once = fst.num_states();
        minimize(&mut fst);
        assert_eq!(fst.num_states(), once);
    }

    #[test]
    fn empty_fst_is_untouched() {
        let mut fst: MutableFst<T> = MutableFst::new();
        minimize(&mut fst);
        assert_eq!(fst.num_states(), 0);
    }

    #[test]
    fn self_loops_merge_when_equivalent() {
        // Two states accepting (ab)* interchangeably collapse to one.
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(1, 1, T::one(), s1));
        fst.add_arc(s1, Arc::new(1, 1, T::one(), s0));
        fst.set_final(s0, T::one());
        fst.set_final(s1, T::one());

        minimize(&mut fst);
        assert_eq!(fst.num_states(), 1);
        assert_eq!(fst.num_arcs(0), 1);
        assert_eq!(fst.arcs(0)[0].nextstate, 0);
    }
}
