// Transduction reversal.

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, EPSILON, MutableFst, NO_STATE};

/// Reverse the transduction: the result relates reverse(x) to reverse(y)
/// with reversed path weights.
///
/// A super-start is appended; it reaches every original final state `f`
/// through an epsilon arc weighted reverse(fw(f)). Every arc is flipped in
/// place (labels kept, weight reversed), and the original start becomes the
/// sole final state with weight 1̄.
pub fn reverse<W: Semiring>(fst: &MutableFst<W>) -> MutableFst<W> {
    let mut out = MutableFst::new();
    let n = fst.num_states();
    out.add_states(n);
    let super_start = out.add_state();
    out.set_start(super_start);

    for s in fst.state_ids() {
        for arc in fst.arcs(s) {
            out.add_arc(
                arc.nextstate,
                Arc::new(arc.ilabel, arc.olabel, arc.weight.reverse(), s),
            );
        }
        let fw = fst.final_weight(s);
        if !fw.is_zero() {
            out.add_arc(super_start, Arc::new(EPSILON, EPSILON, fw.reverse(), s));
        }
    }

    if fst.start() != NO_STATE {
        out.set_final(fst.start(), W::one());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::strings::{compile_bytes, print_string};

    use crate::rm_epsilon::rm_epsilon;
    use crate::shortest_path::shortest_path;

    use wfst_core::semiring::TropicalWeight as T;

    #[test]
    fn reverses_a_linear_chain() {
        let fst: MutableFst<T> = compile_bytes(b"abc");
        let rev = reverse(&fst);
        // Extract the single path of the reversed machine.
        let path = shortest_path(&rm_epsilon(&rev), 1).unwrap();
        assert_eq!(print_string(&path).unwrap(), "cba");
    }

    #[test]
    fn original_start_becomes_the_sole_final() {
        let fst: MutableFst<T> = compile_bytes(b"ab");
        let rev = reverse(&fst);
        let finals: Vec<u32> = rev.state_ids().filter(|&s| rev.is_final(s)).collect();
        assert_eq!(finals, vec![fst.start()]);
        assert_eq!(rev.final_weight(fst.start()), T::one());
    }

    #[test]
    fn final_weight_moves_onto_the_entry_arc() {
        let mut fst: MutableFst<T> = compile_bytes(b"a");
        fst.set_final(1, T(4.0));
        let rev = reverse(&fst);
        let entry = rev.arcs(rev.start())[0];
        assert!(entry.is_epsilon());
        assert_eq!(entry.weight, T(4.0));
        assert_eq!(entry.nextstate, 1);
    }

    #[test]
    fn double_reverse_preserves_the_language() {
        let fst: MutableFst<T> = compile_bytes(b"xyz");
        let twice = reverse(&reverse(&fst));
        let path = shortest_path(&rm_epsilon(&twice), 1).unwrap();
        assert_eq!(print_string(&path).unwrap(), "xyz");
    }

    #[test]
    fn reverse_of_empty_is_unaccepting() {
        let fst: MutableFst<T> = MutableFst::new();
        let rev = reverse(&fst);
        assert_eq!(rev.num_states(), 1);
        assert!(!rev.is_final(rev.start()));
    }
}
