// Tape projection and inversion, in place, O(total arcs).

use wfst_core::semiring::Semiring;
use wfst_core::MutableFst;

/// Which tape a projection keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Input,
    Output,
}

/// Restrict the transduction to one tape, making the FST an acceptor: the
/// kept tape's label is copied over the other on every arc.
pub fn project<W: Semiring>(fst: &mut MutableFst<W>, pt: ProjectType) {
    fst.map_arcs(|arc| match pt {
        ProjectType::Input => arc.olabel = arc.ilabel,
        ProjectType::Output => arc.ilabel = arc.olabel,
    });
}

/// Swap input and output labels on every arc.
pub fn invert<W: Semiring>(fst: &mut MutableFst<W>) {
    fst.map_arcs(|arc| std::mem::swap(&mut arc.ilabel, &mut arc.olabel));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::strings::compile_pair;
    use wfst_core::Arc;

    use wfst_core::semiring::TropicalWeight as T;

    #[test]
    fn project_input_copies_ilabel() {
        let mut fst: MutableFst<T> = compile_pair(b"ab", b"xy");
        project(&mut fst, ProjectType::Input);
        assert!(fst.is_acceptor());
        assert_eq!(fst.arcs(0)[0].olabel, fst.arcs(0)[0].ilabel);
        assert_eq!(wfst_core::strings::print_string(&fst).unwrap(), "ab");
    }

    #[test]
    fn project_output_copies_olabel() {
        let mut fst: MutableFst<T> = compile_pair(b"ab", b"xy");
        project(&mut fst, ProjectType::Output);
        assert!(fst.is_acceptor());
        assert_eq!(wfst_core::strings::print_string(&fst).unwrap(), "xy");
    }

    #[test]
    fn invert_swaps_tapes() {
        let mut fst: MutableFst<T> = compile_pair(b"ab", b"xy");
        invert(&mut fst);
        assert_eq!(wfst_core::strings::print_string(&fst).unwrap(), "xy");
        assert_eq!(wfst_core::strings::print_output_string(&fst).unwrap(), "ab");
    }

    #[test]
    fn invert_is_an_involution_on_arcs() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(3, 9, T(1.5), s1));
        fst.set_final(s1, T::one());
        let before: Vec<Arc<T>> = fst.arcs(s0).to_vec();

        invert(&mut fst);
        invert(&mut fst);
        assert_eq!(fst.arcs(s0), &before[..]);
    }
}
