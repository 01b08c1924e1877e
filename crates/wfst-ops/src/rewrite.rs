// Obligatory context-dependent rewrite: compile τ / λ _ ρ over Σ* into a
// single rule transducer, applied by composition and best-path extraction.

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, FstError, Label, MutableFst, NO_STATE};

use crate::combine::{ClosureType, closure, concat, union};
use crate::compose::compose;
use crate::project::{ProjectType, project};
use crate::rm_epsilon::rm_epsilon;
use crate::shortest_path::shortest_path;

/// Identity pass-through penalty per symbol. Obligatoriness holds because a
/// unit-weight τ (total 1̄) always beats len(τ) × P of identity steps.
const IDENTITY_PENALTY: f64 = 1.0;

fn is_unit_weight<W: Semiring>(fst: &MutableFst<W>) -> bool {
    fst.state_ids().all(|s| {
        fst.arcs(s).iter().all(|a| a.weight == W::one())
            && (fst.final_weight(s).is_zero() || fst.final_weight(s) == W::one())
    })
}

/// A side context is trivial when it can only spell the empty string.
fn is_trivial<W: Semiring>(fst: &MutableFst<W>) -> bool {
    fst.start() == NO_STATE || fst.total_arcs() == 0
}

/// Acceptor for any single symbol of `sigma`, each arc carrying the
/// identity penalty.
fn sigma_one<W: Semiring>(sigma: &[Label]) -> MutableFst<W> {
    let mut fst = MutableFst::new();
    let s0 = fst.add_state();
    let s1 = fst.add_state();
    fst.set_start(s0);
    fst.set_final(s1, W::one());
    for &l in sigma {
        fst.add_arc(s0, Arc::new(l, l, W::from_value(IDENTITY_PENALTY), s1));
    }
    fst
}

/// Compile the obligatory left-to-right rewrite of `tau` in the context
/// `lambda _ rho` over the alphabet `sigma`.
///
/// All three components must carry unit weights (every arc and final weight
/// equal to 1̄); anything else is an [`FstError::UnsupportedWeightedRewrite`].
/// The rule is (λ·τ·ρ | σ_one)* with epsilon transitions removed, where
/// σ_one passes any single alphabet symbol through at a fixed penalty.
/// Matching through τ is penalty-free, so the best path rewrites wherever
/// the context matches and copies everywhere else.
pub fn cdrewrite<W: Semiring>(
    tau: &MutableFst<W>,
    lambda: &MutableFst<W>,
    rho: &MutableFst<W>,
    sigma: &[Label],
) -> Result<MutableFst<W>, FstError> {
    if !is_unit_weight(tau) || !is_unit_weight(lambda) || !is_unit_weight(rho) {
        return Err(FstError::UnsupportedWeightedRewrite);
    }

    // context = λ·τ·ρ, dropping sides that only spell epsilon.
    let mut context = if is_trivial(lambda) {
        tau.clone()
    } else {
        let mut c = lambda.clone();
        concat(&mut c, tau);
        c
    };
    if !is_trivial(rho) {
        concat(&mut context, rho);
    }

    let mut rule = context;
    union(&mut rule, &sigma_one(sigma));
    closure(&mut rule, ClosureType::Star);
    Ok(rm_epsilon(&rule))
}

/// Apply a compiled rule to an input acceptor: compose, project onto the
/// output tape, and keep the single best path.
pub fn rewrite<W: Semiring>(
    input: &MutableFst<W>,
    rule: &MutableFst<W>,
) -> Result<MutableFst<W>, FstError> {
    let mut lattice = compose(input, rule);
    project(&mut lattice, ProjectType::Output);
    shortest_path(&lattice, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::strings::{byte_label, compile_bytes, compile_pair, print_string};

    use wfst_core::semiring::TropicalWeight as T;

    fn lowercase_sigma() -> Vec<Label> {
        (b'a'..=b'z').map(byte_label).collect()
    }

    fn apply(rule: &MutableFst<T>, input: &str) -> String {
        let acceptor: MutableFst<T> = compile_bytes(input.as_bytes());
        let out = rewrite(&acceptor, rule).unwrap();
        print_string(&out).unwrap()
    }

    #[test]
    fn rewrites_inside_the_context() {
        // a -> b / c _ d
        let tau: MutableFst<T> = compile_pair(b"a", b"b");
        let lambda: MutableFst<T> = compile_bytes(b"c");
        let rho: MutableFst<T> = compile_bytes(b"d");
        let rule = cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()).unwrap();

        assert_eq!(apply(&rule, "cad"), "cbd");
    }

    #[test]
    fn leaves_non_matching_context_alone() {
        let tau: MutableFst<T> = compile_pair(b"a", b"b");
        let lambda: MutableFst<T> = compile_bytes(b"c");
        let rho: MutableFst<T> = compile_bytes(b"d");
        let rule = cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()).unwrap();

        // Right context missing.
        assert_eq!(apply(&rule, "cab"), "cab");
        // Left context missing.
        assert_eq!(apply(&rule, "xad"), "xad");
    }

    #[test]
    fn multi_symbol_tau() {
        // ab -> xy / c _ d
        let tau: MutableFst<T> = compile_pair(b"ab", b"xy");
        let lambda: MutableFst<T> = compile_bytes(b"c");
        let rho: MutableFst<T> = compile_bytes(b"d");
        let rule = cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()).unwrap();

        assert_eq!(apply(&rule, "cabd"), "cxyd");
    }

    #[test]
    fn branching_left_context() {
        // a -> b / (c|x) _ d
        let tau: MutableFst<T> = compile_pair(b"a", b"b");
        let mut lambda: MutableFst<T> = compile_bytes(b"c");
        let alt: MutableFst<T> = compile_bytes(b"x");
        union(&mut lambda, &alt);
        let rho: MutableFst<T> = compile_bytes(b"d");
        let rule = cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()).unwrap();

        assert_eq!(apply(&rule, "cad"), "cbd");
        assert_eq!(apply(&rule, "xad"), "xbd");
        assert_eq!(apply(&rule, "yad"), "yad");
    }

    #[test]
    fn rewrites_repeatedly_left_to_right() {
        let tau: MutableFst<T> = compile_pair(b"a", b"b");
        let lambda: MutableFst<T> = compile_bytes(b"c");
        let rho: MutableFst<T> = compile_bytes(b"d");
        let rule = cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()).unwrap();

        assert_eq!(apply(&rule, "cadcad"), "cbdcbd");
    }

    #[test]
    fn empty_contexts_rewrite_everywhere() {
        // a -> b with no context constraint.
        let tau: MutableFst<T> = compile_pair(b"a", b"b");
        let empty: MutableFst<T> = compile_bytes(b"");
        let rule = cdrewrite(&tau, &empty, &empty, &lowercase_sigma()).unwrap();

        assert_eq!(apply(&rule, "aca"), "bcb");
    }

    #[test]
    fn weighted_tau_is_rejected() {
        let mut tau: MutableFst<T> = compile_pair(b"a", b"b");
        // Taint one arc weight.
        let arc = tau.arcs(0)[0];
        tau.delete_arcs(0);
        tau.add_arc(0, Arc::new(arc.ilabel, arc.olabel, T(0.5), arc.nextstate));

        let lambda: MutableFst<T> = compile_bytes(b"c");
        let rho: MutableFst<T> = compile_bytes(b"d");
        assert!(matches!(
            cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()),
            Err(FstError::UnsupportedWeightedRewrite)
        ));
    }

    #[test]
    fn weighted_final_in_context_is_rejected() {
        let tau: MutableFst<T> = compile_pair(b"a", b"b");
        let mut lambda: MutableFst<T> = compile_bytes(b"c");
        lambda.set_final(1, T(2.0));
        let rho: MutableFst<T> = compile_bytes(b"d");
        assert!(matches!(
            cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()),
            Err(FstError::UnsupportedWeightedRewrite)
        ));
    }
}
