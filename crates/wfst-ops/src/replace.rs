// Recursive label substitution with cycle detection.

use hashbrown::HashMap;

use wfst_core::semiring::Semiring;
use wfst_core::{Arc, EPSILON, FstError, Label, MutableFst, NO_STATE};

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Depth-first cycle check and postorder over the sub-FST dependency graph.
fn topo_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, FstError> {
    let n = deps.len();
    let mut colors = vec![Color::White; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);

    fn visit(
        i: usize,
        deps: &[Vec<usize>],
        colors: &mut [Color],
        order: &mut Vec<usize>,
    ) -> Result<(), FstError> {
        colors[i] = Color::Gray;
        for &j in &deps[i] {
            match colors[j] {
                Color::Gray => return Err(FstError::CyclicDependency),
                Color::White => visit(j, deps, colors, order)?,
                Color::Black => {}
            }
        }
        colors[i] = Color::Black;
        order.push(i);
        Ok(())
    }

    for i in 0..n {
        if colors[i] == Color::White {
            visit(i, deps, &mut colors, &mut order)?;
        }
    }
    Ok(order)
}

/// Inline every arc whose input label has an expansion: the arc is removed,
/// the sub-FST's states are appended, an epsilon arc enters its start, and
/// each of its final states exits to the original destination weighted by
/// (sub final weight) ⊗ (original arc weight).
fn expand<W: Semiring>(fst: &mut MutableFst<W>, bodies: &HashMap<Label, MutableFst<W>>) {
    let original_states = fst.num_states();
    for s in 0..original_states {
        // Split off the arcs that get replaced.
        let mut kept: Vec<Arc<W>> = Vec::new();
        let mut replaced: Vec<Arc<W>> = Vec::new();
        for arc in fst.arcs(s) {
            if bodies.contains_key(&arc.ilabel) {
                replaced.push(*arc);
            } else {
                kept.push(*arc);
            }
        }
        if replaced.is_empty() {
            continue;
        }

        fst.delete_arcs(s);
        for arc in kept {
            fst.add_arc(s, arc);
        }
        for arc in replaced {
            let body = &bodies[&arc.ilabel];
            if body.start() == NO_STATE {
                // Empty replacement body: the arc simply disappears.
                continue;
            }
            let offset = fst.num_states();
            fst.add_states(body.num_states());
            for bs in body.state_ids() {
                for barc in body.arcs(bs) {
                    fst.add_arc(
                        offset + bs,
                        Arc::new(
                            barc.ilabel,
                            barc.olabel,
                            barc.weight,
                            offset + barc.nextstate,
                        ),
                    );
                }
            }
            fst.add_arc(
                s,
                Arc::new(EPSILON, EPSILON, W::one(), offset + body.start()),
            );
            for bs in body.state_ids() {
                let fw = body.final_weight(bs);
                if !fw.is_zero() {
                    fst.add_arc(
                        offset + bs,
                        Arc::new(EPSILON, EPSILON, fw.times(arc.weight), arc.nextstate),
                    );
                }
            }
        }
    }
}

/// Replace every arc of `root` whose input label matches a substitution by
/// an inline expansion of the corresponding sub-FST. Sub-FSTs may reference
/// each other's labels; they are resolved leaves-first along the dependency
/// order. A cyclic reference chain is a [`FstError::CyclicDependency`].
pub fn replace<W: Semiring>(
    root: &MutableFst<W>,
    substitutions: &[(Label, &MutableFst<W>)],
) -> Result<MutableFst<W>, FstError> {
    let index: HashMap<Label, usize> = substitutions
        .iter()
        .enumerate()
        .map(|(i, &(l, _))| (l, i))
        .collect();

    // Sub-FST i depends on j iff some arc of i carries j's label.
    let deps: Vec<Vec<usize>> = substitutions
        .iter()
        .map(|&(_, sub)| {
            let mut found: Vec<usize> = sub
                .state_ids()
                .flat_map(|s| sub.arcs(s).iter().map(|a| a.ilabel))
                .filter_map(|l| index.get(&l).copied())
                .collect();
            found.sort_unstable();
            found.dedup();
            found
        })
        .collect();

    let order = topo_order(&deps)?;

    // Resolve bodies leaves-first so every expansion is already closed over
    // its own references before inclusion in a parent.
    let mut bodies: HashMap<Label, MutableFst<W>> = HashMap::new();
    for i in order {
        let (label, sub) = substitutions[i];
        let mut body = sub.clone();
        expand(&mut body, &bodies);
        bodies.insert(label, body);
    }

    let mut out = root.clone();
    expand(&mut out, &bodies);
    Ok(out)
}
