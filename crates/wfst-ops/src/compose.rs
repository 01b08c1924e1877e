// Composition with the epsilon-sequencing filter, plus the fused
// compose-shortest-path that explores the product graph on demand.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use hashbrown::HashMap;

use wfst_core::frozen::FrozenFst;
use wfst_core::semiring::Semiring;
use wfst_core::{Arc, EPSILON, FstError, Label, MutableFst, NO_STATE, StateId};

/// Product state: a state of each operand plus the epsilon-sequencing filter
/// value φ ∈ {0, 1, 2}. The filter guarantees each path of the result aligns
/// with exactly one pair of operand paths, preventing spurious epsilon
/// multiplicity.
type ProductKey = (StateId, StateId, u8);

/// Right-hand operand of a composition: per-state arc access keyed by input
/// label. The frozen implementation resolves labels by binary search instead
/// of scanning the state's full arc list.
trait ComposeRhs<W: Semiring> {
    fn start(&self) -> StateId;
    fn final_weight(&self, s: StateId) -> W;
    fn for_arcs_with_ilabel(&self, s: StateId, ilabel: Label, f: impl FnMut(Arc<W>));
}

impl<W: Semiring> ComposeRhs<W> for MutableFst<W> {
    fn start(&self) -> StateId {
        self.start()
    }

    fn final_weight(&self, s: StateId) -> W {
        self.final_weight(s)
    }

    fn for_arcs_with_ilabel(&self, s: StateId, ilabel: Label, mut f: impl FnMut(Arc<W>)) {
        for arc in self.arcs(s) {
            if arc.ilabel == ilabel {
                f(*arc);
            }
        }
    }
}

impl<W: Semiring> ComposeRhs<W> for FrozenFst<'_, W> {
    fn start(&self) -> StateId {
        self.start()
    }

    fn final_weight(&self, s: StateId) -> W {
        self.final_weight(s)
    }

    fn for_arcs_with_ilabel(&self, s: StateId, ilabel: Label, mut f: impl FnMut(Arc<W>)) {
        for arc in self.arcs_by_ilabel(s, ilabel) {
            f(arc);
        }
    }
}

/// Emit every transition out of the product state `(sa, sb, filter)`.
fn product_successors<W: Semiring>(
    a: &MutableFst<W>,
    b: &impl ComposeRhs<W>,
    (sa, sb, filter): ProductKey,
    mut emit: impl FnMut(ProductKey, Label, Label, W),
) {
    for arc_a in a.arcs(sa) {
        if arc_a.olabel != EPSILON {
            // Non-epsilon match against B's input tape.
            b.for_arcs_with_ilabel(sb, arc_a.olabel, |arc_b| {
                emit(
                    (arc_a.nextstate, arc_b.nextstate, 0),
                    arc_a.ilabel,
                    arc_b.olabel,
                    arc_a.weight.times(arc_b.weight),
                );
            });
        } else if filter != 1 {
            // A-side epsilon output: B stands still.
            let next = if filter == 0 { 2 } else { filter };
            emit(
                (arc_a.nextstate, sb, next),
                arc_a.ilabel,
                EPSILON,
                arc_a.weight,
            );
        }
    }

    if filter != 2 {
        // B-side epsilon input: A stands still.
        b.for_arcs_with_ilabel(sb, EPSILON, |arc_b| {
            let next = if filter == 0 { 1 } else { filter };
            emit((sa, arc_b.nextstate, next), EPSILON, arc_b.olabel, arc_b.weight);
        });
    }

    if filter == 0 {
        // Simultaneous epsilons on both sides.
        for arc_a in a.arcs(sa) {
            if arc_a.olabel == EPSILON {
                b.for_arcs_with_ilabel(sb, EPSILON, |arc_b| {
                    emit(
                        (arc_a.nextstate, arc_b.nextstate, 0),
                        arc_a.ilabel,
                        arc_b.olabel,
                        arc_a.weight.times(arc_b.weight),
                    );
                });
            }
        }
    }
}

fn compose_impl<W: Semiring>(a: &MutableFst<W>, b: &impl ComposeRhs<W>) -> MutableFst<W> {
    let mut out = MutableFst::new();
    if a.start() == NO_STATE || b.start() == NO_STATE {
        return out;
    }

    let mut ids: HashMap<ProductKey, StateId> = HashMap::new();
    let mut queue: VecDeque<ProductKey> = VecDeque::new();

    let start_key = (a.start(), b.start(), 0);
    ids.insert(start_key, out.add_state());
    out.set_start(0);
    queue.push_back(start_key);

    while let Some(key) = queue.pop_front() {
        let q = ids[&key];

        let mut pending: Vec<(ProductKey, Label, Label, W)> = Vec::new();
        product_successors(a, b, key, |next_key, il, ol, w| {
            pending.push((next_key, il, ol, w));
        });
        for (next_key, il, ol, w) in pending {
            let dest = *ids.entry(next_key).or_insert_with(|| {
                queue.push_back(next_key);
                out.add_state()
            });
            out.add_arc(q, Arc::new(il, ol, w, dest));
        }

        let fw_a = a.final_weight(key.0);
        let fw_b = b.final_weight(key.1);
        if !fw_a.is_zero() && !fw_b.is_zero() {
            out.set_final(q, fw_a.times(fw_b));
        }
    }

    out
}

/// Compose two FSTs over the same semiring: the result relates `x` to `z`
/// iff `a` relates `x` to some `y` and `b` relates `y` to `z`, with weights
/// multiplied along matched arcs and over final states. Result states are
/// numbered in discovery order; composing with a start-less operand yields
/// the empty FST.
pub fn compose<W: Semiring>(a: &MutableFst<W>, b: &MutableFst<W>) -> MutableFst<W> {
    compose_impl(a, b)
}

/// Composition against a frozen right-hand side, resolving label matches
/// with the frozen FST's label-indexed accessor.
pub fn compose_frozen<W: Semiring>(a: &MutableFst<W>, b: &FrozenFst<'_, W>) -> MutableFst<W> {
    compose_impl(a, b)
}

struct QueueEntry<W> {
    weight: W,
    id: u32,
}

impl<W: Semiring> PartialEq for QueueEntry<W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<W: Semiring> Eq for QueueEntry<W> {}

impl<W: Semiring> Ord for QueueEntry<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we need the cheapest entry on
        // top, ties broken toward the lower id.
        other
            .weight
            .compare(self.weight)
            .then(other.id.cmp(&self.id))
    }
}

impl<W: Semiring> PartialOrd for QueueEntry<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Back-pointer of a settled product state.
#[derive(Clone, Copy)]
struct BackPointer<W> {
    prev: u32,
    ilabel: Label,
    olabel: Label,
    weight: W,
}

/// Shortest path over the composition of `a` and `b`, explored on demand:
/// the product graph is extended only as the best-first search reaches it,
/// so the full lattice is never materialized. Equivalent to
/// `shortest_path(&compose_frozen(a, b), 1)`.
///
/// Only `n = 1` is supported; `n = 0` returns the empty FST.
pub fn compose_frozen_shortest_path<W: Semiring>(
    a: &MutableFst<W>,
    b: &FrozenFst<'_, W>,
    n: u32,
) -> Result<MutableFst<W>, FstError> {
    if n == 0 {
        return Ok(MutableFst::new());
    }
    if n != 1 {
        return Err(FstError::UnsupportedNShortest(n));
    }
    if a.start() == NO_STATE || b.start() == NO_STATE {
        return Err(FstError::NoAcceptingPath);
    }

    let mut ids: HashMap<ProductKey, u32> = HashMap::new();
    let mut keys: Vec<ProductKey> = Vec::new();
    let mut dist: Vec<W> = Vec::new();
    let mut back: Vec<Option<BackPointer<W>>> = Vec::new();
    let mut settled: Vec<bool> = Vec::new();
    let mut heap: BinaryHeap<QueueEntry<W>> = BinaryHeap::new();

    let start_key = (a.start(), b.start(), 0);
    ids.insert(start_key, 0);
    keys.push(start_key);
    dist.push(W::one());
    back.push(None);
    settled.push(false);
    heap.push(QueueEntry {
        weight: W::one(),
        id: 0,
    });

    while let Some(QueueEntry { weight, id }) = heap.pop() {
        if settled[id as usize] {
            continue;
        }
        if weight != dist[id as usize] {
            // Stale entry superseded by a better relaxation.
            continue;
        }
        settled[id as usize] = true;

        let key = keys[id as usize];
        let base = dist[id as usize];

        let mut pending: Vec<(ProductKey, Label, Label, W)> = Vec::new();
        product_successors(a, b, key, |next_key, il, ol, w| {
            pending.push((next_key, il, ol, w));
        });

        for (next_key, il, ol, w) in pending {
            let nd = base.times(w);
            if nd.is_zero() {
                continue;
            }
            let next_id = *ids.entry(next_key).or_insert_with(|| {
                keys.push(next_key);
                dist.push(W::zero());
                back.push(None);
                settled.push(false);
                (keys.len() - 1) as u32
            });
            if settled[next_id as usize] {
                continue;
            }
            let candidate = BackPointer {
                prev: id,
                ilabel: il,
                olabel: ol,
                weight: w,
            };
            let slot = next_id as usize;
            match (back[slot], dist[slot]) {
                (None, _) => {
                    dist[slot] = nd;
                    back[slot] = Some(candidate);
                    heap.push(QueueEntry {
                        weight: nd,
                        id: next_id,
                    });
                }
                (Some(old), d) => match nd.compare(d) {
                    Ordering::Less => {
                        dist[slot] = nd;
                        back[slot] = Some(candidate);
                        heap.push(QueueEntry {
                            weight: nd,
                            id: next_id,
                        });
                    }
                    Ordering::Equal => {
                        // Deterministic tie-break: lower previous id, then
                        // lower ilabel, then lower olabel.
                        let new_key = (candidate.prev, candidate.ilabel, candidate.olabel);
                        let old_key = (old.prev, old.ilabel, old.olabel);
                        if new_key < old_key {
                            back[slot] = Some(candidate);
                        }
                    }
                    Ordering::Greater => {}
                },
            }
        }
    }

    // Best final product state by total weight, ties toward the lower id.
    let mut best: Option<(u32, W)> = None;
    for (i, key) in keys.iter().enumerate() {
        if !settled[i] {
            continue;
        }
        let fw = a.final_weight(key.0).times(b.final_weight(key.1));
        if fw.is_zero() {
            continue;
        }
        let total = dist[i].times(fw);
        let better = match best {
            None => true,
            Some((_, w)) => total.compare(w) == Ordering::Less,
        };
        if better {
            best = Some((i as u32, total));
        }
    }

    let (best_id, _) = best.ok_or(FstError::NoAcceptingPath)?;
    let final_key = keys[best_id as usize];
    let final_weight = a
        .final_weight(final_key.0)
        .times(b.final_weight(final_key.1));

    Ok(backtrace(best_id, final_weight, |id| {
        back[id as usize].map(|bp| (bp.prev, bp.ilabel, bp.olabel, bp.weight))
    }))
}

/// Build the linear FST spelled by the back-pointer chain ending at `last`.
pub(crate) fn backtrace<W: Semiring>(
    last: u32,
    final_weight: W,
    back: impl Fn(u32) -> Option<BackStep<W>>,
) -> MutableFst<W> {
    let mut steps: Vec<BackStep<W>> = Vec::new();
    let mut cursor = last;
    while let Some(bp) = back(cursor) {
        cursor = bp.0;
        steps.push(bp);
    }
    steps.reverse();

    let mut out = MutableFst::new();
    let first = out.add_states(steps.len() as u32 + 1);
    out.set_start(first);
    for (i, (_, il, ol, w)) in steps.iter().enumerate() {
        let s = first + i as u32;
        out.add_arc(s, Arc::new(*il, *ol, *w, s + 1));
    }
    out.set_final(first + steps.len() as u32, final_weight);
    out
}

/// One backtrace step: (previous id, ilabel, olabel, arc weight).
pub(crate) type BackStep<W> = (u32, Label, Label, W);
