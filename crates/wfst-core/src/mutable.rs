// Mutable FST: the builder phase of the two-phase data model.

use crate::arc::{Arc, NO_STATE, StateId};
use crate::semiring::Semiring;
use crate::Label;

/// One builder state: a final weight and an ordered list of outgoing arcs.
///
/// A state is final iff its final weight is not 0̄. Arc order is insertion
/// order until an explicit sort.
#[derive(Debug, Clone)]
pub struct State<W> {
    pub final_weight: W,
    pub arcs: Vec<Arc<W>>,
}

impl<W: Semiring> State<W> {
    fn new() -> Self {
        State {
            final_weight: W::zero(),
            arcs: Vec::new(),
        }
    }
}

/// The mutable builder FST.
///
/// Exclusive single-writer ownership: concurrent mutation of one instance is
/// undefined. Every structural mutation bumps the generation counter, so a
/// consumer that snapshotted the counter before obtaining an arc view can
/// detect silent invalidation with [`assert_generation`](Self::assert_generation).
///
/// State ids passed to mutators and queries must be in range; out-of-range
/// ids are a caller bug and panic, exactly like slice indexing. The boundary
/// layer validates ids before they reach this type.
#[derive(Debug)]
pub struct MutableFst<W> {
    states: Vec<State<W>>,
    start: StateId,
    generation: u64,
}

impl<W: Semiring> Default for MutableFst<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Semiring> MutableFst<W> {
    /// Create an empty FST with no states and an undefined start.
    pub fn new() -> Self {
        MutableFst {
            states: Vec::new(),
            start: NO_STATE,
            generation: 0,
        }
    }

    // -- Structural mutation --------------------------------------------

    /// Add one state and return its id.
    pub fn add_state(&mut self) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(State::new());
        self.generation += 1;
        id
    }

    /// Add `n` states; returns the id of the first one.
    pub fn add_states(&mut self, n: u32) -> StateId {
        let first = self.states.len() as StateId;
        self.states
            .extend(std::iter::repeat_with(State::new).take(n as usize));
        self.generation += 1;
        first
    }

    pub fn set_start(&mut self, s: StateId) {
        assert!((s as usize) < self.states.len(), "start state out of range");
        self.start = s;
        self.generation += 1;
    }

    pub fn set_final(&mut self, s: StateId, weight: W) {
        self.states[s as usize].final_weight = weight;
        self.generation += 1;
    }

    pub fn add_arc(&mut self, s: StateId, arc: Arc<W>) {
        debug_assert!(
            (arc.nextstate as usize) < self.states.len(),
            "arc destination out of range"
        );
        self.states[s as usize].arcs.push(arc);
        self.generation += 1;
    }

    /// Remove all outgoing arcs of `s`.
    pub fn delete_arcs(&mut self, s: StateId) {
        self.states[s as usize].arcs.clear();
        self.generation += 1;
    }

    /// Remove every state, leaving an empty FST with an undefined start.
    pub fn delete_states(&mut self) {
        self.states.clear();
        self.start = NO_STATE;
        self.generation += 1;
    }

    /// Sort the arcs of `s` lexicographically by (ilabel, olabel, weight,
    /// nextstate).
    pub fn sort_arcs(&mut self, s: StateId) {
        self.states[s as usize].arcs.sort_by(|a, b| a.sort_cmp(b));
        self.generation += 1;
    }

    /// Sort the arcs of every state.
    pub fn sort_all_arcs(&mut self) {
        for state in &mut self.states {
            state.arcs.sort_by(|a, b| a.sort_cmp(b));
        }
        self.generation += 1;
    }

    /// Apply `f` to every arc in the FST (label/weight rewriting in place).
    pub fn map_arcs(&mut self, mut f: impl FnMut(&mut Arc<W>)) {
        for state in &mut self.states {
            for arc in &mut state.arcs {
                f(arc);
            }
        }
        self.generation += 1;
    }

    // -- Queries --------------------------------------------------------

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn num_states(&self) -> u32 {
        self.states.len() as u32
    }

    pub fn num_arcs(&self, s: StateId) -> u32 {
        self.states[s as usize].arcs.len() as u32
    }

    pub fn total_arcs(&self) -> u64 {
        self.states.iter().map(|st| st.arcs.len() as u64).sum()
    }

    pub fn final_weight(&self, s: StateId) -> W {
        self.states[s as usize].final_weight
    }

    pub fn is_final(&self, s: StateId) -> bool {
        !self.states[s as usize].final_weight.is_zero()
    }

    /// Contiguous view of the arcs of `s`. Invalidated (possibly silently)
    /// by any structural mutation; see [`generation`](Self::generation).
    pub fn arcs(&self, s: StateId) -> &[Arc<W>] {
        &self.states[s as usize].arcs
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + use<W> {
        0..self.num_states()
    }

    /// True iff every arc has matching input and output labels.
    pub fn is_acceptor(&self) -> bool {
        self.states
            .iter()
            .all(|st| st.arcs.iter().all(|a| a.ilabel == a.olabel))
    }

    /// Labels in use on the input tape, excluding epsilon, deduplicated and
    /// sorted.
    pub fn input_labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self
            .states
            .iter()
            .flat_map(|st| st.arcs.iter())
            .map(|a| a.ilabel)
            .filter(|&l| l != crate::EPSILON)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    // -- Generation diagnostics ----------------------------------------

    /// Monotonic counter bumped on every structural mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Debug-assert that no mutation happened since `snapshot` was taken.
    /// Compiled away in release builds.
    #[inline]
    pub fn assert_generation(&self, snapshot: u64) {
        debug_assert_eq!(
            self.generation, snapshot,
            "arc views were invalidated by a concurrent structural mutation"
        );
    }

    // -- Whole-FST transforms ------------------------------------------

    /// Replace the state sequence: state `i` moves to `mapping[i]`, or is
    /// dropped when the entry is [`NO_STATE`]. When several old states map to
    /// the same new id, the first occurrence wins and later duplicates are
    /// discarded. Arc destinations and the start state are rewritten through
    /// the mapping; arcs whose destination was dropped are removed.
    pub fn remap_states(&mut self, mapping: &[StateId]) {
        assert_eq!(
            mapping.len(),
            self.states.len(),
            "remap mapping length must equal the state count"
        );

        let new_len = mapping
            .iter()
            .filter(|&&m| m != NO_STATE)
            .map(|&m| m as usize + 1)
            .max()
            .unwrap_or(0);

        let mut new_states: Vec<Option<State<W>>> = (0..new_len).map(|_| None).collect();
        let old_states = std::mem::take(&mut self.states);

        for (i, state) in old_states.into_iter().enumerate() {
            let target = mapping[i];
            if target == NO_STATE {
                continue;
            }
            let slot = &mut new_states[target as usize];
            if slot.is_some() {
                // Duplicate mapping: keep the first occurrence.
                continue;
            }
            let mut state = state;
            state.arcs.retain_mut(|arc| {
                let mapped = mapping[arc.nextstate as usize];
                arc.nextstate = mapped;
                mapped != NO_STATE
            });
            *slot = Some(state);
        }

        self.states = new_states
            .into_iter()
            .map(|s| s.unwrap_or_else(State::new))
            .collect();
        self.start = if self.start == NO_STATE {
            NO_STATE
        } else {
            mapping[self.start as usize]
        };
        self.generation += 1;
    }
}

// Deep copy with a fresh generation counter.
impl<W: Semiring> Clone for MutableFst<W> {
    fn clone(&self) -> Self {
        MutableFst {
            states: self.states.clone(),
            start: self.start,
            generation: 0,
        }
    }
}
