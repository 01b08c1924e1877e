// Label-pair encoding: turns a transducer into an acceptor so that
// determinize/minimize preserve the relation, and back again.

use hashbrown::HashMap;

use wfst_core::semiring::Semiring;
use wfst_core::{FstError, Label, MutableFst};

/// Registry of (ilabel, olabel) pairs and the fresh labels assigned to them.
/// Codes start at 1; label 0 stays reserved for epsilon.
#[derive(Debug, Default)]
pub struct EncodeTable {
    pairs: Vec<(Label, Label)>,
    codes: HashMap<(Label, Label), Label>,
}

impl EncodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, pair: (Label, Label)) -> Result<Label, FstError> {
        if let Some(&code) = self.codes.get(&pair) {
            return Ok(code);
        }
        let next = self.pairs.len() as u64 + 1;
        if next >= u32::MAX as u64 {
            return Err(FstError::LabelOverflow);
        }
        let code = next as Label;
        self.pairs.push(pair);
        self.codes.insert(pair, code);
        Ok(code)
    }

    fn pair(&self, code: Label) -> Option<(Label, Label)> {
        self.pairs.get(code.checked_sub(1)? as usize).copied()
    }
}

/// Replace each arc's label pair with its code on both tapes, registering
/// unseen pairs. The encoded FST is an acceptor by construction.
pub fn encode<W: Semiring>(
    fst: &mut MutableFst<W>,
    table: &mut EncodeTable,
) -> Result<(), FstError> {
    // Register every pair first so the rewriting pass cannot fail.
    for s in fst.state_ids() {
        for arc in fst.arcs(s) {
            table.register((arc.ilabel, arc.olabel))?;
        }
    }
    fst.map_arcs(|arc| {
        let code = table.codes[&(arc.ilabel, arc.olabel)];
        arc.ilabel = code;
        arc.olabel = code;
    });
    Ok(())
}

/// Restore the label pairs recorded by `encode`. Arcs carrying labels the
/// table never assigned are an invalid-argument error.
pub fn decode<W: Semiring>(fst: &mut MutableFst<W>, table: &EncodeTable) -> Result<(), FstError> {
    for s in fst.state_ids() {
        for arc in fst.arcs(s) {
            if table.pair(arc.ilabel).is_none() {
                return Err(FstError::InvalidArgument(format!(
                    "label {} was not assigned by this encode table",
                    arc.ilabel
                )));
            }
        }
    }
    fst.map_arcs(|arc| {
        let (il, ol) = table.pairs[(arc.ilabel - 1) as usize];
        arc.ilabel = il;
        arc.olabel = ol;
    });
    Ok(())
}
