// The canonical optimization pipeline.

use wfst_core::semiring::Semiring;
use wfst_core::{FstError, MutableFst};

use crate::connect::connect;
use crate::determinize::determinize;
use crate::encode::{EncodeTable, decode, encode};
use crate::minimize::minimize;
use crate::rm_epsilon::rm_epsilon;

/// Optimize an FST: rm_epsilon, then (for transducers) encode label pairs,
/// determinize, minimize, decode, and finally connect.
///
/// Encoding guarantees the determinized intermediate is an acceptor, so the
/// subset construction preserves the transduction; decoding restores the
/// label pairs afterwards.
pub fn optimize<W: Semiring>(fst: &MutableFst<W>) -> Result<MutableFst<W>, FstError> {
    let mut out = rm_epsilon(fst);

    let is_transducer = !out.is_acceptor();
    let mut table = EncodeTable::new();
    if is_transducer {
        encode(&mut out, &mut table)?;
    }

    let mut out = determinize(&out);
    minimize(&mut out);

    if is_transducer {
        decode(&mut out, &table)?;
    }
    connect(&mut out);
    Ok(out)
}
