// Byte-string compilation and character-class acceptors.
//
// Byte b is carried on the wire as label b + 1, keeping label 0 free for
// epsilon. All builders produce tropical-or-log generic FSTs with unit
// weights.

use crate::FstError;
use crate::arc::{Arc, EPSILON, Label, NO_STATE};
use crate::mutable::MutableFst;
use crate::semiring::Semiring;

/// Label carried by byte `b`.
#[inline]
pub fn byte_label(b: u8) -> Label {
    b as Label + 1
}

/// Byte carried by label `l`, if `l` encodes one.
#[inline]
pub fn label_byte(l: Label) -> Option<u8> {
    if (1..=256).contains(&l) {
        Some((l - 1) as u8)
    } else {
        None
    }
}

/// Compile a byte sequence into a linear chain acceptor with unit weights.
pub fn compile_bytes<W: Semiring>(bytes: &[u8]) -> MutableFst<W> {
    let mut fst = MutableFst::new();
    let first = fst.add_states(bytes.len() as u32 + 1);
    fst.set_start(first);
    for (i, &b) in bytes.iter().enumerate() {
        let s = first + i as u32;
        fst.add_arc(s, Arc::new(byte_label(b), byte_label(b), W::one(), s + 1));
    }
    fst.set_final(first + bytes.len() as u32, W::one());
    fst
}

/// Compile a transducer rewriting `input` to `output` along a single linear
/// path: labels are paired positionally, the longer side padded with epsilon.
pub fn compile_pair<W: Semiring>(input: &[u8], output: &[u8]) -> MutableFst<W> {
    let len = input.len().max(output.len());
    let mut fst = MutableFst::new();
    let first = fst.add_states(len as u32 + 1);
    fst.set_start(first);
    for i in 0..len {
        let il = input.get(i).map(|&b| byte_label(b)).unwrap_or(EPSILON);
        let ol = output.get(i).map(|&b| byte_label(b)).unwrap_or(EPSILON);
        let s = first + i as u32;
        fst.add_arc(s, Arc::new(il, ol, W::one(), s + 1));
    }
    fst.set_final(first + len as u32, W::one());
    fst
}

fn collect_linear_labels<W: Semiring>(
    fst: &MutableFst<W>,
    pick: impl Fn(&Arc<W>) -> Label,
) -> Result<Vec<u8>, FstError> {
    let mut s = fst.start();
    if s == NO_STATE {
        return Err(FstError::NoAcceptingPath);
    }
    let mut out = Vec::new();
    let mut steps: u64 = 0;
    loop {
        let arcs = fst.arcs(s);
        match arcs.len() {
            0 => {
                if fst.is_final(s) {
                    return Ok(out);
                }
                return Err(FstError::NoAcceptingPath);
            }
            1 => {
                let arc = &arcs[0];
                let l = pick(arc);
                if l != EPSILON {
                    let b = label_byte(l).ok_or_else(|| {
                        FstError::InvalidArgument(format!("label {l} does not encode a byte"))
                    })?;
                    out.push(b);
                }
                s = arc.nextstate;
            }
            n => {
                return Err(FstError::InvalidArgument(format!(
                    "FST is not linear: state {s} has {n} arcs"
                )));
            }
        }
        steps += 1;
        if steps > fst.total_arcs() {
            // Linear FSTs visit each arc at most once; anything longer loops.
            return Err(FstError::InvalidArgument(
                "FST is not linear: cycle detected".to_string(),
            ));
        }
    }
}

/// Read the byte string spelled by a linear FST's input tape.
pub fn print_string<W: Semiring>(fst: &MutableFst<W>) -> Result<String, FstError> {
    let bytes = collect_linear_labels(fst, |a| a.ilabel)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read the byte string spelled by a linear FST's output tape.
pub fn print_output_string<W: Semiring>(fst: &MutableFst<W>) -> Result<String, FstError> {
    let bytes = collect_linear_labels(fst, |a| a.olabel)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn range_acceptor<W: Semiring>(ranges: &[(u8, u8)]) -> MutableFst<W> {
    let mut fst = MutableFst::new();
    let s0 = fst.add_state();
    let s1 = fst.add_state();
    fst.set_start(s0);
    fst.set_final(s1, W::one());
    for &(lo, hi) in ranges {
        for b in lo..=hi {
            let l = byte_label(b);
            fst.add_arc(s0, Arc::new(l, l, W::one(), s1));
        }
    }
    fst
}

/// Acceptor for any single byte.
pub fn byte_acceptor<W: Semiring>() -> MutableFst<W> {
    range_acceptor(&[(0x00, 0xFF)])
}

/// Acceptor for a single ASCII letter.
pub fn alpha_acceptor<W: Semiring>() -> MutableFst<W> {
    range_acceptor(&[(b'A', b'Z'), (b'a', b'z')])
}

/// Acceptor for a single ASCII digit.
pub fn digit_acceptor<W: Semiring>() -> MutableFst<W> {
    range_acceptor(&[(b'0', b'9')])
}

/// Acceptor for one well-formed UTF-8 encoded scalar value (1-4 bytes),
/// covering exactly the valid byte-sequence shapes, surrogates excluded.
pub fn utf8_acceptor<W: Semiring>() -> MutableFst<W> {
    fn byte_range<W: Semiring>(fst: &mut MutableFst<W>, from: u32, to: u32, lo: u8, hi: u8) {
        for b in lo..=hi {
            let l = byte_label(b);
            fst.add_arc(from, Arc::new(l, l, W::one(), to));
        }
    }

    let mut fst = MutableFst::new();
    let start = fst.add_state();
    let accept = fst.add_state();
    fst.set_start(start);
    fst.set_final(accept, W::one());

    // One byte: ASCII.
    byte_range(&mut fst, start, accept, 0x00, 0x7F);

    // Two bytes: C2..DF 80..BF.
    let two_1 = fst.add_state();
    byte_range(&mut fst, start, two_1, 0xC2, 0xDF);
    byte_range(&mut fst, two_1, accept, 0x80, 0xBF);

    // Three bytes, split to exclude overlongs and surrogates:
    //   E0 A0..BF 80..BF | E1..EC 80..BF 80..BF |
    //   ED 80..9F 80..BF | EE..EF 80..BF 80..BF
    let three_e0 = fst.add_state();
    let three_mid = fst.add_state();
    let three_ed = fst.add_state();
    let three_rest = fst.add_state();
    byte_range(&mut fst, start, three_e0, 0xE0, 0xE0);
    byte_range(&mut fst, three_e0, three_mid, 0xA0, 0xBF);
    byte_range(&mut fst, start, three_rest, 0xE1, 0xEC);
    byte_range(&mut fst, start, three_rest, 0xEE, 0xEF);
    byte_range(&mut fst, three_rest, three_mid, 0x80, 0xBF);
    byte_range(&mut fst, start, three_ed, 0xED, 0xED);
    byte_range(&mut fst, three_ed, three_mid, 0x80, 0x9F);
    byte_range(&mut fst, three_mid, accept, 0x80, 0xBF);

    // Four bytes: F0 90..BF | F1..F3 80..BF | F4 80..8F, then two
    // continuation bytes.
    let four_f0 = fst.add_state();
    let four_mid1 = fst.add_state();
    let four_mid2 = fst.add_state();
    let four_rest = fst.add_state();
    let four_f4 = fst.add_state();
    byte_range(&mut fst, start, four_f0, 0xF0, 0xF0);
    byte_range(&mut fst, four_f0, four_mid1, 0x90, 0xBF);
    byte_range(&mut fst, start, four_rest, 0xF1, 0xF3);
    byte_range(&mut fst, four_rest, four_mid1, 0x80, 0xBF);
    byte_range(&mut fst, start, four_f4, 0xF4, 0xF4);
    byte_range(&mut fst, four_f4, four_mid1, 0x80, 0x8F);
    byte_range(&mut fst, four_mid1, four_mid2, 0x80, 0xBF);
    byte_range(&mut fst, four_mid2, accept, 0x80, 0xBF);

    fst
}

/// Acceptor for zero or more symbols drawn from `labels` (Σ*): one final
/// state with a unit-weight self-loop per label.
pub fn sigma_star<W: Semiring>(labels: &[Label]) -> MutableFst<W> {
    let mut fst = MutableFst::new();
    let s0 = fst.add_state();
    fst.set_start(s0);
    fst.set_final(s0, W::one());
    for &l in labels {
        fst.add_arc(s0, Arc::new(l, l, W::one(), s0));
    }
    fst
}
