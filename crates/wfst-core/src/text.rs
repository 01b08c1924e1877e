// AT&T tabular text format: parse and emit.
//
// Arc lines:         src dst ilabel olabel [weight]
// Final-state lines: state [weight]
//
// Weights default to 1̄. Empty lines are skipped. The first source state
// encountered becomes the start; unknown states are created on demand.

use std::fmt::Write as _;
use std::path::Path;

use crate::FstError;
use crate::arc::{Arc, NO_STATE, StateId};
use crate::mutable::MutableFst;
use crate::semiring::Semiring;

/// Parse an FST from AT&T text.
pub fn parse_text<W: Semiring>(text: &str) -> Result<MutableFst<W>, FstError> {
    let mut fst = MutableFst::new();

    let ensure_state = |fst: &mut MutableFst<W>, s: StateId| {
        if s >= fst.num_states() {
            fst.add_states(s - fst.num_states() + 1);
        }
    };

    for (lineno, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        let bad_line = |what: &str| {
            FstError::InvalidFormat(format!("line {}: {what}: {line:?}", lineno + 1))
        };

        match fields.len() {
            1 | 2 => {
                let s: StateId = fields[0].parse().map_err(|_| bad_line("bad state id"))?;
                let weight = match fields.get(1) {
                    Some(f) => {
                        W::from_value(f.parse().map_err(|_| bad_line("bad final weight"))?)
                    }
                    None => W::one(),
                };
                ensure_state(&mut fst, s);
                fst.set_final(s, weight);
            }
            4 | 5 => {
                let src: StateId = fields[0].parse().map_err(|_| bad_line("bad source state"))?;
                let dst: StateId = fields[1].parse().map_err(|_| bad_line("bad dest state"))?;
                let ilabel = fields[2].parse().map_err(|_| bad_line("bad input label"))?;
                let olabel = fields[3].parse().map_err(|_| bad_line("bad output label"))?;
                let weight = match fields.get(4) {
                    Some(f) => W::from_value(f.parse().map_err(|_| bad_line("bad arc weight"))?),
                    None => W::one(),
                };
                ensure_state(&mut fst, src.max(dst));
                if fst.start() == NO_STATE {
                    fst.set_start(src);
                }
                fst.add_arc(src, Arc::new(ilabel, olabel, weight, dst));
            }
            _ => return Err(bad_line("expected 1-2 or 4-5 fields")),
        }
    }

    Ok(fst)
}

/// Emit an FST as AT&T text. The start state's arcs come first (the format
/// designates the first line's source as the start), then the remaining
/// states in id order, then the final-state lines.
pub fn emit_text<W: Semiring>(fst: &MutableFst<W>) -> String {
    let mut out = String::new();
    let start = fst.start();

    let emit_state_arcs = |out: &mut String, s: StateId| {
        for arc in fst.arcs(s) {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                s,
                arc.nextstate,
                arc.ilabel,
                arc.olabel,
                arc.weight.value()
            );
        }
    };

    if start != NO_STATE {
        emit_state_arcs(&mut out, start);
    }
    for s in fst.state_ids() {
        if s != start {
            emit_state_arcs(&mut out, s);
        }
    }
    for s in fst.state_ids() {
        if fst.is_final(s) {
            let fw = fst.final_weight(s);
            if fw == W::one() {
                let _ = writeln!(out, "{s}");
            } else {
                let _ = writeln!(out, "{}\t{}", s, fw.value());
            }
        }
    }
    out
}

/// Read an FST from an AT&T text file.
pub fn read_text_file<W: Semiring>(path: impl AsRef<Path>) -> Result<MutableFst<W>, FstError> {
    let text = std::fs::read_to_string(path)?;
    parse_text(&text)
}

/// Write an FST to an AT&T text file.
pub fn write_text_file<W: Semiring>(
    fst: &MutableFst<W>,
    path: impl AsRef<Path>,
) -> Result<(), FstError> {
    std::fs::write(path, emit_text(fst))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::semiring::TropicalWeight as T;

    #[test]
    fn parse_simple_acceptor() {
        let fst: MutableFst<T> = parse_text("0\t1\t97\t97\t0.5\n1\n").unwrap();
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.start(), 0);
        assert_eq!(fst.num_arcs(0), 1);
        let arc = fst.arcs(0)[0];
        assert_eq!(arc.ilabel, 97);
        assert_eq!(arc.weight, T(0.5));
        assert!(fst.is_final(1));
        assert_eq!(fst.final_weight(1), T::one());
    }

    #[test]
    fn weights_default_to_one() {
        let fst: MutableFst<T> = parse_text("0 1 5 6\n1 2.5\n").unwrap();
        assert_eq!(fst.arcs(0)[0].weight, T::one());
        assert_eq!(fst.final_weight(1), T(2.5));
    }

    #[test]
    fn first_source_becomes_start() {
        let fst: MutableFst<T> = parse_text("3 1 7 7\n0 3 8 8\n1\n").unwrap();
        assert_eq!(fst.start(), 3);
    }

    #[test]
    fn unknown_states_created_on_demand() {
        let fst: MutableFst<T> = parse_text("0 9 1 1\n9\n").unwrap();
        assert_eq!(fst.num_states(), 10);
        for s in 1..9 {
            assert!(!fst.is_final(s));
            assert_eq!(fst.num_arcs(s), 0);
        }
    }

    #[test]
    fn empty_lines_are_skipped() {
        let fst: MutableFst<T> = parse_text("\n0 1 2 2\n\n   \n1\n").unwrap();
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.total_arcs(), 1);
    }

    #[test]
    fn reject_malformed_lines() {
        assert!(parse_text::<T>("0 1 2\n").is_err());
        assert!(parse_text::<T>("a b c d\n").is_err());
        assert!(parse_text::<T>("0 1 2 3 x\n").is_err());
    }

    #[test]
    fn emit_starts_with_start_state() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s1);
        fst.add_arc(s0, Arc::new(1, 1, T::one(), s1));
        fst.add_arc(s1, Arc::new(2, 2, T::one(), s0));
        fst.set_final(s0, T(3.0));

        let text = emit_text(&fst);
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("1\t"));
        assert!(text.lines().any(|l| l == "0\t3"));
    }

    #[test]
    fn text_round_trip() {
        let mut fst: MutableFst<T> = MutableFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.add_arc(s0, Arc::new(97, 98, T(0.25), s1));
        fst.add_arc(s1, Arc::new(99, 0, T(1.5), s2));
        fst.set_final(s2, T(2.0));

        let reparsed: MutableFst<T> = parse_text(&emit_text(&fst)).unwrap();
        assert_eq!(reparsed.num_states(), fst.num_states());
        assert_eq!(reparsed.start(), fst.start());
        assert_eq!(reparsed.total_arcs(), fst.total_arcs());
        for s in fst.state_ids() {
            assert_eq!(reparsed.arcs(s), fst.arcs(s));
            assert_eq!(reparsed.final_weight(s), fst.final_weight(s));
        }
    }
}
