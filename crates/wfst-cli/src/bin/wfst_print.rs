// wfst-print: dump a native binary container as AT&T text.
//
// Usage:
//   wfst-print INPUT.fst
//
// Prints arc lines (`src dst ilabel olabel weight`) followed by final-state
// lines to stdout, the exact format wfst-compile reads back.

use std::io::Write;

use wfst_core::frozen::OwnedFrozenFst;
use wfst_core::semiring::TropicalWeight;
use wfst_core::text;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if wfst_cli::wants_help(&args) || args.is_empty() {
        println!("wfst-print: dump a native binary container as AT&T text.");
        println!();
        println!("Usage: wfst-print INPUT.fst");
        return;
    }

    let [input] = args.as_slice() else {
        wfst_cli::fatal("expected exactly one argument: INPUT.fst");
    };

    let frozen = OwnedFrozenFst::<TropicalWeight>::read_file(input)
        .unwrap_or_else(|e| wfst_cli::fatal(&format!("{input}: {e}")));

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let text = text::emit_text(&frozen.to_mutable());
    out.write_all(text.as_bytes())
        .unwrap_or_else(|e| wfst_cli::fatal(&format!("stdout: {e}")));
}
