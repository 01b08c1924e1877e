// wfst-compile: convert an OpenFst AT&T text FST into the native binary
// container.
//
// Usage:
//   wfst-compile [OPTIONS] INPUT.att OUTPUT.fst
//
// Options:
//   --optimize   Run the optimization pipeline before freezing
//   -h, --help   Print help

use wfst_core::frozen::FrozenFst;
use wfst_core::semiring::TropicalWeight;
use wfst_core::text;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if wfst_cli::wants_help(&args) || args.is_empty() {
        println!("wfst-compile: compile AT&T text into the native binary container.");
        println!();
        println!("Usage: wfst-compile [OPTIONS] INPUT.att OUTPUT.fst");
        println!();
        println!("Input lines are `src dst ilabel olabel [weight]` arcs or");
        println!("`state [weight]` final-state markers; weights default to 0.");
        println!();
        println!("Options:");
        println!("  --optimize   Run the optimization pipeline before freezing");
        println!("  -h, --help   Print this help");
        return;
    }

    let (flags, positional) = wfst_cli::split_flags(&args);
    let optimize = flags.iter().any(|f| f == "--optimize");
    if let Some(unknown) = flags.iter().find(|f| *f != "--optimize") {
        wfst_cli::fatal(&format!("unknown option {unknown}"));
    }
    let [input, output] = positional.as_slice() else {
        wfst_cli::fatal("expected exactly two arguments: INPUT.att OUTPUT.fst");
    };

    let mut fst = text::read_text_file::<TropicalWeight>(input)
        .unwrap_or_else(|e| wfst_cli::fatal(&format!("{input}: {e}")));

    if optimize {
        fst = wfst_ops::optimize(&fst)
            .unwrap_or_else(|e| wfst_cli::fatal(&format!("optimize failed: {e}")));
    }

    let frozen = FrozenFst::freeze(&fst)
        .unwrap_or_else(|e| wfst_cli::fatal(&format!("freeze failed: {e}")));
    frozen
        .write_file(output)
        .unwrap_or_else(|e| wfst_cli::fatal(&format!("{output}: {e}")));
}
