// Criterion benchmarks for the operation pipeline.
//
// Everything runs on generated FSTs, so no external data is required.
//
// Run:
//   cargo bench -p wfst-ops

use criterion::{Criterion, criterion_group, criterion_main};

use wfst_core::frozen::FrozenFst;
use wfst_core::semiring::TropicalWeight;
use wfst_core::strings::{byte_label, compile_bytes, compile_pair};
use wfst_core::{Label, MutableFst};

use wfst_ops::{cdrewrite, compose, compose_frozen_shortest_path, optimize, rewrite, union};

use wfst_core::semiring::TropicalWeight as T;

// ---------------------------------------------------------------------------
// Workload construction
// ---------------------------------------------------------------------------

fn lowercase_sigma() -> Vec<Label> {
    (b'a'..=b'z').map(byte_label).collect()
}

/// A union of pseudo-random lowercase words, the shape a lexicon compiles to.
fn word_union(words: usize, len: usize) -> MutableFst<T> {
    let mut seed: u64 = 0x5DEECE66D;
    let mut next_byte = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        b'a' + (seed >> 33) as u8 % 26
    };

    let mut out: MutableFst<T> = compile_bytes(b"");
    for _ in 0..words {
        let word: Vec<u8> = (0..len).map(|_| next_byte()).collect();
        let w: MutableFst<T> = compile_bytes(&word);
        union(&mut out, &w);
    }
    out
}

fn rewrite_rule() -> MutableFst<T> {
    let tau: MutableFst<T> = compile_pair(b"ab", b"xy");
    let lambda: MutableFst<T> = compile_bytes(b"c");
    let rho: MutableFst<T> = compile_bytes(b"d");
    cdrewrite(&tau, &lambda, &rho, &lowercase_sigma()).expect("unit-weight rule")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Optimize a 64-word lexicon union down to its minimal machine.
fn bench_optimize_lexicon(c: &mut Criterion) {
    let lexicon = word_union(64, 8);
    c.bench_function("optimize_lexicon_64x8", |b| {
        b.iter(|| optimize(&lexicon).expect("optimize"))
    });
}

/// Compose a word acceptor with a rewrite rule.
fn bench_compose_rule(c: &mut Criterion) {
    let rule = rewrite_rule();
    let input: MutableFst<T> = compile_bytes(b"acabdacabdacabd");
    c.bench_function("compose_rule", |b| b.iter(|| compose(&input, &rule)));
}

/// Full rewrite: compose, project, best path.
fn bench_rewrite(c: &mut Criterion) {
    let rule = rewrite_rule();
    let input: MutableFst<T> = compile_bytes(b"acabdacabdacabd");
    c.bench_function("rewrite_best_path", |b| {
        b.iter(|| rewrite(&input, &rule).expect("accepting path"))
    });
}

/// Fused compose-shortest-path against a frozen rule.
fn bench_lazy_compose_shortest_path(c: &mut Criterion) {
    let rule = rewrite_rule();
    let frozen = FrozenFst::freeze(&rule).expect("freeze");
    let input: MutableFst<T> = compile_bytes(b"acabdacabdacabd");
    c.bench_function("compose_frozen_shortest_path", |b| {
        b.iter(|| compose_frozen_shortest_path(&input, &frozen, 1).expect("accepting path"))
    });
}

criterion_group!(
    benches,
    bench_optimize_lexicon,
    bench_compose_rule,
    bench_rewrite,
    bench_lazy_compose_shortest_path
);
criterion_main!(benches);
