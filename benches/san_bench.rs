use criterion::{criterion_group, criterion_main, Criterion, black_box};
use cozy_chess::Board;
use analysis_board::san::{line_to_san, parse_san};

fn bench_san(c: &mut Criterion) {
    let b = Board::default();
    let pv: Vec<String> = ["e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6"]
        .iter().map(|s| s.to_string()).collect();
    c.bench_function("line_to_san_10ply", |ben| {
        ben.iter(|| black_box(line_to_san(black_box(&b), black_box(&pv))))
    });
    let mid = Board::from_fen("r1bqkb1r/pp3ppp/2nppn2/8/3NP3/2N5/PPP2PPP/R1BQKB1R w KQkq - 0 6", false).unwrap();
    c.bench_function("parse_san_middlegame", |ben| {
        ben.iter(|| black_box(parse_san(black_box(&mid), black_box("Nxc6")).unwrap()))
    });
}

criterion_group!(benches, bench_san);
criterion_main!(benches);
