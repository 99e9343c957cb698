//! Saving and restoring games.

use criterion::{criterion_group, criterion_main, Criterion};
use kingside::chess::game::Game;
use kingside::chess::save;

fn midgame() -> Game {
    let mut game = Game::new();
    for text in [
        "e2 e4", "c7 c5", "g1 f3", "d7 d6", "d2 d4", "c5 d4", "f3 d4", "g8 f6", "b1 c3", "a7 a6",
    ] {
        let _ = game.play(text).unwrap();
    }
    game
}

fn save_bench(c: &mut Criterion) {
    let game = midgame();
    let bytes = save::save(&game);
    let mut group = c.benchmark_group("save");
    let _ = group.bench_function("save", |b| {
        b.iter(|| save::save(std::hint::black_box(&game)));
    });
    let _ = group.bench_function("load", |b| {
        b.iter(|| save::load(std::hint::black_box(&bytes)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, save_bench);
criterion_main!(benches);
