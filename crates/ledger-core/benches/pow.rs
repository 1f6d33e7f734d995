use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{BlockTemplate, CancelToken, Miner};
use std::hint::black_box;

fn template() -> BlockTemplate {
    let txs: Vec<String> = (0..10).map(|i| format!("alice-{i}->bob:{}", i + 1)).collect();
    BlockTemplate::new(1, "0".repeat(64), txs).with_timestamp("2024-01-01T00:00:00Z")
}

fn bench_pow(c: &mut Criterion) {
    let cancel = CancelToken::new();
    c.bench_function("mine_block_difficulty_3", |b| {
        b.iter(|| Miner::new(3).mine(black_box(template()), &cancel))
    });
    c.bench_function("mine_block_difficulty_3_parallel", |b| {
        b.iter(|| Miner::new(3).parallel(true).mine(black_box(template()), &cancel))
    });
    c.bench_function("merkle_root_1000", |b| {
        let txs: Vec<String> = (0..1000).map(|i| format!("tx-{i}")).collect();
        b.iter(|| ledger_core::merkle_root(black_box(&txs)))
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
