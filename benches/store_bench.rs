use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use kv_fifo::{Slot, Store};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> u32 {
    (n >> 33) as u32 % 1024
}

fn filled(seed: u64, n: usize) -> (Store<u32, u64>, Vec<Slot>) {
    let mut s = Store::with_capacity(n);
    let slots = lcg(seed)
        .take(n)
        .enumerate()
        .map(|(i, x)| s.push(key(x), i as u64).unwrap())
        .collect();
    (s, slots)
}

fn bench_fork(c: &mut Criterion) {
    c.bench_function("store::fork_100k", |b| {
        let (s, _slots) = filled(1, 100_000);
        b.iter(|| black_box(s.fork()))
    });
}

fn bench_push_fresh(c: &mut Criterion) {
    c.bench_function("store::push_fresh_100k", |b| {
        b.iter_batched(
            Store::<u32, u64>::new,
            |mut s| {
                for (i, x) in lcg(2).take(100_000).enumerate() {
                    s.push(key(x), i as u64).unwrap();
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_slot_access(c: &mut Criterion) {
    c.bench_function("store::get_by_slot", |b| {
        let (s, slots) = filled(3, 100_000);
        let mut it = slots.iter().cycle();
        b.iter(|| {
            let slot = *it.next().unwrap();
            black_box(s.get(slot));
        })
    });
}

fn bench_first_last(c: &mut Criterion) {
    c.bench_function("store::first_last", |b| {
        let (s, _slots) = filled(4, 100_000);
        let mut keys = lcg(4).map(key);
        b.iter(|| {
            let k = keys.next().unwrap();
            black_box((s.first(&k), s.last(&k)));
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_fork, bench_push_fresh, bench_slot_access, bench_first_last
}
criterion_main!(benches);
