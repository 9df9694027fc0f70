use archetype_ecs::{EngineConfig, Manager, Registry};
use criterion::{criterion_group, criterion_main, Criterion};

#[derive(Debug, Clone, Copy)]
struct Counter(u64);

fn bench_parallel_for_each(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_each_view");

    group.bench_function("sequential_view_for_each_mut", |b| {
        let registry = Registry::new();
        for _ in 0..50_000 {
            registry.insert((Counter(0),));
        }
        b.iter(|| {
            let view = registry.get_view::<Counter>(&[]);
            view.for_each_mut(|c| c.0 += 1).unwrap();
        });
    });

    group.bench_function("manager_for_each_view_mut_parallel", |b| {
        let manager = Manager::with_config(EngineConfig::default());
        for _ in 0..50_000 {
            manager.insert((Counter(0),));
        }
        b.iter(|| {
            manager.for_each_view_mut::<Counter, _>(&[], |c| c.0 += 1);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parallel_for_each);
criterion_main!(benches);
