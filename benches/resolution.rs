use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ioc_weave::*;
use std::sync::Arc;

// ===== Fixtures =====

#[derive(Default)]
struct Config;

struct Repository {
    _config: Arc<Config>,
}

struct Service {
    _repository: Arc<Repository>,
    _config: Arc<Config>,
}

fn container(repository: Lifestyle) -> Container {
    let container = Container::new();
    container.describe(TypeDescriptor::of::<Config>().default_constructor()).unwrap();
    container
        .describe(TypeDescriptor::of::<Repository>().constructor(
            vec![ParameterInfo::of::<Config>("config")],
            |args: &Arguments| Ok(Repository { _config: args.get::<Config>(0)? }),
        ))
        .unwrap();
    container
        .describe(TypeDescriptor::of::<Service>().constructor(
            vec![ParameterInfo::of::<Repository>("repository"), ParameterInfo::of::<Config>("config")],
            |args: &Arguments| {
                Ok(Service {
                    _repository: args.get::<Repository>(0)?,
                    _config: args.get::<Config>(1)?,
                })
            },
        ))
        .unwrap();
    container.register_concrete::<Config>(Lifestyle::singleton()).unwrap();
    container.register_concrete::<Repository>(repository).unwrap();
    container.register_concrete::<Service>(Lifestyle::transient()).unwrap();
    container
}

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = container(Lifestyle::singleton());
    let _ = container.get_instance::<Config>().unwrap();

    c.bench_function("singleton_hit", |b| {
        b.iter(|| black_box(container.get_instance::<Config>().unwrap()))
    });
}

fn bench_transient_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient_graph");
    for (name, lifestyle) in [("singleton_repository", Lifestyle::singleton()), ("transient_repository", Lifestyle::transient())] {
        let container = container(lifestyle);
        let _ = container.get_instance::<Service>().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &container, |b, container| {
            b.iter(|| black_box(container.get_instance::<Service>().unwrap()))
        });
    }
    group.finish();
}

fn bench_scoped(c: &mut Criterion) {
    let container = Container::new();
    container.set_default_scoped_lifestyle(Lifestyle::flowing()).unwrap();
    container.describe(TypeDescriptor::of::<Config>().default_constructor()).unwrap();
    container.register_concrete::<Config>(Lifestyle::scoped()).unwrap();

    c.bench_function("scope_create_and_resolve", |b| {
        b.iter(|| {
            let scope = container.begin_scope();
            black_box(scope.get_instance::<Config>().unwrap());
        })
    });
}

// ===== Macro Benchmarks =====

fn bench_cold_start(c: &mut Criterion) {
    c.bench_function("cold_start_verify_and_resolve", |b| {
        b.iter_batched(
            || container(Lifestyle::singleton()),
            |container| {
                container.verify_with(VerificationOption::VerifyOnly).unwrap();
                black_box(container.get_instance::<Service>().unwrap());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_transient_graph");
    let container = container(Lifestyle::singleton());
    let _ = container.get_instance::<Service>().unwrap();

    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_custom(|iters| {
                let start = std::time::Instant::now();
                crossbeam_utils::thread::scope(|s| {
                    for _ in 0..threads {
                        let container = &container;
                        s.spawn(move |_| {
                            for _ in 0..iters / threads as u64 {
                                black_box(container.get_instance::<Service>().unwrap());
                            }
                        });
                    }
                })
                .unwrap();
                start.elapsed()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_transient_graph,
    bench_scoped,
    bench_cold_start,
    bench_concurrent
);
criterion_main!(benches);
