//! Criterion microbenches for the query hot path.
//!
//! - sampler: `sample_hyperplane` for 2–16 dimensions.
//! - oracle: `Z3Oracle` on a box support with one hyperplane query, and on a
//!   small ReLU encoding.
//! - loop: full `generate_queries` runs.
//!
//! Results live under `target/criterion`.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use wmigen::api::{
    generate_queries, sample_hyperplane, BoundingBox, DenseLayer, Domain, Formula,
    QueryParams, ReluNet, SamplerCfg, SatOracle, Term, Z3Oracle,
};

fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");
    for n in [2usize, 4, 8, 16] {
        let bbox = BoundingBox::cube(n, -1.0, 1.0).unwrap();
        group.bench_with_input(BenchmarkId::new("sample_hyperplane", n), &bbox, |b, bbox| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| {
                let _ = sample_hyperplane(bbox, SamplerCfg::default(), &mut rng);
            })
        });
    }
    group.finish();
}

fn bench_oracle(c: &mut Criterion) {
    let mut group = c.benchmark_group("oracle");
    for n in [4usize, 8] {
        let bbox = BoundingBox::cube(n, -1.0, 1.0).unwrap();
        let domain = Domain::from_box("x", &bbox);
        let support = domain.bounds_formula();
        let names = domain.real_symbols();
        let query = Formula::Le(
            Term::weighted_sum(names.iter().map(|v| (0.7, v.as_str()))),
            Term::Const(1.0),
        );
        group.bench_function(BenchmarkId::new("box_query", n), |b| {
            let mut oracle = Z3Oracle::default();
            b.iter(|| {
                let _ = oracle.is_satisfiable(&support, &query);
            })
        });
    }

    let net = ReluNet {
        layers: vec![
            DenseLayer {
                weights: vec![vec![1.0, -1.0], vec![0.5, 1.0], vec![-1.0, 0.25]],
                bias: vec![0.0, -0.5, 0.1],
            },
            DenseLayer {
                weights: vec![vec![1.0, -2.0, 0.5]],
                bias: vec![0.0],
            },
        ],
    };
    let relu = net.to_formula(0.0).unwrap();
    let bbox = BoundingBox::cube(2, -1.0, 1.0).unwrap();
    let support = Formula::and_all([relu, Domain::from_box("x_", &bbox).bounds_formula()]);
    let query = Formula::Le(Term::Const(0.5), Term::var("y_0"));
    group.bench_function("relu_3_units", |b| {
        let mut oracle = Z3Oracle::default();
        b.iter(|| {
            let _ = oracle.is_satisfiable(&support, &query);
        })
    });
    group.finish();
}

fn bench_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_queries");
    let bbox = BoundingBox::cube(6, 0.0, 1.0).unwrap();
    let domain = Domain::from_box("x", &bbox);
    let support = domain.bounds_formula();
    let names = domain.real_symbols();
    group.bench_function(BenchmarkId::new("box6", "10q-h0.5"), |b| {
        b.iter_batched(
            || StdRng::seed_from_u64(7),
            |mut rng| {
                let _ = generate_queries(
                    &bbox,
                    &names,
                    &support,
                    QueryParams::new(10, 0.5),
                    &mut Z3Oracle::default(),
                    &mut rng,
                );
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_sampler, bench_oracle, bench_loop);
criterion_main!(benches);
