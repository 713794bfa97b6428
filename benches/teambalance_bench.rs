//! Criterion benchmarks for team planning.
//!
//! Uses seeded random rosters so runs are comparable.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_teambalance::builder::SolveMode;
use u_teambalance::planner::{SolveOptions, TeamPlanner};
use u_teambalance::roster::{Individual, Roster, TeamConfig};
use u_teambalance::warmstart::warm_start;

fn random_roster(n: usize, seed: u64) -> Roster {
    let mut rng = StdRng::seed_from_u64(seed);
    Roster::new(
        (0..n)
            .map(|id| Individual {
                id,
                name: format!("S{id}"),
                gender: if rng.random_bool(0.5) { "F" } else { "M" }.to_string(),
                skill: rng.random_range(40..100),
            })
            .collect(),
    )
}

const CASES: [(usize, usize); 3] = [(8, 4), (12, 4), (12, 3)];

fn bench_plan_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_optimize");
    group.sample_size(10);

    for &(n, team_size) in &CASES {
        let roster = random_roster(n, 42);
        let config = TeamConfig::new(team_size);
        let planner = TeamPlanner::new(SolveOptions::default().with_seed(42));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n}x{team_size}")),
            &(roster, config),
            |b, (r, c)| {
                b.iter(|| {
                    let outcome = planner.plan(black_box(r), black_box(c), SolveMode::Optimize);
                    black_box(outcome)
                })
            },
        );
    }
    group.finish();
}

fn bench_plan_satisfy(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_satisfy");
    group.sample_size(10);

    for &(n, team_size) in &CASES {
        let roster = random_roster(n, 7);
        let config = TeamConfig::new(team_size);
        let planner = TeamPlanner::new(SolveOptions::default().with_warm_start(false));
        let mode = SolveMode::Satisfy { max_skill_gap: 5 };
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n}x{team_size}")),
            &(roster, config),
            |b, (r, c)| {
                b.iter(|| {
                    let outcome = planner.plan(black_box(r), black_box(c), mode);
                    black_box(outcome)
                })
            },
        );
    }
    group.finish();
}

fn bench_warm_start(c: &mut Criterion) {
    let mut group = c.benchmark_group("warm_start");
    group.sample_size(10);

    for &(n, team_size) in &CASES {
        let roster = random_roster(n, 42);
        let config = TeamConfig::new(team_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n}x{team_size}")),
            &(roster, config),
            |b, (r, c)| {
                b.iter(|| {
                    let hint = warm_start(r, c, n / team_size, SolveMode::Optimize, Some(42), None);
                    black_box(hint)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_plan_optimize, bench_plan_satisfy, bench_warm_start);
criterion_main!(benches);
