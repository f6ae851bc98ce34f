//! Criterion benchmarks for fundsim_core
//!
//! Run with: cargo bench -p fundsim_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fundsim_core::config::{FollowOnStrategy, InvestmentBuilder, SimulationConfig};
use fundsim_core::irr::solve_irr;
use fundsim_core::model::{Investment, Stage};
use fundsim_core::sensitivity::{SensitivityConfig, analyze_sensitivity};
use fundsim_core::simulation::simulate_fund;

fn create_portfolio(size: usize) -> Vec<Investment> {
    let stages = [Stage::PreSeed, Stage::Seed, Stage::SeriesA];
    (0..size)
        .map(|i| {
            InvestmentBuilder::new(format!("Company {i}"))
                .entry_stage(stages[i % stages.len()])
                .check_size(250_000.0 + 50_000.0 * (i % 4) as f64)
                .entry_year((i / 10) as u32)
                .build()
        })
        .collect()
}

fn bench_irr(c: &mut Criterion) {
    let mut flows = vec![-1_000_000.0; 5];
    flows.extend([0.0, 250_000.0, 900_000.0, 2_500_000.0, 4_000_000.0]);

    c.bench_function("irr_ten_year_fund", |b| b.iter(|| solve_irr(black_box(&flows))));
}

fn bench_fund_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fund_simulation");
    let investments = create_portfolio(30);

    for trials in [100, 1000, 5000].iter() {
        let config = SimulationConfig {
            trials: *trials,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("trials", trials), trials, |b, _| {
            b.iter(|| simulate_fund(black_box(&investments), black_box(&config), None))
        });
    }

    group.finish();
}

fn bench_follow_on_strategy(c: &mut Criterion) {
    let investments = create_portfolio(30);
    let config = SimulationConfig {
        follow_on: FollowOnStrategy {
            enabled: true,
            rate: 50.0,
            multiple: 1.0,
            reserve_ratio: 0.4,
            recycling_enabled: true,
            recycling_rate: 50.0,
            ..Default::default()
        },
        ..Default::default()
    };

    c.bench_function("fund_with_follow_on_1000", |b| {
        b.iter(|| simulate_fund(black_box(&investments), black_box(&config), None))
    });
}

fn bench_sensitivity(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensitivity");
    group.sample_size(10);

    let investments = create_portfolio(10);
    let config = SimulationConfig {
        trials: 200,
        ..Default::default()
    };
    let search = SensitivityConfig::default();

    group.bench_function("two_targets_200_trials", |b| {
        b.iter(|| {
            analyze_sensitivity(
                black_box(&investments),
                black_box(&config),
                None,
                &[2.0, 3.0],
                &search,
                None,
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_irr,
    bench_fund_simulation,
    bench_follow_on_strategy,
    bench_sensitivity,
);
criterion_main!(benches);
