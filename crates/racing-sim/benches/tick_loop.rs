use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use racing_core::horse::Gender;
use racing_core::horse::Horse;
use racing_core::horse::LegType;
use racing_core::race::Race;
use racing_core::race::Surface;
use racing_sim::RaceExecutor;

fn field_of(n: usize) -> Vec<Horse> {
    let leg_types = [
        LegType::StartDash,
        LegType::FrontRunner,
        LegType::StretchRunner,
        LegType::LastSpurt,
        LegType::RailRunner,
    ];
    (0..n)
        .map(|i| {
            let mut h = Horse::new(format!("Horse {i}"), Gender::Colt, "bay", leg_types[i % leg_types.len()]);
            h.speed = (40.0 + (i as f64 * 7.0) % 60.0).into();
            h.stamina = (40.0 + (i as f64 * 11.0) % 60.0).into();
            h.agility = (40.0 + (i as f64 * 13.0) % 60.0).into();
            h.durability = (40.0 + (i as f64 * 17.0) % 60.0).into();
            h
        })
        .collect()
}

fn bench_full_field(c: &mut Criterion) {
    c.bench_function("race_executor_run_12_horses_10_furlongs", |b| {
        b.iter(|| {
            let race = Race::new(1, "Bench Stakes", "Downs", 10.0, Surface::Dirt);
            let executor = RaceExecutor::new(race, field_of(12), 1234);
            black_box(executor.run().unwrap())
        })
    });
}

criterion_group!(benches, bench_full_field);
criterion_main!(benches);
