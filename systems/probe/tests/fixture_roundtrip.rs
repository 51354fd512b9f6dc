use echo_radar_core::{CategoryMask, ProbeTuning, SurfaceId};
use echo_radar_scene::fixtures::{FixtureField, FixtureSphere};
use echo_radar_system_probe::{BatchScheduler, FanSampler};
use glam::{Quat, Vec3};

fn sphere_wall() -> FixtureField {
    let mut field = FixtureField::new();
    // A loose wall of spheres in front of the radar origin.
    for row in 0..5u32 {
        for column in 0..5u32 {
            field.add_sphere(FixtureSphere {
                center: Vec3::new(
                    (column as f32 - 2.0) * 4.0,
                    (row as f32 - 2.0) * 4.0,
                    -25.0,
                ),
                radius: 2.0,
                surface: SurfaceId::new(row * 5 + column),
                category: CategoryMask::ALL,
            });
        }
    }
    field
}

#[test]
fn submitted_fan_completes_against_the_fixture_field() {
    let field = sphere_wall();
    let mut scheduler = BatchScheduler::new();
    let mut sampler = FanSampler::new(21);

    let mut probes = Vec::new();
    sampler.generate(Vec3::ZERO, Quat::IDENTITY, &ProbeTuning::default(), &mut probes);
    let submitted = probes.len();

    let ticket = scheduler.submit(&field, probes);

    // The worker may still be running; polling must never block.
    while !scheduler.is_complete(&ticket) {
        std::thread::yield_now();
    }

    let outcomes = scheduler.complete(ticket);
    assert_eq!(outcomes.len(), submitted);

    let hits = outcomes.iter().filter(|outcome| outcome.hit().is_some()).count();
    assert!(hits > 0, "a forward fan must contact the sphere wall");
    assert!(!scheduler.has_in_flight());
}

#[test]
fn scheduler_round_trips_consecutive_pulses() {
    let field = sphere_wall();
    let mut scheduler = BatchScheduler::new();
    let mut sampler = FanSampler::new(21);

    for _ in 0..3 {
        let mut probes = Vec::new();
        sampler.generate(Vec3::ZERO, Quat::IDENTITY, &ProbeTuning::default(), &mut probes);
        let ticket = scheduler.submit(&field, probes);
        let outcomes = scheduler.complete(ticket);
        assert_eq!(outcomes.len(), 441);
    }
}

#[test]
fn equal_seeds_reproduce_hit_patterns() {
    let field = sphere_wall();

    let run = |seed: u64| {
        let mut scheduler = BatchScheduler::new();
        let mut sampler = FanSampler::new(seed);
        let mut probes = Vec::new();
        sampler.generate(Vec3::ZERO, Quat::IDENTITY, &ProbeTuning::default(), &mut probes);
        let ticket = scheduler.submit(&field, probes);
        scheduler.complete(ticket)
    };

    assert_eq!(run(5), run(5), "hit pattern diverged between replays");
}
