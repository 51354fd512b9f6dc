use std::time::Duration;

use echo_radar_core::{CategoryMask, HighlightLocation, PulseSettings, SceneBounds, SurfaceId};
use echo_radar_scene::fixtures::{FixtureField, FixtureSphere};
use echo_radar_scene::{query, Scene};
use echo_radar_system_animation::AnimatorPool;
use echo_radar_system_density::DensityGrid;
use echo_radar_system_highlight::HighlightDispatcher;
use echo_radar_system_probe::{BatchScheduler, FanSampler};
use echo_radar_system_pulse::{dispatch_directly, PulseDriver};
use echo_radar_system_selection::TargetSelection;
use glam::{Quat, Vec3};

const FAN_SEED: u64 = 101;
const SPEED_SEED: u64 = 102;
const SAMPLING_SEED: u64 = 103;

struct Rig {
    scene: Scene,
    field: FixtureField,
    settings: PulseSettings,
    density: DensityGrid,
    sampler: FanSampler,
    scheduler: BatchScheduler,
    selection: TargetSelection,
    driver: PulseDriver,
}

/// Three hidden zones, each a small cluster of spheres at a distinct
/// depth in front of the radar origin.
fn build_rig() -> Rig {
    let bounds = SceneBounds::from_corners(Vec3::splat(-80.0), Vec3::splat(80.0));
    let mut scene = Scene::new(bounds);
    let mut field = FixtureField::new();

    let mut next_surface = 0u32;
    for (zone_index, depth) in [-18.0f32, -34.0, -50.0].into_iter().enumerate() {
        let zone = scene.add_zone();
        for spot in 0..3u32 {
            let surface = SurfaceId::new(next_surface);
            next_surface += 1;
            scene.bind_surface(surface, zone);
            field.add_sphere(FixtureSphere {
                center: Vec3::new(
                    (spot as f32 - 1.0) * 9.0,
                    zone_index as f32 * 3.0 - 3.0,
                    depth,
                ),
                radius: 2.5,
                surface,
                category: CategoryMask::ALL,
            });
        }
    }

    let settings = PulseSettings::default();
    let density = DensityGrid::from_bounds(bounds, 2.0).expect("grid construction");

    Rig {
        scene,
        field,
        settings,
        density,
        sampler: FanSampler::new(FAN_SEED),
        scheduler: BatchScheduler::new(),
        selection: TargetSelection::new(SPEED_SEED),
        driver: PulseDriver::new(),
    }
}

fn run_one_pulse(rig: &mut Rig) -> Vec<HighlightLocation> {
    let zones = query::zone_view(&rig.scene);
    let mut selected = Vec::new();
    rig.driver.run_pulse(
        Vec3::ZERO,
        Quat::IDENTITY,
        &rig.settings,
        0.5,
        &rig.field,
        &mut rig.sampler,
        &mut rig.scheduler,
        &mut rig.selection,
        &rig.density,
        &zones,
        &mut selected,
    );
    selected
}

#[test]
fn pulse_selects_separated_targets_in_hidden_zones() {
    let mut rig = build_rig();
    let selected = run_one_pulse(&mut rig);

    assert!(!selected.is_empty(), "the sphere clusters must be found");
    let cap = rig.settings.selection.max_selections_per_pulse;
    assert!(selected.len() <= cap as usize);

    let min_spacing_sq =
        rig.settings.selection.min_spacing * rig.settings.selection.min_spacing;
    let rate = rig
        .settings
        .selection
        .rate_curve
        .max_selections_per_second(0.5);
    let min_gap = 1.0 / rate;

    for (index, first) in selected.iter().enumerate() {
        assert!(!rig.scene.is_revealed(first.zone));
        for second in selected.iter().skip(index + 1) {
            assert!(first.point.distance_squared(second.point) >= min_spacing_sq);

            let first_arrival = first.distance / rig.settings.selection.propagation_speed
                + first.distance / first.travel_speed;
            let second_arrival = second.distance / rig.settings.selection.propagation_speed
                + second.distance / second.travel_speed;
            assert!((first_arrival - second_arrival).abs() >= min_gap);
        }
    }
}

#[test]
fn revealed_zones_drop_out_of_later_pulses() {
    let mut rig = build_rig();
    let selected = run_one_pulse(&mut rig);
    let revealed_zone = selected.first().expect("first pulse finds targets").zone;

    assert!(rig.scene.reveal(revealed_zone));
    let second = run_one_pulse(&mut rig);

    for location in &second {
        assert_ne!(location.zone, revealed_zone);
    }
}

#[test]
fn scripted_run_replays_identically() {
    let run = || {
        let mut rig = build_rig();
        let mut script = Vec::new();
        for _ in 0..3 {
            script.extend(run_one_pulse(&mut rig));
            let mut spawned = Vec::new();
            rig.driver.tick(Duration::from_secs(3), &mut spawned);
        }
        script
    };

    let first = run();
    let second = run();
    assert_eq!(first, second, "pulse script diverged between replays");
    assert_eq!(
        fingerprint(&first),
        fingerprint(&second),
        "fingerprint mismatch between replays"
    );
}

/// Quantises a selection script to millimetres and hashes it, so a
/// replay divergence shows up as a single comparable value.
fn fingerprint(script: &[HighlightLocation]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    for location in script {
        location.zone.hash(&mut hasher);
        for value in [
            location.point.x,
            location.point.y,
            location.point.z,
            location.distance,
            location.travel_speed,
            location.cone_angle,
        ] {
            to_millimetres(value).hash(&mut hasher);
        }
    }
    hasher.finish()
}

fn to_millimetres(value: f32) -> i64 {
    (value * 1_000.0).round() as i64
}

#[test]
fn queued_spawns_drain_as_the_wavefront_expands() {
    let mut rig = build_rig();
    let selected = run_one_pulse(&mut rig);
    assert_eq!(rig.driver.pending_spawns(), selected.len());

    let mut spawned = Vec::new();
    let mut ticks = 0;
    while rig.driver.pending_spawns() > 0 {
        rig.driver.tick(Duration::from_millis(100), &mut spawned);
        ticks += 1;
        assert!(ticks < 1_000, "spawns must drain in bounded time");
    }
    assert_eq!(spawned.len(), selected.len());

    // Spawn delays track distance over propagation speed.
    for spawn in &spawned {
        let expected =
            spawn.location.distance / rig.settings.selection.propagation_speed;
        assert!((spawn.delay.as_secs_f32() - expected).abs() < 1.0e-3);
    }
}

#[test]
fn direct_dispatch_animates_marker_clusters() {
    let mut rig = build_rig();
    let selected = run_one_pulse(&mut rig);
    assert!(!selected.is_empty());

    let zones = query::zone_view(&rig.scene);
    let mut dispatcher = HighlightDispatcher::new(SAMPLING_SEED);
    let mut pool = AnimatorPool::new(16, 256);
    let mut flights = Vec::new();

    dispatch_directly(
        &selected,
        &rig.settings,
        &rig.field,
        &mut rig.scheduler,
        &mut dispatcher,
        &zones,
        &mut rig.density,
        &mut pool,
        &mut flights,
    );

    assert!(!flights.is_empty(), "marker batches must reach the pool");
    assert!(rig.density.total() > 0, "survivors register into the grid");

    let mut completions = Vec::new();
    for _ in 0..200 {
        pool.tick(Duration::from_millis(100), &mut completions);
    }
    assert_eq!(completions.len(), flights.len());
    assert_eq!(pool.free_count(), pool.slot_count());
}
