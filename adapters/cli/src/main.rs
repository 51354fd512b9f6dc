#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Echo Radar pipeline headless.
//!
//! Builds a synthetic sphere-field scene, fires a configurable number
//! of pulses, and prints the selected targets plus density statistics.
//! Presentation only: all engine behaviour lives in the system crates.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use echo_radar_core::{CategoryMask, PulseSettings, SceneBounds, SurfaceId};
use echo_radar_scene::fixtures::{FixtureField, FixtureSphere};
use echo_radar_scene::{query, Scene};
use echo_radar_system_animation::AnimatorPool;
use echo_radar_system_density::DensityGrid;
use echo_radar_system_highlight::HighlightDispatcher;
use echo_radar_system_probe::{BatchScheduler, FanSampler};
use echo_radar_system_pulse::{dispatch_directly, PulseDriver};
use echo_radar_system_selection::TargetSelection;
use glam::{Quat, Vec3};

/// Headless Echo Radar demo run.
#[derive(Debug, Parser)]
#[command(name = "echo-radar", about = "Fires radar pulses into a synthetic scene")]
struct Args {
    /// Number of pulses to fire.
    #[arg(long, default_value_t = 3)]
    pulses: u32,

    /// External difficulty value in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    difficulty: f32,

    /// Base seed for every deterministic sampling stream.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Dispatch marker clusters for each selection instead of
    /// queueing delayed spawns.
    #[arg(long)]
    direct_highlight: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.difficulty),
        "difficulty must lie in [0, 1]"
    );

    let settings = PulseSettings::default();
    settings.validate().context("pulse settings")?;

    let bounds = SceneBounds::from_corners(Vec3::splat(-80.0), Vec3::splat(80.0));
    let (scene, field) = build_demo_scene(bounds);

    let mut density =
        DensityGrid::from_bounds(bounds, 2.0).context("density grid construction")?;
    let mut sampler = FanSampler::new(args.seed);
    let mut scheduler = BatchScheduler::new();
    let mut selection = TargetSelection::new(args.seed.wrapping_add(1));
    let mut dispatcher = HighlightDispatcher::new(args.seed.wrapping_add(2));
    let mut pool = AnimatorPool::new(16, 256);
    let mut driver = PulseDriver::new();

    for pulse_index in 0..args.pulses {
        let zones = query::zone_view(&scene);
        let mut selected = Vec::new();
        driver.run_pulse(
            Vec3::ZERO,
            Quat::IDENTITY,
            &settings,
            args.difficulty,
            &field,
            &mut sampler,
            &mut scheduler,
            &mut selection,
            &density,
            &zones,
            &mut selected,
        );

        println!("pulse {}: {} target(s)", pulse_index + 1, selected.len());
        for location in &selected {
            println!(
                "  zone {:>2}  d={:6.2}  speed={:5.2}  cone={:5.3}  at ({:6.2}, {:6.2}, {:6.2})",
                location.zone.get(),
                location.distance,
                location.travel_speed,
                location.cone_angle,
                location.point.x,
                location.point.y,
                location.point.z,
            );
        }

        if args.direct_highlight {
            let mut flights = Vec::new();
            dispatch_directly(
                &selected,
                &settings,
                &field,
                &mut scheduler,
                &mut dispatcher,
                &zones,
                &mut density,
                &mut pool,
                &mut flights,
            );

            let mut completions = Vec::new();
            while pool.free_count() < pool.slot_count() {
                pool.tick(Duration::from_millis(50), &mut completions);
            }
            let markers: usize = completions.iter().map(|flight| flight.points.len()).sum();
            println!("  {} flight(s) converged carrying {} marker(s)", flights.len(), markers);
        } else {
            let mut spawned = Vec::new();
            while driver.pending_spawns() > 0 {
                driver.tick(Duration::from_millis(100), &mut spawned);
            }
            for spawn in &spawned {
                println!(
                    "  spawn after {:5.2}s toward zone {}",
                    spawn.delay.as_secs_f32(),
                    spawn.location.zone.get(),
                );
            }
        }
    }

    println!(
        "density grid: {} marker(s) across {:?} cells",
        density.total(),
        density.dimensions(),
    );
    Ok(())
}

/// Three hidden zones of spheres at increasing depth.
fn build_demo_scene(bounds: SceneBounds) -> (Scene, FixtureField) {
    let mut scene = Scene::new(bounds);
    let mut field = FixtureField::new();

    let mut next_surface = 0u32;
    for (zone_index, depth) in [-18.0f32, -34.0, -50.0].into_iter().enumerate() {
        let zone = scene.add_zone();
        for spot in 0..4u32 {
            let surface = SurfaceId::new(next_surface);
            next_surface += 1;
            scene.bind_surface(surface, zone);
            field.add_sphere(FixtureSphere {
                center: Vec3::new(
                    (spot as f32 - 1.5) * 9.0,
                    zone_index as f32 * 4.0 - 4.0,
                    depth,
                ),
                radius: 2.5,
                surface,
                category: CategoryMask::ALL,
            });
        }
    }

    (scene, field)
}
