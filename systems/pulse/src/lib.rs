#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! End-to-end pulse sequencing.
//!
//! The driver runs one pulse at a time: generate the probe fan,
//! submit and complete the batch, select highlight targets, and queue
//! one delayed marker spawn per target. Spawn delays grow with target
//! distance so the visual wavefront matches the pulse's propagation
//! speed. Ticking the driver drains spawns as they fall due.

use std::time::Duration;

use echo_radar_core::{
    AnimatorId, HighlightLocation, IntersectionService, MarkerSpawn, PulseSettings, QueryProbe,
    ZoneView,
};
use echo_radar_system_animation::AnimatorPool;
use echo_radar_system_density::DensityGrid;
use echo_radar_system_highlight::HighlightDispatcher;
use echo_radar_system_probe::{BatchScheduler, FanSampler};
use echo_radar_system_selection::TargetSelection;
use glam::{Quat, Vec3};

#[derive(Clone, Copy, Debug)]
struct ScheduledSpawn {
    due: Duration,
    delay: Duration,
    location: HighlightLocation,
}

/// Thin sequencer driving probe, selection, and spawn scheduling.
#[derive(Debug, Default)]
pub struct PulseDriver {
    clock: Duration,
    queue: Vec<ScheduledSpawn>,
    probes: Vec<QueryProbe>,
}

impl PulseDriver {
    /// Creates a driver with an empty spawn queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one pulse end-to-end and queues its marker spawns.
    ///
    /// The selected targets are also left in `out_selected` so callers
    /// can feed a debug highlight path or telemetry. Each target's
    /// spawn falls due after `distance / propagation_speed` seconds of
    /// driver time.
    #[allow(clippy::too_many_arguments)]
    pub fn run_pulse(
        &mut self,
        origin: Vec3,
        orientation: Quat,
        settings: &PulseSettings,
        difficulty: f32,
        service: &impl IntersectionService,
        sampler: &mut FanSampler,
        scheduler: &mut BatchScheduler,
        selection: &mut TargetSelection,
        density: &DensityGrid,
        zones: &ZoneView,
        out_selected: &mut Vec<HighlightLocation>,
    ) {
        sampler.generate(origin, orientation, &settings.probe, &mut self.probes);
        let ticket = scheduler.submit(service, self.probes.clone());
        let outcomes = scheduler.complete(ticket);

        selection.handle(
            &self.probes,
            &outcomes,
            settings,
            difficulty,
            density,
            zones,
            out_selected,
        );

        for location in out_selected.iter() {
            let delay =
                Duration::from_secs_f32(location.distance / settings.selection.propagation_speed);
            self.queue.push(ScheduledSpawn {
                due: self.clock.saturating_add(delay),
                delay,
                location: *location,
            });
        }
    }

    /// Advances driver time and emits spawns that fell due.
    ///
    /// Within one tick, spawns emit in the order they were queued.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<MarkerSpawn>) {
        self.clock = self.clock.saturating_add(dt);
        let clock = self.clock;

        for spawn in self.queue.iter().filter(|spawn| spawn.due <= clock) {
            out.push(MarkerSpawn {
                location: spawn.location,
                delay: spawn.delay,
            });
        }
        self.queue.retain(|spawn| spawn.due > clock);
    }

    /// Number of spawns still waiting for their due time.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.queue.len()
    }
}

/// Debug path: routes selected targets straight into the highlight
/// dispatcher instead of waiting for spawned marker entities.
///
/// Each target's batch is begun and resolved back to back on the
/// provided scheduler; activated flight handles land in `out_flights`.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_directly(
    selected: &[HighlightLocation],
    settings: &PulseSettings,
    service: &impl IntersectionService,
    scheduler: &mut BatchScheduler,
    dispatcher: &mut HighlightDispatcher,
    zones: &ZoneView,
    density: &mut DensityGrid,
    pool: &mut AnimatorPool,
    out_flights: &mut Vec<AnimatorId>,
) {
    for location in selected {
        dispatcher.begin(*location, &settings.highlight, scheduler, service);
        dispatcher.resolve(scheduler, zones, density, pool, out_flights);
    }
}
