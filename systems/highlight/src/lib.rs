#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Dense secondary probing around a selected highlight target.
//!
//! For one chosen [`HighlightLocation`] the dispatcher casts a second,
//! denser query batch distributed over a cone: apex at the original
//! probe origin, axis along the original probe direction, half-angle
//! equal to the target's derived marker-emission cone. The flow is
//! explicitly two-phase — `begin` submits, `resolve` completes — so
//! callers can schedule a per-tick delay between the phases instead
//! of blocking inside one call.
//!
//! Resolved hits are kept only when they stay within the configured
//! longitudinal deviation of the surface point and still belong to
//! the intended, hidden zone. Survivors are partitioned by owning
//! zone, registered into the density grid, and handed per group to a
//! free animator slot.

use echo_radar_core::{
    AnimatorId, HighlightLocation, HighlightTuning, IntersectionService, QueryProbe, ZoneId,
    ZoneView,
};
use echo_radar_system_animation::AnimatorPool;
use echo_radar_system_density::DensityGrid;
use echo_radar_system_probe::{BatchScheduler, BatchTicket};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Two-phase dispatcher for marker-cluster query batches.
#[derive(Debug)]
pub struct HighlightDispatcher {
    rng: ChaCha8Rng,
    pending: Option<PendingHighlight>,
    groups: Vec<ZoneGroup>,
}

#[derive(Debug)]
struct PendingHighlight {
    ticket: BatchTicket,
    location: HighlightLocation,
}

#[derive(Debug)]
struct ZoneGroup {
    zone: ZoneId,
    points: Vec<Vec3>,
}

impl HighlightDispatcher {
    /// Creates a dispatcher whose sampling stream starts from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending: None,
            groups: Vec::new(),
        }
    }

    /// Reports whether a highlight batch is awaiting resolution.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking check whether the pending batch has finished.
    #[must_use]
    pub fn is_ready(&self, scheduler: &BatchScheduler) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |pending| scheduler.is_complete(&pending.ticket))
    }

    /// Submits the dense marker batch for `location`.
    ///
    /// Directions follow a uniform-disk-in-cone pattern around the
    /// original probe ray, so markers cluster evenly over the target's
    /// emission cone.
    ///
    /// # Panics
    ///
    /// Panics if a previous highlight batch has not been resolved.
    pub fn begin(
        &mut self,
        location: HighlightLocation,
        tuning: &HighlightTuning,
        scheduler: &mut BatchScheduler,
        service: &impl IntersectionService,
    ) {
        assert!(
            self.pending.is_none(),
            "a highlight batch is already pending"
        );

        let axis = location.direction;
        let (tangent, bitangent) = axis.any_orthonormal_pair();
        let spread = location.cone_angle.tan();
        let max_distance = location.distance + tuning.range_margin;

        let mut probes = Vec::with_capacity(tuning.marker_count as usize);
        for _ in 0..tuning.marker_count {
            let radial = self.rng.gen::<f32>().sqrt() * spread;
            let theta = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let offset = (tangent * theta.cos() + bitangent * theta.sin()) * radial;
            probes.push(QueryProbe {
                origin: location.origin,
                direction: (axis + offset).normalize(),
                max_distance,
                radius: tuning.probe_radius,
                category_mask: tuning.category_mask,
            });
        }

        let ticket = scheduler.submit(service, probes);
        self.pending = Some(PendingHighlight { ticket, location });
    }

    /// Completes the pending batch, filters and groups its hits, and
    /// activates one animator flight per surviving zone group.
    ///
    /// Handles of activated slots are appended to `out_flights`. Zone
    /// groups that find the pool exhausted are dropped after density
    /// registration; a shortage of animators shortens the effect, it
    /// does not fault.
    ///
    /// # Panics
    ///
    /// Panics if no highlight batch is pending.
    pub fn resolve(
        &mut self,
        scheduler: &mut BatchScheduler,
        zones: &ZoneView,
        density: &mut DensityGrid,
        pool: &mut AnimatorPool,
        out_flights: &mut Vec<AnimatorId>,
    ) {
        let pending = self
            .pending
            .take()
            .expect("no highlight batch is pending");
        let outcomes = scheduler.complete(pending.ticket);
        let location = pending.location;

        self.groups.clear();
        for outcome in &outcomes {
            let Some(hit) = outcome.hit() else {
                continue;
            };

            let projection = (hit.point - location.point).dot(location.direction);
            if projection.abs() > location.max_longitudinal_deviation {
                continue;
            }

            let Some(zone) = zones.zone_for(hit.surface) else {
                continue;
            };
            if zone != location.zone || !zones.is_hidden(zone) {
                continue;
            }

            match self.groups.iter().position(|group| group.zone == zone) {
                Some(index) => self.groups[index].points.push(hit.point),
                None => self.groups.push(ZoneGroup {
                    zone,
                    points: vec![hit.point],
                }),
            }
        }

        let duration = Duration::from_secs_f32(location.distance / location.travel_speed);
        for group in &self.groups {
            for &point in &group.points {
                density.register(point);
            }

            let Some(animator) = pool.acquire() else {
                continue;
            };
            pool.activate(animator, group.zone, location.origin, &group.points, duration);
            out_flights.push(animator);
        }
    }
}
