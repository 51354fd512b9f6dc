#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns completed probe batches into highlight targets.
//!
//! Selection runs in three steps. Hits are first filtered to hidden
//! zones and scored: each candidate gets a travel speed sampled from
//! the configured range, a time-to-arrive, and a density score
//! bucketed into coarse bands so near-equal densities tie. Candidates
//! are then stably ordered by distance band, preserving original query
//! order within a band — probe fans submit center-out, so equally
//! distant hits near the aim center win ties. Finally a greedy scan
//! repeatedly claims the lowest-density candidate that is far enough,
//! in space and in arrival time, from everything already claimed.
//!
//! The repeated eligibility scan is O(n²) in candidates per pulse by
//! construction. Batch sizes are bounded, and the scan order is
//! load-bearing for visual behaviour; replacing it with an
//! asymptotically different structure would change tie-breaking.

use echo_radar_core::{
    HighlightLocation, PulseSettings, QueryOutcome, QueryProbe, ZoneId, ZoneView,
};
use echo_radar_system_density::DensityGrid;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Greedy spatiotemporal target selection with reusable scratch buffers.
#[derive(Debug)]
pub struct TargetSelection {
    rng: ChaCha8Rng,
    candidates: Vec<Candidate>,
    claimed: Vec<ClaimedMark>,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    query_index: usize,
    zone: ZoneId,
    point: Vec3,
    distance: f32,
    travel_speed: f32,
    time_to_arrive: f32,
    density_score: u32,
    distance_band: i64,
    taken: bool,
}

#[derive(Clone, Copy, Debug)]
struct ClaimedMark {
    point: Vec3,
    time_to_arrive: f32,
}

impl TargetSelection {
    /// Creates a selection system whose speed stream starts from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            candidates: Vec::new(),
            claimed: Vec::new(),
        }
    }

    /// Selects highlight targets from one completed probe batch.
    ///
    /// `probes` and `outcomes` must align by submission index. The
    /// output buffer is cleared before populating; an empty candidate
    /// set after filtering yields an empty output, not an error.
    #[allow(clippy::too_many_arguments)]
    pub fn handle(
        &mut self,
        probes: &[QueryProbe],
        outcomes: &[QueryOutcome],
        settings: &PulseSettings,
        difficulty: f32,
        density: &DensityGrid,
        zones: &ZoneView,
        out: &mut Vec<HighlightLocation>,
    ) {
        out.clear();
        debug_assert_eq!(
            probes.len(),
            outcomes.len(),
            "outcomes must align with their probes"
        );

        self.collect_candidates(probes, outcomes, settings, density, zones);
        if self.candidates.is_empty() {
            return;
        }

        // Stable sort keeps original query order within equal bands.
        self.candidates.sort_by_key(|candidate| candidate.distance_band);

        self.claim_greedily(probes, settings, difficulty, out);
    }

    fn collect_candidates(
        &mut self,
        probes: &[QueryProbe],
        outcomes: &[QueryOutcome],
        settings: &PulseSettings,
        density: &DensityGrid,
        zones: &ZoneView,
    ) {
        self.candidates.clear();

        let tuning = &settings.selection;
        let speed_min = tuning.travel_speed_min;
        let speed_max = tuning.travel_speed_max;

        for (query_index, outcome) in outcomes.iter().enumerate() {
            let Some(hit) = outcome.hit() else {
                continue;
            };
            let Some(zone) = zones.zone_for(hit.surface) else {
                continue;
            };
            if !zones.is_hidden(zone) {
                continue;
            }

            let travel_speed = self.rng.gen_range(speed_min..=speed_max);
            let time_to_arrive =
                hit.distance / tuning.propagation_speed + hit.distance / travel_speed;
            let density_score = density.density_around(hit.point) / tuning.density_band_width;
            let distance_band = (hit.distance / tuning.distance_band_width).round() as i64;

            debug_assert!(query_index < probes.len());
            self.candidates.push(Candidate {
                query_index,
                zone,
                point: hit.point,
                distance: hit.distance,
                travel_speed,
                time_to_arrive,
                density_score,
                distance_band,
                taken: false,
            });
        }
    }

    fn claim_greedily(
        &mut self,
        probes: &[QueryProbe],
        settings: &PulseSettings,
        difficulty: f32,
        out: &mut Vec<HighlightLocation>,
    ) {
        self.claimed.clear();

        let tuning = &settings.selection;
        let cap = tuning.max_selections_per_pulse;
        let min_spacing_sq = tuning.min_spacing * tuning.min_spacing;
        let rate = tuning.rate_curve.max_selections_per_second(difficulty);
        let min_arrival_gap = 1.0 / rate;

        loop {
            if cap >= 0 && out.len() >= cap as usize {
                break;
            }

            let mut best: Option<usize> = None;
            for (index, candidate) in self.candidates.iter().enumerate() {
                if candidate.taken {
                    continue;
                }
                if !eligible(candidate, &self.claimed, min_spacing_sq, min_arrival_gap) {
                    continue;
                }
                let improves = match best {
                    Some(current) => {
                        candidate.density_score < self.candidates[current].density_score
                    }
                    None => true,
                };
                if improves {
                    best = Some(index);
                }
            }

            let Some(index) = best else {
                break;
            };

            let candidate = &mut self.candidates[index];
            candidate.taken = true;
            self.claimed.push(ClaimedMark {
                point: candidate.point,
                time_to_arrive: candidate.time_to_arrive,
            });

            let probe = &probes[candidate.query_index];
            out.push(HighlightLocation {
                origin: probe.origin,
                direction: probe.direction,
                point: candidate.point,
                distance: candidate.distance,
                zone: candidate.zone,
                travel_speed: candidate.travel_speed,
                cone_angle: settings.falloff.cone_angle_at(candidate.distance),
                max_longitudinal_deviation: settings.falloff.max_longitudinal_deviation,
            });
        }
    }
}

/// A candidate is eligible while it keeps its distance from every
/// claimed mark, both in world space and in arrival time.
fn eligible(
    candidate: &Candidate,
    claimed: &[ClaimedMark],
    min_spacing_sq: f32,
    min_arrival_gap: f32,
) -> bool {
    for mark in claimed {
        if candidate.point.distance_squared(mark.point) < min_spacing_sq {
            return false;
        }
        if (candidate.time_to_arrive - mark.time_to_arrive).abs() < min_arrival_gap {
            return false;
        }
    }
    true
}
