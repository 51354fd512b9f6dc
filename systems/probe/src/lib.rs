#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Probe fan generation and two-phase batch query scheduling.
//!
//! A pulse casts a fixed grid of directional probes spanning a
//! configured cone. Samples are jittered by up to half a grid step to
//! break up aliasing patterns and reordered center-out so that
//! early-exit limits downstream favour hits near the aim center. The
//! [`BatchScheduler`] submits one batch at a time to the external
//! intersection service and hands back a consumable ticket; polling
//! is non-blocking, completion blocks and frees the in-flight slot.

use echo_radar_core::{
    BatchId, IntersectionService, ProbeTuning, QueryJob, QueryOutcome, QueryProbe,
};
use glam::{EulerRot, Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generates jittered, center-out ordered probe fans.
///
/// The jitter stream advances across pulses, so a sampler seeded the
/// same way always reproduces the same sequence of fans.
#[derive(Debug)]
pub struct FanSampler {
    rng: ChaCha8Rng,
    scratch: Vec<FanSample>,
}

#[derive(Clone, Copy, Debug)]
struct FanSample {
    center_key: i64,
    yaw: f32,
    pitch: f32,
}

impl FanSampler {
    /// Creates a sampler whose jitter stream starts from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            scratch: Vec::new(),
        }
    }

    /// Fills `out` with one probe fan cast from `origin`.
    ///
    /// `orientation` rotates the fan's forward axis (`-Z`). The output
    /// order is the batch submission order: samples nearest the grid
    /// center come first, ties resolved by row-major grid order.
    pub fn generate(
        &mut self,
        origin: Vec3,
        orientation: Quat,
        tuning: &ProbeTuning,
        out: &mut Vec<QueryProbe>,
    ) {
        out.clear();
        self.scratch.clear();

        let columns = tuning.columns.max(1);
        let rows = tuning.rows.max(1);
        let half_step_yaw = half_step(tuning.horizontal_half_angle, columns);
        let half_step_pitch = half_step(tuning.vertical_half_angle, rows);

        for row in 0..rows {
            for column in 0..columns {
                let u = grid_offset(column, columns);
                let v = grid_offset(row, rows);
                let jitter_yaw = self.rng.gen_range(-half_step_yaw..=half_step_yaw);
                let jitter_pitch = self.rng.gen_range(-half_step_pitch..=half_step_pitch);

                // Doubled integer offsets from the grid center keep the
                // ordering key exact for even and odd grid sizes alike.
                let du = i64::from(2 * column) - i64::from(columns - 1);
                let dv = i64::from(2 * row) - i64::from(rows - 1);

                self.scratch.push(FanSample {
                    center_key: du * du + dv * dv,
                    yaw: u * tuning.horizontal_half_angle + jitter_yaw,
                    pitch: v * tuning.vertical_half_angle + jitter_pitch,
                });
            }
        }

        self.scratch.sort_by_key(|sample| sample.center_key);

        out.reserve(self.scratch.len());
        for sample in &self.scratch {
            let local =
                Quat::from_euler(EulerRot::YXZ, sample.yaw, sample.pitch, 0.0) * Vec3::NEG_Z;
            out.push(QueryProbe {
                origin,
                direction: (orientation * local).normalize(),
                max_distance: tuning.max_range,
                radius: tuning.probe_radius,
                category_mask: tuning.category_mask,
            });
        }
    }
}

fn grid_offset(index: u32, count: u32) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    (index as f32 / (count - 1) as f32) * 2.0 - 1.0
}

fn half_step(half_angle: f32, count: u32) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    half_angle / (count - 1) as f32
}

/// Consumable proof that a batch was submitted through a scheduler.
///
/// Completion takes the ticket by value, so a batch can only be
/// joined once.
#[derive(Debug)]
pub struct BatchTicket {
    id: BatchId,
}

impl BatchTicket {
    /// Identifier of the batch the ticket was issued for.
    #[must_use]
    pub const fn id(&self) -> BatchId {
        self.id
    }
}

struct InFlightBatch {
    id: BatchId,
    job: Box<dyn QueryJob + Send>,
}

/// Two-phase batch scheduler with a single in-flight slot.
///
/// Submitting while a batch is in flight, or presenting a ticket the
/// scheduler did not issue, is a caller bug and aborts loudly; the
/// single-in-flight invariant exists to keep batch results attributable.
#[derive(Default)]
pub struct BatchScheduler {
    in_flight: Option<InFlightBatch>,
    next_batch: u64,
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BatchScheduler")
            .field("in_flight", &self.in_flight.as_ref().map(|batch| batch.id))
            .field("next_batch", &self.next_batch)
            .finish()
    }
}

impl BatchScheduler {
    /// Creates a scheduler with an empty in-flight slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches `probes` to the intersection service as one batch.
    ///
    /// # Panics
    ///
    /// Panics if a previously submitted batch has not been completed.
    pub fn submit(
        &mut self,
        service: &impl IntersectionService,
        probes: Vec<QueryProbe>,
    ) -> BatchTicket {
        assert!(
            self.in_flight.is_none(),
            "a batch is already in flight on this scheduler"
        );

        let id = BatchId::new(self.next_batch);
        self.next_batch += 1;
        let job = service.dispatch(probes);
        self.in_flight = Some(InFlightBatch { id, job });
        BatchTicket { id }
    }

    /// Non-blocking check whether the ticket's batch has finished.
    ///
    /// # Panics
    ///
    /// Panics if the ticket does not belong to the in-flight batch.
    #[must_use]
    pub fn is_complete(&self, ticket: &BatchTicket) -> bool {
        let batch = self
            .in_flight
            .as_ref()
            .expect("no batch in flight on this scheduler");
        assert_eq!(
            batch.id, ticket.id,
            "ticket does not match the in-flight batch"
        );
        batch.job.is_finished()
    }

    /// Blocks until the ticket's batch finishes and frees the slot.
    ///
    /// Outcomes preserve submission index order.
    ///
    /// # Panics
    ///
    /// Panics if the ticket does not belong to the in-flight batch.
    pub fn complete(&mut self, ticket: BatchTicket) -> Vec<QueryOutcome> {
        let batch = self
            .in_flight
            .take()
            .expect("no batch in flight on this scheduler");
        assert_eq!(
            batch.id, ticket.id,
            "ticket does not match the in-flight batch"
        );
        batch.job.join()
    }

    /// Reports whether a batch currently occupies the in-flight slot.
    #[must_use]
    pub const fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}
