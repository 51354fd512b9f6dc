#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pool of reusable marker-flight animators.
//!
//! Each slot animates one batch of points migrating from a common
//! origin toward their targets. Points carry arrival-rate multipliers
//! derived at activation: the point with the largest displacement
//! defines rate 1.0 and every other point arrives proportionally
//! sooner, so a batch converges near-simultaneously regardless of
//! individual distances. Slots return to the free pool once their
//! duration elapses, emitting the finished point list through the
//! tick's output buffer.

use std::time::Duration;

use echo_radar_core::{AnimatorId, ZoneId};
use glam::Vec3;

/// Smooth ease-in/out interpolation over `[0, 1]`.
fn ease(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Finished flight handed back through [`AnimatorPool::tick`].
#[derive(Clone, Debug, PartialEq)]
pub struct FlightCompletion {
    /// Slot that finished animating.
    pub animator: AnimatorId,
    /// Zone the batch's markers belong to.
    pub zone: ZoneId,
    /// Final world-space marker positions.
    pub points: Vec<Vec3>,
}

#[derive(Debug)]
enum SlotState {
    Idle,
    Active(Flight),
}

#[derive(Debug)]
struct Flight {
    origin: Vec3,
    zone: ZoneId,
    displacements: Vec<Vec3>,
    rates: Vec<f32>,
    positions: Vec<Vec3>,
    elapsed: Duration,
    duration: Duration,
}

/// Arena of pre-allocated marker-flight slots addressed by handle.
#[derive(Debug)]
pub struct AnimatorPool {
    slots: Vec<SlotState>,
    point_capacity: usize,
}

impl AnimatorPool {
    /// Creates a pool of `slot_count` idle slots, each able to carry
    /// up to `point_capacity` points per flight.
    #[must_use]
    pub fn new(slot_count: usize, point_capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            slots.push(SlotState::Idle);
        }
        Self {
            slots,
            point_capacity,
        }
    }

    /// Total number of slots in the pool.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently idle.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, SlotState::Idle))
            .count()
    }

    /// Handle of the first idle slot, if any remains.
    #[must_use]
    pub fn acquire(&self) -> Option<AnimatorId> {
        self.slots.iter().position(|slot| matches!(slot, SlotState::Idle)).map(|index| {
            AnimatorId::new(index as u32)
        })
    }

    /// Reports whether the slot is currently animating a batch.
    #[must_use]
    pub fn is_active(&self, animator: AnimatorId) -> bool {
        matches!(self.slot(animator), SlotState::Active(_))
    }

    /// Current world-space positions of the slot's points.
    ///
    /// Idle slots expose an empty slice.
    #[must_use]
    pub fn positions(&self, animator: AnimatorId) -> &[Vec3] {
        match self.slot(animator) {
            SlotState::Active(flight) => &flight.positions,
            SlotState::Idle => &[],
        }
    }

    /// Seeds a slot with a batch of targets and starts its flight.
    ///
    /// All points start at `origin`; each point's displacement and
    /// arrival-rate multiplier are precomputed here.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already animating, if the handle does not
    /// address a slot, or if `targets` exceeds the point capacity.
    /// Reactivating a busy animator is a caller bug, not a condition
    /// to recover from.
    pub fn activate(
        &mut self,
        animator: AnimatorId,
        zone: ZoneId,
        origin: Vec3,
        targets: &[Vec3],
        duration: Duration,
    ) {
        assert!(
            targets.len() <= self.point_capacity,
            "flight exceeds the pool's point capacity"
        );

        let slot = self.slot_mut(animator);
        assert!(
            matches!(slot, SlotState::Idle),
            "animator slot is already active"
        );

        let displacements: Vec<Vec3> = targets.iter().map(|&target| target - origin).collect();
        let longest = displacements
            .iter()
            .map(|displacement| displacement.length())
            .fold(0.0f32, f32::max);
        let rates = displacements
            .iter()
            .map(|displacement| {
                let length = displacement.length();
                if length > f32::EPSILON {
                    longest / length
                } else {
                    1.0
                }
            })
            .collect();
        let positions = vec![origin; targets.len()];

        *slot = SlotState::Active(Flight {
            origin,
            zone,
            displacements,
            rates,
            positions,
            elapsed: Duration::ZERO,
            duration,
        });
    }

    /// Advances every active flight by `dt`.
    ///
    /// Finished flights emit a [`FlightCompletion`] carrying their
    /// final point list and return their slot to the free pool. The
    /// output buffer is appended to, not cleared, so one tick can
    /// gather completions across systems.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<FlightCompletion>) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let SlotState::Active(flight) = slot else {
                continue;
            };

            flight.elapsed = flight.elapsed.saturating_add(dt);
            let progress = if flight.duration.is_zero() {
                1.0
            } else {
                flight.elapsed.as_secs_f32() / flight.duration.as_secs_f32()
            };

            for (point, (displacement, rate)) in flight
                .positions
                .iter_mut()
                .zip(flight.displacements.iter().zip(flight.rates.iter()))
            {
                let curve = ease((progress * rate).clamp(0.0, 1.0));
                *point = flight.origin + *displacement * curve;
            }

            if flight.elapsed >= flight.duration {
                out.push(FlightCompletion {
                    animator: AnimatorId::new(index as u32),
                    zone: flight.zone,
                    points: std::mem::take(&mut flight.positions),
                });
                *slot = SlotState::Idle;
            }
        }
    }

    fn slot(&self, animator: AnimatorId) -> &SlotState {
        self.slots
            .get(animator.get() as usize)
            .expect("animator handle does not address a slot")
    }

    fn slot_mut(&mut self, animator: AnimatorId) -> &mut SlotState {
        self.slots
            .get_mut(animator.get() as usize)
            .expect("animator handle does not address a slot")
    }
}
