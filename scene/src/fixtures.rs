//! Synthetic intersection backend for tests and headless demos.
//!
//! [`FixtureField`] stands in for the engine-side intersection
//! service: a flat list of zone-tagged spheres answered by swept
//! ray/sphere tests. Each dispatched batch runs on its own worker
//! thread and fans the per-query work out with rayon, so callers
//! exercise the same poll/join lifecycle the production service
//! exposes. Production geometry intersection stays out of scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use echo_radar_core::{
    CategoryMask, IntersectionService, QueryHit, QueryJob, QueryOutcome, QueryProbe, SurfaceId,
};
use glam::Vec3;
use rayon::prelude::*;

/// One intersectable sphere inside a fixture field.
#[derive(Clone, Copy, Debug)]
pub struct FixtureSphere {
    /// Center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
    /// Surface identifier reported on hits.
    pub surface: SurfaceId,
    /// Categories the sphere belongs to.
    pub category: CategoryMask,
}

/// Sphere-field intersection service.
#[derive(Clone, Debug, Default)]
pub struct FixtureField {
    spheres: Vec<FixtureSphere>,
}

impl FixtureField {
    /// Creates an empty field that answers every query with a miss.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sphere to the field.
    pub fn add_sphere(&mut self, sphere: FixtureSphere) {
        self.spheres.push(sphere);
    }

    /// Number of spheres in the field.
    #[must_use]
    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }
}

/// Deferred batch result backed by a worker thread.
pub struct FixtureJob {
    finished: Arc<AtomicBool>,
    worker: Option<JoinHandle<Vec<QueryOutcome>>>,
}

impl QueryJob for FixtureJob {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn join(mut self: Box<Self>) -> Vec<QueryOutcome> {
        let worker = self.worker.take().expect("job joined twice");
        worker.join().expect("fixture worker panicked")
    }
}

impl IntersectionService for FixtureField {
    fn dispatch(&self, probes: Vec<QueryProbe>) -> Box<dyn QueryJob + Send> {
        let spheres = self.spheres.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let worker = std::thread::spawn(move || {
            let outcomes: Vec<QueryOutcome> = probes
                .par_iter()
                .map(|probe| cast_probe(probe, &spheres))
                .collect();
            flag.store(true, Ordering::Release);
            outcomes
        });

        Box::new(FixtureJob {
            finished,
            worker: Some(worker),
        })
    }
}

/// Sweeps one probe through the field, reporting the nearest contact.
fn cast_probe(probe: &QueryProbe, spheres: &[FixtureSphere]) -> QueryOutcome {
    let mut nearest: Option<QueryHit> = None;

    for sphere in spheres {
        if !probe.category_mask.intersects(sphere.category) {
            continue;
        }

        let Some(distance) = ray_sphere_distance(
            probe.origin,
            probe.direction,
            sphere.center,
            sphere.radius + probe.radius,
        ) else {
            continue;
        };

        if distance > probe.max_distance {
            continue;
        }

        let replace = nearest.map_or(true, |hit| distance < hit.distance);
        if replace {
            nearest = Some(QueryHit {
                point: probe.origin + probe.direction * distance,
                distance,
                surface: sphere.surface,
            });
        }
    }

    nearest.map_or(QueryOutcome::Miss, QueryOutcome::Hit)
}

/// Distance along the ray to the first sphere contact, if any.
fn ray_sphere_distance(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - origin;
    let projection = to_center.dot(direction);
    let closest_sq = to_center.length_squared() - projection * projection;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }

    let half_chord = (radius_sq - closest_sq).sqrt();
    let entry = projection - half_chord;
    if entry >= 0.0 {
        Some(entry)
    } else if projection + half_chord >= 0.0 {
        // Origin is inside the sphere; report the exit point.
        Some(projection + half_chord)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{FixtureField, FixtureSphere};
    use echo_radar_core::{CategoryMask, IntersectionService, QueryOutcome, QueryProbe, SurfaceId};
    use glam::Vec3;

    fn field_with_sphere(center: Vec3, radius: f32) -> FixtureField {
        let mut field = FixtureField::new();
        field.add_sphere(FixtureSphere {
            center,
            radius,
            surface: SurfaceId::new(1),
            category: CategoryMask::ALL,
        });
        field
    }

    fn forward_probe(max_distance: f32) -> QueryProbe {
        QueryProbe {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            max_distance,
            radius: 0.0,
            category_mask: CategoryMask::ALL,
        }
    }

    #[test]
    fn probe_hits_sphere_on_its_path() {
        let field = field_with_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let job = field.dispatch(vec![forward_probe(10.0)]);
        let outcomes = job.join();

        let hit = outcomes[0].hit().expect("probe crosses the sphere");
        assert!((hit.distance - 4.0).abs() < 1.0e-4);
        assert_eq!(hit.surface, SurfaceId::new(1));
    }

    #[test]
    fn probe_misses_beyond_max_distance() {
        let field = field_with_sphere(Vec3::new(0.0, 0.0, -50.0), 1.0);
        let job = field.dispatch(vec![forward_probe(10.0)]);
        assert_eq!(job.join(), vec![QueryOutcome::Miss]);
    }

    #[test]
    fn category_mask_filters_spheres() {
        let mut field = FixtureField::new();
        field.add_sphere(FixtureSphere {
            center: Vec3::new(0.0, 0.0, -5.0),
            radius: 1.0,
            surface: SurfaceId::new(1),
            category: CategoryMask::from_bits(0b10),
        });

        let mut probe = forward_probe(10.0);
        probe.category_mask = CategoryMask::from_bits(0b01);
        let job = field.dispatch(vec![probe]);
        assert_eq!(job.join(), vec![QueryOutcome::Miss]);
    }

    #[test]
    fn nearest_sphere_wins() {
        let mut field = field_with_sphere(Vec3::new(0.0, 0.0, -8.0), 1.0);
        field.add_sphere(FixtureSphere {
            center: Vec3::new(0.0, 0.0, -4.0),
            radius: 1.0,
            surface: SurfaceId::new(2),
            category: CategoryMask::ALL,
        });

        let job = field.dispatch(vec![forward_probe(20.0)]);
        let outcomes = job.join();
        let hit = outcomes[0].hit().expect("both spheres are on the path");
        assert_eq!(hit.surface, SurfaceId::new(2));
    }

    #[test]
    fn probe_radius_inflates_the_contact() {
        let field = field_with_sphere(Vec3::new(1.2, 0.0, -5.0), 1.0);

        let thin = field.dispatch(vec![forward_probe(10.0)]).join();
        assert_eq!(thin[0], QueryOutcome::Miss);

        let mut fat = forward_probe(10.0);
        fat.radius = 0.5;
        let outcomes = field.dispatch(vec![fat]).join();
        assert!(outcomes[0].hit().is_some(), "swept probe grazes the sphere");
    }

    #[test]
    fn batch_outcomes_keep_submission_order() {
        let field = field_with_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let probes = vec![
            forward_probe(10.0),
            QueryProbe {
                direction: Vec3::Z,
                ..forward_probe(10.0)
            },
            forward_probe(10.0),
        ];

        let job = field.dispatch(probes);
        while !job.is_finished() {
            std::thread::yield_now();
        }
        let outcomes = job.join();

        assert!(outcomes[0].hit().is_some());
        assert_eq!(outcomes[1], QueryOutcome::Miss);
        assert!(outcomes[2].hit().is_some());
    }
}
