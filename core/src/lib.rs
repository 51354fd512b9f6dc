#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Echo Radar engine.
//!
//! This crate defines the data surface that connects the authoritative
//! scene, the pure probing/selection/animation systems, and adapters.
//! Systems consume immutable snapshot views ([`ZoneView`],
//! [`SceneBounds`]) and batch query records, and communicate results
//! exclusively through value types ([`HighlightLocation`],
//! [`MarkerSpawn`]). The external intersection-testing service is
//! abstracted behind [`IntersectionService`] and [`QueryJob`]; the
//! engine never interprets ray/geometry math itself.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier assigned to a zone of scene geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(u32);

impl ZoneId {
    /// Creates a new zone identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a piece of intersectable surface geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u32);

impl SurfaceId {
    /// Creates a new surface identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier allocated by a scheduler for one submitted query batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u64);

impl BatchId {
    /// Creates a new batch identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Handle addressing one slot inside an animator pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(u32);

impl AnimatorId {
    /// Creates a new animator handle with the provided slot index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the slot index addressed by the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Bitmask restricting which surface categories a query may hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryMask(u32);

impl CategoryMask {
    /// Mask that matches every surface category.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask from raw category bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw category bits carried by the mask.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Reports whether the two masks share at least one category.
    #[must_use]
    pub const fn intersects(&self, other: CategoryMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// Axis-aligned bounding volume enclosing the intersectable scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneBounds {
    min: Vec3,
    max: Vec3,
}

impl SceneBounds {
    /// Creates a bounding volume from two opposite corners.
    ///
    /// Corners are normalised component-wise so that `min <= max` on
    /// every axis regardless of argument order.
    #[must_use]
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Corner with the smallest coordinate on every axis.
    #[must_use]
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    /// Corner with the largest coordinate on every axis.
    #[must_use]
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    /// Edge lengths of the volume along each axis.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

/// One directional spatial query delegated to the intersection service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryProbe {
    /// World-space point the query is cast from.
    pub origin: Vec3,
    /// Unit direction of the cast.
    pub direction: Vec3,
    /// Maximum distance the cast travels before reporting a miss.
    pub max_distance: f32,
    /// Radius of the swept probe volume.
    pub radius: f32,
    /// Surface categories the cast is allowed to hit.
    pub category_mask: CategoryMask,
}

/// Surface contact reported for a successful query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryHit {
    /// World-space contact point.
    pub point: Vec3,
    /// Distance from the query origin to the contact point.
    pub distance: f32,
    /// Surface the probe contacted.
    pub surface: SurfaceId,
}

/// Result of one query within a completed batch.
///
/// A batch's outcomes preserve submission index order, which the
/// selection system relies on for deterministic tie-breaking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryOutcome {
    /// The probe travelled its full distance without contact.
    Miss,
    /// The probe contacted a surface.
    Hit(QueryHit),
}

impl QueryOutcome {
    /// Returns the contact record when the query hit a surface.
    #[must_use]
    pub const fn hit(&self) -> Option<&QueryHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            Self::Miss => None,
        }
    }
}

/// Deferred result of one dispatched query batch.
///
/// Implementations run the batch's queries in parallel on workers
/// owned by the intersection service. `join` is the only blocking
/// call; callers may poll `is_finished` and defer the join to a later
/// tick instead.
pub trait QueryJob {
    /// Reports whether every query in the batch has produced a result.
    fn is_finished(&self) -> bool;

    /// Blocks until the batch finishes, yielding outcomes in
    /// submission index order.
    fn join(self: Box<Self>) -> Vec<QueryOutcome>;
}

/// External intersection-testing collaborator.
///
/// The engine submits whole batches and never inspects geometry
/// itself; a batch always runs to completion since no cancellation
/// primitive exists.
pub trait IntersectionService {
    /// Launches the provided queries and returns their deferred result.
    fn dispatch(&self, probes: Vec<QueryProbe>) -> Box<dyn QueryJob + Send>;
}

/// Curve mapping an external difficulty value to a selection rate.
///
/// Difficulty is clamped to `[0, 1]` and shaped by an exponent before
/// interpolating between the idle and peak rates, so designers can
/// bias how quickly the cadence ramps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionRateCurve {
    /// Selections per second granted at difficulty 0.
    pub idle_rate: f32,
    /// Selections per second granted at difficulty 1.
    pub peak_rate: f32,
    /// Exponent applied to difficulty before interpolation.
    pub shape: f32,
}

impl SelectionRateCurve {
    /// Evaluates the maximum selections per second for a difficulty.
    #[must_use]
    pub fn max_selections_per_second(&self, difficulty: f32) -> f32 {
        let clamped = difficulty.clamp(0.0, 1.0);
        let shaped = clamped.powf(self.shape);
        self.idle_rate + (self.peak_rate - self.idle_rate) * shaped
    }
}

impl Default for SelectionRateCurve {
    fn default() -> Self {
        Self {
            idle_rate: 1.0,
            peak_rate: 3.0,
            shape: 1.0,
        }
    }
}

/// Tuning for the primary probe fan cast by each pulse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeTuning {
    /// Horizontal half-angle of the query cone, in radians.
    pub horizontal_half_angle: f32,
    /// Vertical half-angle of the query cone, in radians.
    pub vertical_half_angle: f32,
    /// Number of angular grid columns sampled across the cone.
    pub columns: u32,
    /// Number of angular grid rows sampled across the cone.
    pub rows: u32,
    /// Maximum distance each probe travels.
    pub max_range: f32,
    /// Radius of the swept probe volume.
    pub probe_radius: f32,
    /// Surface categories probes are allowed to hit.
    pub category_mask: CategoryMask,
    /// Seed for the angular jitter stream.
    pub jitter_seed: u64,
}

impl Default for ProbeTuning {
    fn default() -> Self {
        Self {
            horizontal_half_angle: std::f32::consts::FRAC_PI_4,
            vertical_half_angle: std::f32::consts::FRAC_PI_4,
            columns: 21,
            rows: 21,
            max_range: 60.0,
            probe_radius: 0.05,
            category_mask: CategoryMask::ALL,
            jitter_seed: 0x5eed_0001,
        }
    }
}

/// Tuning for candidate scoring and greedy target selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionTuning {
    /// Minimum world-space distance between two selected targets.
    pub min_spacing: f32,
    /// Difficulty-driven cadence curve for selections per second.
    pub rate_curve: SelectionRateCurve,
    /// Cap on selections per pulse; a negative value means unlimited.
    pub max_selections_per_pulse: i32,
    /// Width of one distance band used to order candidates.
    pub distance_band_width: f32,
    /// Width of one density band; scores are bucketed by this divisor.
    pub density_band_width: u32,
    /// Speed at which the pulse wavefront expands, in units per second.
    pub propagation_speed: f32,
    /// Slowest travel speed sampled for a marker.
    pub travel_speed_min: f32,
    /// Fastest travel speed sampled for a marker.
    pub travel_speed_max: f32,
    /// Seed for the travel-speed sampling stream.
    pub speed_seed: u64,
}

impl Default for SelectionTuning {
    fn default() -> Self {
        Self {
            min_spacing: 4.0,
            rate_curve: SelectionRateCurve::default(),
            max_selections_per_pulse: 10,
            distance_band_width: 2.0,
            density_band_width: 4,
            propagation_speed: 30.0,
            travel_speed_min: 6.0,
            travel_speed_max: 10.0,
            speed_seed: 0x5eed_0002,
        }
    }
}

/// Tuning for the distance falloff of the marker-emission cone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FalloffTuning {
    /// Cone half-angle granted to a target at zero distance, in radians.
    pub base_cone_angle: f32,
    /// Rate at which the cone narrows per unit of distance.
    pub falloff_rate: f32,
    /// Exponent sharpening the narrowing curve.
    pub falloff_power: f32,
    /// Largest allowed offset of a secondary marker along the probe ray.
    pub max_longitudinal_deviation: f32,
}

impl FalloffTuning {
    /// Derives the marker-emission cone half-angle for a target distance.
    ///
    /// The cone shrinks monotonically as distance grows so far targets
    /// receive tighter marker clusters.
    #[must_use]
    pub fn cone_angle_at(&self, distance: f32) -> f32 {
        self.base_cone_angle / (self.falloff_rate * distance + 1.0).powf(self.falloff_power)
    }
}

impl Default for FalloffTuning {
    fn default() -> Self {
        Self {
            base_cone_angle: 0.35,
            falloff_rate: 0.08,
            falloff_power: 1.2,
            max_longitudinal_deviation: 1.5,
        }
    }
}

/// Tuning for the dense secondary batch cast around a selected target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightTuning {
    /// Number of marker queries cast per highlighted target.
    pub marker_count: u32,
    /// Extra range granted beyond the target distance.
    pub range_margin: f32,
    /// Radius of the swept marker probe volume.
    pub probe_radius: f32,
    /// Surface categories marker queries are allowed to hit.
    pub category_mask: CategoryMask,
    /// Seed for the disk-in-cone sampling stream.
    pub sampling_seed: u64,
}

impl Default for HighlightTuning {
    fn default() -> Self {
        Self {
            marker_count: 96,
            range_margin: 4.0,
            probe_radius: 0.02,
            category_mask: CategoryMask::ALL,
            sampling_seed: 0x5eed_0003,
        }
    }
}

/// Complete tuning surface for one pulse, immutable per pulse.
///
/// Externally loaded and edited; the engine copies the value at pulse
/// start and never mutates it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseSettings {
    /// Primary probe fan tuning.
    pub probe: ProbeTuning,
    /// Candidate scoring and greedy selection tuning.
    pub selection: SelectionTuning,
    /// Marker-emission cone falloff tuning.
    pub falloff: FalloffTuning,
    /// Secondary highlight batch tuning.
    pub highlight: HighlightTuning,
}

/// Reasons a settings value object cannot be used.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A field carries a value outside its usable range.
    #[error("invalid pulse settings: {0}")]
    Invalid(&'static str),
}

impl PulseSettings {
    /// Validates the tuning surface before it is handed to systems.
    ///
    /// Systems assume a validated settings value; feeding them a
    /// degenerate one is a caller bug.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.probe.columns == 0 || self.probe.rows == 0 {
            return Err(SettingsError::Invalid(
                "probe grid must have at least one sample",
            ));
        }
        if !(self.probe.max_range > 0.0) {
            return Err(SettingsError::Invalid("probe range must be positive"));
        }
        if !(self.selection.distance_band_width > 0.0) {
            return Err(SettingsError::Invalid(
                "distance band width must be positive",
            ));
        }
        if self.selection.density_band_width == 0 {
            return Err(SettingsError::Invalid("density band width must be positive"));
        }
        if !(self.selection.propagation_speed > 0.0) {
            return Err(SettingsError::Invalid("propagation speed must be positive"));
        }
        if !(self.selection.travel_speed_min > 0.0)
            || self.selection.travel_speed_max < self.selection.travel_speed_min
        {
            return Err(SettingsError::Invalid(
                "travel speed range is inverted or non-positive",
            ));
        }
        if !(self.selection.rate_curve.idle_rate > 0.0)
            || !(self.selection.rate_curve.peak_rate > 0.0)
        {
            return Err(SettingsError::Invalid("selection rates must be positive"));
        }
        if self.selection.min_spacing < 0.0 {
            return Err(SettingsError::Invalid("minimum spacing must not be negative"));
        }
        if self.highlight.marker_count == 0 {
            return Err(SettingsError::Invalid(
                "highlight batch must cast at least one query",
            ));
        }
        Ok(())
    }
}

/// Selected target enriched with derived visualisation parameters.
///
/// Immutable once produced; persists until consumed by a spawned
/// marker entity or a highlight dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightLocation {
    /// Origin of the probe that found the target.
    pub origin: Vec3,
    /// Unit direction of the originating probe ray.
    pub direction: Vec3,
    /// Surface point selected as the target.
    pub point: Vec3,
    /// Distance from the probe origin to the surface point.
    pub distance: f32,
    /// Zone that owns the surface point.
    pub zone: ZoneId,
    /// Travel speed chosen for markers migrating to this target.
    pub travel_speed: f32,
    /// Half-angle of the marker-emission cone, narrowed with distance.
    pub cone_angle: f32,
    /// Largest allowed offset of secondary markers along the probe ray.
    pub max_longitudinal_deviation: f32,
}

/// Data record handed to the external entity-spawning collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerSpawn {
    /// Target the spawned entity travels toward.
    pub location: HighlightLocation,
    /// Delay the spawn waited for after its pulse fired.
    pub delay: Duration,
}

/// Immutable description of one zone's reveal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneSnapshot {
    /// Identifier assigned to the zone.
    pub id: ZoneId,
    /// Whether the zone has been revealed to the player.
    pub revealed: bool,
}

/// Association between one surface and the zone that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneBinding {
    /// Surface covered by the binding.
    pub surface: SurfaceId,
    /// Zone that owns the surface.
    pub zone: ZoneId,
}

/// Read-only snapshot resolving surfaces to zones and reveal states.
#[derive(Clone, Debug, Default)]
pub struct ZoneView {
    zones: Vec<ZoneSnapshot>,
    bindings: Vec<ZoneBinding>,
}

impl ZoneView {
    /// Creates a view from zone snapshots and surface bindings.
    ///
    /// Both collections are sorted so lookups can binary search.
    #[must_use]
    pub fn from_parts(mut zones: Vec<ZoneSnapshot>, mut bindings: Vec<ZoneBinding>) -> Self {
        zones.sort_by_key(|snapshot| snapshot.id);
        bindings.sort_by_key(|binding| binding.surface);
        Self { zones, bindings }
    }

    /// Resolves the zone owning the provided surface, if any is bound.
    #[must_use]
    pub fn zone_for(&self, surface: SurfaceId) -> Option<ZoneId> {
        self.bindings
            .binary_search_by_key(&surface, |binding| binding.surface)
            .ok()
            .map(|index| self.bindings[index].zone)
    }

    /// Reports whether the zone exists and has not yet been revealed.
    ///
    /// Unknown zones report `false` so they never become candidates.
    #[must_use]
    pub fn is_hidden(&self, zone: ZoneId) -> bool {
        self.zones
            .binary_search_by_key(&zone, |snapshot| snapshot.id)
            .ok()
            .map_or(false, |index| !self.zones[index].revealed)
    }

    /// Iterator over the captured zone snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ZoneSnapshot> {
        self.zones.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CategoryMask, FalloffTuning, HighlightLocation, PulseSettings, SelectionRateCurve,
        SurfaceId, ZoneBinding, ZoneId, ZoneSnapshot, ZoneView,
    };
    use glam::Vec3;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn zone_id_round_trips_through_bincode() {
        assert_round_trip(&ZoneId::new(7));
    }

    #[test]
    fn pulse_settings_round_trip_through_bincode() {
        assert_round_trip(&PulseSettings::default());
    }

    #[test]
    fn highlight_location_round_trips_through_bincode() {
        let location = HighlightLocation {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            point: Vec3::new(0.0, 1.0, -8.0),
            distance: 8.06,
            zone: ZoneId::new(3),
            travel_speed: 7.5,
            cone_angle: 0.21,
            max_longitudinal_deviation: 1.5,
        };
        assert_round_trip(&location);
    }

    #[test]
    fn default_settings_validate() {
        PulseSettings::default()
            .validate()
            .expect("defaults are usable");
    }

    #[test]
    fn inverted_speed_range_is_rejected() {
        let mut settings = PulseSettings::default();
        settings.selection.travel_speed_max = settings.selection.travel_speed_min - 1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_density_band_is_rejected() {
        let mut settings = PulseSettings::default();
        settings.selection.density_band_width = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rate_curve_clamps_difficulty() {
        let curve = SelectionRateCurve {
            idle_rate: 1.0,
            peak_rate: 3.0,
            shape: 1.0,
        };
        assert!((curve.max_selections_per_second(-1.0) - 1.0).abs() < f32::EPSILON);
        assert!((curve.max_selections_per_second(2.0) - 3.0).abs() < f32::EPSILON);
        assert!((curve.max_selections_per_second(0.5) - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cone_angle_shrinks_with_distance() {
        let falloff = FalloffTuning::default();
        let near = falloff.cone_angle_at(1.0);
        let far = falloff.cone_angle_at(30.0);
        assert!(near < falloff.base_cone_angle);
        assert!(far < near);
        assert!(far > 0.0);
    }

    #[test]
    fn zone_view_resolves_bound_surfaces() {
        let view = ZoneView::from_parts(
            vec![
                ZoneSnapshot {
                    id: ZoneId::new(2),
                    revealed: true,
                },
                ZoneSnapshot {
                    id: ZoneId::new(1),
                    revealed: false,
                },
            ],
            vec![
                ZoneBinding {
                    surface: SurfaceId::new(20),
                    zone: ZoneId::new(2),
                },
                ZoneBinding {
                    surface: SurfaceId::new(10),
                    zone: ZoneId::new(1),
                },
            ],
        );

        assert_eq!(view.zone_for(SurfaceId::new(10)), Some(ZoneId::new(1)));
        assert_eq!(view.zone_for(SurfaceId::new(20)), Some(ZoneId::new(2)));
        assert_eq!(view.zone_for(SurfaceId::new(30)), None);
        assert!(view.is_hidden(ZoneId::new(1)));
        assert!(!view.is_hidden(ZoneId::new(2)));
        assert!(
            !view.is_hidden(ZoneId::new(99)),
            "unknown zones are never hidden"
        );
    }

    #[test]
    fn category_masks_intersect_on_shared_bits() {
        let walls = CategoryMask::from_bits(0b01);
        let props = CategoryMask::from_bits(0b10);
        assert!(!walls.intersects(props));
        assert!(CategoryMask::ALL.intersects(walls));
    }
}
