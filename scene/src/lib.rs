#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative scene state for the Echo Radar engine.
//!
//! The scene owns the zone registry (hidden/revealed flags), the
//! surface-to-zone bindings, and the bounding volume that sizes the
//! density grid. Systems never touch this state directly; they consume
//! immutable views produced by the [`query`] module.

use std::collections::BTreeMap;

use echo_radar_core::{SceneBounds, SurfaceId, ZoneId};
use glam::Vec3;

#[cfg(feature = "scene_fixtures")]
pub mod fixtures;

/// Authoritative zone state stored inside the scene.
#[derive(Clone, Copy, Debug)]
struct ZoneState {
    revealed: bool,
}

/// Mutable scene state: zones, surface bindings, and bounds.
#[derive(Debug)]
pub struct Scene {
    bounds: SceneBounds,
    zones: BTreeMap<ZoneId, ZoneState>,
    bindings: BTreeMap<SurfaceId, ZoneId>,
    next_zone_id: u32,
}

impl Scene {
    /// Creates an empty scene covering the provided bounding volume.
    #[must_use]
    pub fn new(bounds: SceneBounds) -> Self {
        Self {
            bounds,
            zones: BTreeMap::new(),
            bindings: BTreeMap::new(),
            next_zone_id: 0,
        }
    }

    /// Registers a new hidden zone and returns its identifier.
    pub fn add_zone(&mut self) -> ZoneId {
        let id = ZoneId::new(self.next_zone_id);
        self.next_zone_id += 1;
        let _ = self.zones.insert(id, ZoneState { revealed: false });
        id
    }

    /// Associates a surface with the zone that owns it.
    ///
    /// Rebinding a surface replaces its previous owner.
    ///
    /// # Panics
    ///
    /// Panics if the zone was never registered; binding surfaces to
    /// unknown zones is a caller bug.
    pub fn bind_surface(&mut self, surface: SurfaceId, zone: ZoneId) {
        assert!(
            self.zones.contains_key(&zone),
            "surface bound to unregistered zone"
        );
        let _ = self.bindings.insert(surface, zone);
    }

    /// Marks a zone as revealed, removing it from the candidate pool.
    ///
    /// Returns `true` when the call changed the zone from hidden to
    /// revealed; revealing an already-revealed or unknown zone is a
    /// no-op that returns `false`.
    pub fn reveal(&mut self, zone: ZoneId) -> bool {
        match self.zones.get_mut(&zone) {
            Some(state) if !state.revealed => {
                state.revealed = true;
                true
            }
            _ => false,
        }
    }

    /// Reports whether the zone exists and has been revealed.
    #[must_use]
    pub fn is_revealed(&self, zone: ZoneId) -> bool {
        self.zones.get(&zone).map_or(false, |state| state.revealed)
    }

    /// Number of zones still hidden from the player.
    #[must_use]
    pub fn hidden_zone_count(&self) -> usize {
        self.zones.values().filter(|state| !state.revealed).count()
    }
}

/// Read-only queries over scene state, yielding immutable views.
pub mod query {
    use echo_radar_core::{SceneBounds, ZoneBinding, ZoneSnapshot, ZoneView};

    use super::Scene;

    /// Captures the scene's bounding volume.
    #[must_use]
    pub fn bounds(scene: &Scene) -> SceneBounds {
        scene.bounds
    }

    /// Captures a zone view resolving surfaces and reveal states.
    #[must_use]
    pub fn zone_view(scene: &Scene) -> ZoneView {
        let zones = scene
            .zones
            .iter()
            .map(|(id, state)| ZoneSnapshot {
                id: *id,
                revealed: state.revealed,
            })
            .collect();
        let bindings = scene
            .bindings
            .iter()
            .map(|(surface, zone)| ZoneBinding {
                surface: *surface,
                zone: *zone,
            })
            .collect();
        ZoneView::from_parts(zones, bindings)
    }
}

/// Reports whether a point lies inside the scene bounds.
#[must_use]
pub fn contains_point(bounds: &SceneBounds, point: Vec3) -> bool {
    let min = bounds.min();
    let max = bounds.max();
    point.x >= min.x
        && point.y >= min.y
        && point.z >= min.z
        && point.x <= max.x
        && point.y <= max.y
        && point.z <= max.z
}
