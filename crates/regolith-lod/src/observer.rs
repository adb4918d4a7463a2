//! Observer placement on the terrain plane and region visibility queries.

use glam::{DVec2, DVec3};
use regolith_gen::RegionKey;
use rustc_hash::FxHashSet;

/// Position and facing of the viewer, projected onto the terrain plane.
///
/// Streaming decisions only care about horizontal placement; altitude changes
/// neither which regions are visible nor their priority.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObserverState {
    position: DVec2,
    forward: DVec2,
}

impl ObserverState {
    /// Builds an observer from planar position and facing. A zero-length
    /// facing is kept as zero and disables directional priority.
    #[must_use]
    pub fn new(position: DVec2, forward: DVec2) -> Self {
        Self {
            position,
            forward: forward.normalize_or_zero(),
        }
    }

    /// Projects a world-space camera pose onto the terrain plane.
    #[must_use]
    pub fn from_world(position: DVec3, forward: DVec3) -> Self {
        Self::new(
            DVec2::new(position.x, position.z),
            DVec2::new(forward.x, forward.z),
        )
    }

    #[must_use]
    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Unit facing on the plane, or zero when the camera looks straight
    /// up or down.
    #[must_use]
    pub fn forward(&self) -> DVec2 {
        self.forward
    }

    /// Distance from the observer to the center of `region`.
    #[must_use]
    pub fn distance_to(&self, region: RegionKey, region_width: f64, region_depth: f64) -> f64 {
        self.position.distance(region.center(region_width, region_depth))
    }

    /// How squarely `center` sits in front of the observer, in [-1, 1].
    /// Positive means ahead, negative behind, zero for a degenerate facing
    /// or a center the observer is standing on.
    #[must_use]
    pub fn ahead_factor(&self, center: DVec2) -> f64 {
        (center - self.position).normalize_or_zero().dot(self.forward)
    }

    /// All regions whose centers lie within `view_radius`, nearest first.
    /// Ties are broken by key so the order is deterministic.
    #[must_use]
    pub fn visible_regions(
        &self,
        view_radius: f64,
        region_width: f64,
        region_depth: f64,
    ) -> Vec<RegionKey> {
        let min_x = ((self.position.x - view_radius) / region_width).floor() as i32;
        let max_x = ((self.position.x + view_radius) / region_width).ceil() as i32;
        let min_z = ((self.position.y - view_radius) / region_depth).floor() as i32;
        let max_z = ((self.position.y + view_radius) / region_depth).ceil() as i32;

        let mut found: Vec<(f64, RegionKey)> = Vec::new();
        for z in min_z..=max_z {
            for x in min_x..=max_x {
                let key = RegionKey::new(x, z);
                let distance = self.distance_to(key, region_width, region_depth);
                if distance <= view_radius {
                    found.push((distance, key));
                }
            }
        }
        found.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.1.x, a.1.z).cmp(&(b.1.x, b.1.z)))
        });
        found.into_iter().map(|(_, key)| key).collect()
    }
}

/// The first `count` entries of a nearest-first region list, as a set for
/// priority lookups.
#[must_use]
pub fn nearest_set(visible: &[RegionKey], count: usize) -> FxHashSet<RegionKey> {
    visible.iter().take(count).copied().collect()
}
