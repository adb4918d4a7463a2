//! Impact crater overlay.
//!
//! Craters are scattered per region cell with a Poisson count and a power-law
//! size distribution, then applied to the terrain as an additive height
//! offset: a smooth bowl inside the wobbled radius, a raised rim ring
//! outside it, and exactly zero beyond the outer rim. A crater spawned in
//! one cell can overhang its neighbors, so field construction scans the
//! 3x3 cell neighborhood and keeps every crater whose ring can reach the
//! target region.

use std::f64::consts::PI;

use glam::DVec2;
use noise::{NoiseFn, Simplex};
use rand::Rng;

use crate::args::{CraterParams, RegionKey};
use crate::power_law::{poisson_count, sample_power_law};
use crate::seed::{CRATER_PURPOSE, det_atan2, det_cos, det_sin, det_sqrt, region_rng};

const WOBBLE_SEED_OFFSET: u64 = 505;
const WOBBLE_OCTAVES: u32 = 3;
const WOBBLE_BASE_FREQUENCY: f64 = 1.5;

/// One impact crater with all derived quantities precomputed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crater {
    pub center: DVec2,
    pub radius: f64,
    pub depth: f64,
    pub rim_height: f64,
    pub rim_outer_radius: f64,
    pub floor_flatness: f64,
    pub wobble_amplitude: f64,
    /// Noise-space offset giving each crater its own rim outline.
    pub wobble_seed: f64,
}

/// All craters that can affect one region, ready for per-vertex lookup.
pub struct CraterField {
    craters: Vec<Crater>,
    wobble: Simplex,
}

impl CraterField {
    /// Scatter craters for `region`, scanning the 3x3 neighborhood so rims
    /// overhanging from adjacent cells are included.
    ///
    /// Every draw depends only on the world seed and the spawning cell, so
    /// two regions that both see a boundary-straddling crater reconstruct
    /// it bit-identically.
    pub fn generate_for_region(
        seed: u64,
        region: RegionKey,
        params: &CraterParams,
        region_width: f64,
        region_depth: f64,
    ) -> Self {
        let expected = params.density_per_km2 * (region_width * region_depth) / 1.0e6;
        let reach = |c: &Crater| c.rim_outer_radius * (1.0 + c.wobble_amplitude);
        let half = DVec2::new(region_width, region_depth) * 0.5;
        let region_center = region.center(region_width, region_depth);

        let mut craters = Vec::new();
        for dz in -1..=1 {
            for dx in -1..=1 {
                let cell = RegionKey::new(region.x + dx, region.z + dz);
                let mut rng = region_rng(seed, cell, CRATER_PURPOSE);
                let count = poisson_count(&mut rng, expected);
                for _ in 0..count {
                    // Draw order is part of the format; changing it changes
                    // every world.
                    let cx = (cell.x as f64 + rng.random::<f64>() - 0.5) * region_width;
                    let cz = (cell.z as f64 + rng.random::<f64>() - 0.5) * region_depth;
                    let radius = sample_power_law(
                        &mut rng,
                        params.min_radius,
                        params.max_radius,
                        params.size_exponent,
                    );
                    let wobble_amplitude =
                        params.wobble_amplitude * (0.5 + rng.random::<f64>());
                    let wobble_seed = rng.random::<f64>() * 1000.0;

                    let depth = radius * params.depth_ratio * 2.0;
                    let crater = Crater {
                        center: DVec2::new(cx, cz),
                        radius,
                        depth,
                        rim_height: depth * params.rim_height_fraction,
                        rim_outer_radius: radius * (1.0 + params.rim_width_fraction),
                        floor_flatness: params.floor_flatness,
                        wobble_amplitude,
                        wobble_seed,
                    };

                    // Keep the crater only if its widest possible ring can
                    // touch the region rectangle.
                    let nearest = crater.center.clamp(region_center - half, region_center + half);
                    if crater.center.distance_squared(nearest) <= reach(&crater) * reach(&crater) {
                        craters.push(crater);
                    }
                }
            }
        }

        Self::from_craters(seed, craters)
    }

    /// Build a field from an explicit crater list.
    ///
    /// The rim wobble noise derives from the world seed alone, never from a
    /// region, so a crater produces the same outline wherever it is seen.
    pub fn from_craters(seed: u64, craters: Vec<Crater>) -> Self {
        Self {
            craters,
            wobble: Simplex::new(seed.wrapping_add(WOBBLE_SEED_OFFSET) as u32),
        }
    }

    pub fn craters(&self) -> &[Crater] {
        &self.craters
    }

    /// Combined crater height offset at a world-plane point.
    ///
    /// Overlapping craters do not stack: the deepest bowl wins outright, and
    /// rims only contribute their maximum where no bowl reaches.
    pub fn height_offset(&self, x: f64, z: f64) -> f64 {
        let mut deepest = 0.0_f64;
        let mut highest_rim = 0.0_f64;

        for crater in &self.craters {
            let delta = DVec2::new(x, z) - crater.center;
            let dist_sq = delta.length_squared();
            let reach = crater.rim_outer_radius * (1.0 + crater.wobble_amplitude);
            if dist_sq > reach * reach {
                continue;
            }

            let angle = det_atan2(delta.y, delta.x);
            let offset = self.profile(crater, det_sqrt(dist_sq), angle);
            if offset < deepest {
                deepest = offset;
            } else if offset > highest_rim {
                highest_rim = offset;
            }
        }

        if deepest < 0.0 { deepest } else { highest_rim }
    }

    /// Radial crater profile at a given distance and bearing from its center.
    ///
    /// `0` at the wobbled radius, `-depth` at a flat floor, `0` again at the
    /// wobbled outer rim and beyond. Continuous everywhere in between.
    pub fn profile(&self, crater: &Crater, dist: f64, angle: f64) -> f64 {
        let wobble = 1.0 + crater.wobble_amplitude * self.rim_wobble(crater, angle);
        let radius = crater.radius * wobble;
        let rim_outer = crater.rim_outer_radius * wobble;

        if dist >= rim_outer {
            return 0.0;
        }

        if dist < radius {
            let flat = radius * crater.floor_flatness;
            let span = (radius - flat).max(f64::EPSILON);
            let t = if dist <= flat { 0.0 } else { (dist - flat) / span };
            -crater.depth * (1.0 - t * t)
        } else {
            let t = (dist - radius) / (rim_outer - radius).max(f64::EPSILON);
            crater.rim_height * det_sin(PI * t)
        }
    }

    /// Rim outline wobble in `[-1, 1]`, periodic in the bearing angle.
    ///
    /// Sampling the noise on a circle makes the outline close on itself, so
    /// the profile has no seam at angle zero.
    fn rim_wobble(&self, crater: &Crater, angle: f64) -> f64 {
        let (sin, cos) = (det_sin(angle), det_cos(angle));
        let mut total = 0.0;
        let mut frequency = WOBBLE_BASE_FREQUENCY;
        let mut amplitude = 1.0;
        let mut norm = 0.0;
        for _ in 0..WOBBLE_OCTAVES {
            total += self
                .wobble
                .get([cos * frequency + crater.wobble_seed, sin * frequency])
                * amplitude;
            norm += amplitude;
            frequency *= 2.0;
            amplitude *= 0.5;
        }
        total / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_crater(radius: f64, depth: f64, rim_outer: f64) -> Crater {
        Crater {
            center: DVec2::ZERO,
            radius,
            depth,
            rim_height: depth * 0.35,
            rim_outer_radius: rim_outer,
            floor_flatness: 0.0,
            wobble_amplitude: 0.0,
            wobble_seed: 0.0,
        }
    }

    #[test]
    fn test_generation_deterministic() {
        let params = CraterParams::default();
        let a = CraterField::generate_for_region(42, RegionKey::new(3, -2), &params, 256.0, 256.0);
        let b = CraterField::generate_for_region(42, RegionKey::new(3, -2), &params, 256.0, 256.0);
        assert_eq!(a.craters, b.craters, "same seed and region must reproduce");
        assert!(!a.craters.is_empty(), "default density should place craters");
    }

    #[test]
    fn test_reference_profile_shape() {
        // radius 10, depth 2, rim out to 12: floor at -2, raised rim at 11,
        // untouched terrain at 15.
        let field = CraterField::from_craters(42, vec![test_crater(10.0, 2.0, 12.0)]);
        let c = &field.craters()[0];
        assert_eq!(field.profile(c, 0.0, 0.0), -2.0, "center must sit at -depth");
        assert!(field.profile(c, 11.0, 0.0) > 0.0, "rim midpoint must be raised");
        assert_eq!(field.profile(c, 15.0, 0.0), 0.0, "beyond the rim is untouched");
    }

    #[test]
    fn test_profile_continuous_at_radius_and_rim() {
        let field = CraterField::from_craters(42, vec![test_crater(10.0, 2.0, 12.0)]);
        let c = &field.craters()[0];
        let eps = 1.0e-6;
        assert!(
            field.profile(c, 10.0 - eps, 0.3).abs() < 1.0e-4,
            "bowl must meet zero at the radius"
        );
        assert!(
            field.profile(c, 10.0 + eps, 0.3).abs() < 1.0e-4,
            "rim must rise from zero at the radius"
        );
        assert!(
            field.profile(c, 12.0 - eps, 0.3).abs() < 1.0e-4,
            "rim must return to zero at the outer radius"
        );
    }

    #[test]
    fn test_profile_continuous_with_wobble() {
        let mut crater = test_crater(10.0, 2.0, 12.0);
        crater.wobble_amplitude = 0.06;
        crater.wobble_seed = 77.7;
        let field = CraterField::from_craters(42, vec![crater]);
        let c = &field.craters()[0];
        // Walk outward at a fixed bearing; the wobbled radii are constant
        // along the ray so the profile must stay smooth.
        let mut prev = field.profile(c, 0.0, 1.1);
        for i in 1..=2_600 {
            let dist = i as f64 * 0.005;
            let h = field.profile(c, dist, 1.1);
            assert!(
                (h - prev).abs() < 0.05,
                "profile jumped at dist {dist}: {prev} -> {h}"
            );
            prev = h;
        }
        assert_eq!(prev, 0.0, "profile must end at zero past the outer rim");
    }

    #[test]
    fn test_rim_wobble_closes_seamlessly() {
        let mut crater = test_crater(10.0, 2.0, 12.0);
        crater.wobble_amplitude = 0.06;
        crater.wobble_seed = 12.5;
        let field = CraterField::from_craters(9, vec![crater]);
        let c = &field.craters()[0];
        let start = field.rim_wobble(c, 0.0);
        let end = field.rim_wobble(c, std::f64::consts::TAU);
        assert!(
            (start - end).abs() < 1.0e-9,
            "rim outline must close: {start} vs {end}"
        );
    }

    #[test]
    fn test_flat_floor_holds_depth() {
        let mut crater = test_crater(10.0, 2.0, 12.0);
        crater.floor_flatness = 0.5;
        let field = CraterField::from_craters(42, vec![crater]);
        let c = &field.craters()[0];
        for i in 0..=10 {
            let dist = i as f64 * 0.5;
            assert_eq!(
                field.profile(c, dist, 0.0),
                -2.0,
                "floor must stay at -depth out to dist {dist}"
            );
        }
        assert!(field.profile(c, 7.5, 0.0) > -2.0, "wall must rise past the floor");
    }

    #[test]
    fn test_deepest_bowl_beats_rim() {
        let mut rim_donor = test_crater(10.0, 2.0, 12.0);
        rim_donor.center = DVec2::new(11.0, 0.0);
        let bowl = test_crater(4.0, 1.0, 4.8);
        let field = CraterField::from_craters(42, vec![bowl, rim_donor]);
        // The origin sits inside the small bowl and on the big crater's rim;
        // the depression must win.
        let offset = field.height_offset(0.0, 0.0);
        assert_eq!(offset, -1.0, "bowl must override a neighboring rim");
    }

    #[test]
    fn test_rims_take_max_not_sum() {
        let mut a = test_crater(10.0, 2.0, 12.0);
        a.center = DVec2::new(-11.0, 0.0);
        let mut b = test_crater(10.0, 2.0, 12.0);
        b.center = DVec2::new(11.0, 0.0);
        let field = CraterField::from_craters(42, vec![a, b]);
        let rim_peak = a.rim_height;
        let offset = field.height_offset(0.0, 0.0);
        assert!(
            offset <= rim_peak + 1.0e-12,
            "overlapping rims must not stack: {offset} > {rim_peak}"
        );
        assert!(offset > 0.0, "rims should still raise the overlap point");
    }

    #[test]
    fn test_adjacent_regions_share_boundary_craters() {
        // Big craters and a high density guarantee boundary-straddling rings.
        let params = CraterParams {
            density_per_km2: 200.0,
            min_radius: 20.0,
            max_radius: 30.0,
            ..Default::default()
        };
        let left = CraterField::generate_for_region(42, RegionKey::new(0, 0), &params, 256.0, 256.0);
        let right =
            CraterField::generate_for_region(42, RegionKey::new(1, 0), &params, 256.0, 256.0);

        let shared = left
            .craters()
            .iter()
            .filter(|c| right.craters().contains(c))
            .count();
        assert!(shared > 0, "boundary craters must appear in both regions");

        // Both fields must agree bit-for-bit along the shared edge x = 128.
        for i in 0..=256 {
            let z = -128.0 + i as f64;
            let a = left.height_offset(128.0, z);
            let b = right.height_offset(128.0, z);
            assert_eq!(a, b, "boundary offset diverged at z = {z}");
        }
    }

    #[test]
    fn test_retained_craters_can_reach_region() {
        let params = CraterParams::default();
        let region = RegionKey::new(2, 5);
        let field = CraterField::generate_for_region(42, region, &params, 256.0, 256.0);
        let center = region.center(256.0, 256.0);
        let half = DVec2::splat(128.0);
        for crater in field.craters() {
            let nearest = crater.center.clamp(center - half, center + half);
            let reach = crater.rim_outer_radius * (1.0 + crater.wobble_amplitude);
            assert!(
                crater.center.distance_squared(nearest) <= reach * reach,
                "crater at {:?} cannot touch region {region}",
                crater.center
            );
        }
    }
}
