//! Region addressing and the immutable generation parameter bundle.

use glam::DVec2;

/// Grid coordinates identifying one square terrain region.
///
/// Regions tile the world plane without overlap; region `(x, z)` is centered
/// at world `(x * width, z * depth)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey {
    /// Grid column (world X).
    pub x: i32,
    /// Grid row (world Z).
    pub z: i32,
}

impl RegionKey {
    /// Create a region key from grid coordinates.
    #[must_use]
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World-space center of this region.
    #[must_use]
    pub fn center(&self, width: f64, depth: f64) -> DVec2 {
        DVec2::new(self.x as f64 * width, self.z as f64 * depth)
    }

    /// World-space minimum corner of this region.
    #[must_use]
    pub fn min_corner(&self, width: f64, depth: f64) -> DVec2 {
        DVec2::new(
            (self.x as f64 - 0.5) * width,
            (self.z as f64 - 0.5) * depth,
        )
    }

    /// The region containing the given world position.
    #[must_use]
    pub fn containing(x: f64, z: f64, width: f64, depth: f64) -> Self {
        Self {
            x: libm::round(x / width) as i32,
            z: libm::round(z / depth) as i32,
        }
    }

    /// The key offset by the given grid deltas.
    #[must_use]
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Crater overlay parameters. See the same-named settings fields for units.
#[derive(Clone, Debug, PartialEq)]
pub struct CraterParams {
    pub density_per_km2: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub size_exponent: f64,
    pub depth_ratio: f64,
    pub rim_height_fraction: f64,
    pub rim_width_fraction: f64,
    pub floor_flatness: f64,
    pub wobble_amplitude: f64,
}

impl Default for CraterParams {
    fn default() -> Self {
        Self {
            density_per_km2: 18.0,
            min_radius: 2.0,
            max_radius: 30.0,
            size_exponent: -1.8,
            depth_ratio: 0.12,
            rim_height_fraction: 0.35,
            rim_width_fraction: 0.25,
            floor_flatness: 0.25,
            wobble_amplitude: 0.06,
        }
    }
}

/// Rock scattering parameters. See the same-named settings fields for units.
#[derive(Clone, Debug, PartialEq)]
pub struct RockParams {
    pub density_constant: f64,
    pub size_exponent: f64,
    pub min_diameter: f64,
    pub max_diameter: f64,
    pub level_min_diameter_scale: f64,
    pub slope_limit: f64,
    pub relocation_attempts: u32,
    pub relocation_radius: f64,
}

impl Default for RockParams {
    fn default() -> Self {
        Self {
            density_constant: 0.015,
            size_exponent: -2.2,
            min_diameter: 0.4,
            max_diameter: 3.5,
            level_min_diameter_scale: 2.0,
            slope_limit: 0.55,
            relocation_attempts: 5,
            relocation_radius: 6.0,
        }
    }
}

impl RockParams {
    /// Smallest rock diameter shown at the given detail level.
    ///
    /// Coarser levels raise the floor so sub-pixel rocks are never placed.
    /// Clamped to `max_diameter` so the sampling range stays valid.
    #[must_use]
    pub fn min_diameter_for_level(&self, level: u8) -> f64 {
        let scaled =
            self.min_diameter * libm::pow(self.level_min_diameter_scale, level as f64);
        scaled.min(self.max_diameter)
    }
}

/// Immutable parameter bundle passed by value into every generation call.
///
/// Never mutated after construction, so it can be shared freely across
/// worker threads. Identical args always yield identical output.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainArgs {
    /// World seed; every noise source and RNG stream derives from it.
    pub seed: u64,
    /// Octave count for the primary fractal noise.
    pub octaves: u32,
    /// Per-octave amplitude falloff.
    pub gain: f64,
    /// Per-octave frequency multiplier.
    pub lacunarity: f64,
    /// Base noise frequency in cycles per meter.
    pub base_frequency: f64,
    /// Peak terrain amplitude in meters.
    pub amplitude: f64,
    /// Erosion curve strength, 0 (off) to 1 (full).
    pub erosion_strength: f64,
    /// Maximum river channel depth in meters.
    pub river_strength: f64,
    /// Maximum lake basin depth in meters.
    pub lake_strength: f64,
    /// Crater overlay parameters.
    pub craters: CraterParams,
    /// Rock scattering parameters.
    pub rocks: RockParams,
    /// Region width (world X extent) in meters.
    pub region_width: f64,
    /// Region depth (world Z extent) in meters.
    pub region_depth: f64,
    /// Vertices per region edge for this build.
    pub resolution: u32,
    /// The region this build targets.
    pub region: RegionKey,
}

impl Default for TerrainArgs {
    fn default() -> Self {
        Self {
            seed: 42,
            octaves: 6,
            gain: 0.5,
            lacunarity: 2.0,
            base_frequency: 0.004,
            amplitude: 24.0,
            erosion_strength: 0.55,
            river_strength: 6.0,
            lake_strength: 3.5,
            craters: CraterParams::default(),
            rocks: RockParams::default(),
            region_width: 256.0,
            region_depth: 256.0,
            resolution: 65,
            region: RegionKey::new(0, 0),
        }
    }
}

impl TerrainArgs {
    /// The same args retargeted at a different region and resolution.
    #[must_use]
    pub fn for_region(&self, region: RegionKey, resolution: u32) -> Self {
        Self {
            region,
            resolution,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_center() {
        let key = RegionKey::new(2, -1);
        let center = key.center(100.0, 100.0);
        assert_eq!(center, DVec2::new(200.0, -100.0));
    }

    #[test]
    fn test_region_min_corner() {
        let key = RegionKey::new(0, 0);
        let corner = key.min_corner(100.0, 80.0);
        assert_eq!(corner, DVec2::new(-50.0, -40.0));
    }

    #[test]
    fn test_containing_inverts_center() {
        for (x, z) in [(0, 0), (3, -2), (-7, 11)] {
            let key = RegionKey::new(x, z);
            let center = key.center(256.0, 256.0);
            assert_eq!(RegionKey::containing(center.x, center.y, 256.0, 256.0), key);
        }
    }

    #[test]
    fn test_min_diameter_for_level_scales() {
        let params = RockParams::default();
        let d0 = params.min_diameter_for_level(0);
        let d1 = params.min_diameter_for_level(1);
        let d2 = params.min_diameter_for_level(2);
        assert_eq!(d0, 0.4);
        assert!((d1 - 0.8).abs() < 1e-12);
        assert!((d2 - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_min_diameter_clamped_to_max() {
        let params = RockParams::default();
        // 0.4 * 2^8 = 102.4, far past max_diameter
        assert_eq!(params.min_diameter_for_level(8), params.max_diameter);
    }

    #[test]
    fn test_for_region_retargets() {
        let args = TerrainArgs::default();
        let other = args.for_region(RegionKey::new(5, 6), 17);
        assert_eq!(other.region, RegionKey::new(5, 6));
        assert_eq!(other.resolution, 17);
        assert_eq!(other.seed, args.seed);
        assert_eq!(other.craters, args.craters);
    }
}
