//! Settings structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Height synthesis settings.
    pub terrain: TerrainSettings,
    /// Impact crater overlay settings.
    pub craters: CraterSettings,
    /// Surface rock scattering settings.
    pub rocks: RockSettings,
    /// Region streaming and level-of-detail settings.
    pub streaming: StreamingSettings,
    /// Debug/development settings.
    pub debug: DebugSettings,
}

/// Height synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainSettings {
    /// World seed; every generated artifact derives from it.
    pub seed: u64,
    /// Octave count for the primary fractal noise.
    pub octaves: u32,
    /// Per-octave amplitude falloff.
    pub gain: f64,
    /// Per-octave frequency multiplier.
    pub lacunarity: f64,
    /// Base noise frequency in cycles per meter.
    pub base_frequency: f64,
    /// Peak-to-valley amplitude of the primary terrain in meters.
    pub amplitude: f64,
    /// How strongly the erosion curve carves ridges (0 = off, 1 = full).
    pub erosion_strength: f64,
    /// Maximum depth of river channels in meters.
    pub river_strength: f64,
    /// Maximum depth of lake basins in meters.
    pub lake_strength: f64,
}

/// Impact crater overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CraterSettings {
    /// Expected craters per square kilometer at unit radius.
    pub density_per_km2: f64,
    /// Smallest crater radius in meters.
    pub min_radius: f64,
    /// Largest crater radius in meters.
    pub max_radius: f64,
    /// Power-law exponent for the radius size-frequency distribution.
    /// Negative: small craters vastly outnumber large ones.
    pub size_exponent: f64,
    /// Bowl depth as a fraction of radius (depth = radius * ratio * 2).
    pub depth_ratio: f64,
    /// Rim peak height as a fraction of bowl depth.
    pub rim_height_fraction: f64,
    /// Rim band width as a fraction of radius (outer = radius * (1 + frac)).
    pub rim_width_fraction: f64,
    /// Fraction of the bowl radius that is flat floor (0 = pure parabola).
    pub floor_flatness: f64,
    /// Angular wobble of the rim as a fraction of radius.
    pub wobble_amplitude: f64,
}

/// Surface rock scattering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RockSettings {
    /// Scaling constant for the cumulative rock count power law.
    pub density_constant: f64,
    /// Power-law exponent for rock diameters. Negative.
    pub size_exponent: f64,
    /// Smallest rock diameter in meters at the finest detail level.
    pub min_diameter: f64,
    /// Largest rock diameter in meters.
    pub max_diameter: f64,
    /// Multiplier applied to the minimum diameter per coarser detail level.
    pub level_min_diameter_scale: f64,
    /// Gradient magnitude above which a candidate position is rejected.
    pub slope_limit: f64,
    /// Nearby candidates tried when the initial position is too steep.
    pub relocation_attempts: u32,
    /// Search radius for relocation candidates in meters.
    pub relocation_radius: f64,
    /// Number of distinct rock prototypes available for instancing.
    pub prototype_count: u32,
}

/// Region streaming and level-of-detail settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingSettings {
    /// Region width (world X extent) in meters.
    pub region_width: f64,
    /// Region depth (world Z extent) in meters.
    pub region_depth: f64,
    /// Vertices per region edge, finest level first.
    pub resolutions: Vec<u32>,
    /// Upper observer-distance bound per detail level, in meters, strictly
    /// increasing. The last entry doubles as the streaming view radius.
    pub distance_thresholds: Vec<f64>,
    /// Background build workers. 0 selects a hardware-based default.
    pub worker_threads: usize,
    /// Closest-region count that always schedules ahead of everything else.
    pub nearest_tier_count: usize,
    /// Stitched index buffers kept in the LRU cache.
    pub stitch_cache_capacity: usize,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugSettings {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for TerrainSettings {
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
        }
    }
}

impl Default for CraterSettings {
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

impl Default for RockSettings {
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
            prototype_count: 8,
        }
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            region_width: 256.0,
            region_depth: 256.0,
            resolutions: vec![129, 65, 33, 17],
            distance_thresholds: vec![384.0, 768.0, 1536.0, 3072.0],
            worker_threads: 0,
            nearest_tier_count: 4,
            stitch_cache_capacity: 64,
        }
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Settings {
    /// Load settings from the given directory, or create a default settings file.
    pub fn load_or_create(settings_dir: &Path) -> Result<Self, SettingsError> {
        let settings_path = settings_dir.join("settings.ron");

        if settings_path.exists() {
            let contents =
                std::fs::read_to_string(&settings_path).map_err(SettingsError::ReadError)?;
            let settings: Settings =
                ron::from_str(&contents).map_err(SettingsError::ParseError)?;
            log::info!("Loaded settings from {}", settings_path.display());
            Ok(settings)
        } else {
            let settings = Settings::default();
            settings.save(settings_dir)?;
            log::info!("Created default settings at {}", settings_path.display());
            Ok(settings)
        }
    }

    /// Save settings to the given directory as `settings.ron`.
    pub fn save(&self, settings_dir: &Path) -> Result<(), SettingsError> {
        std::fs::create_dir_all(settings_dir).map_err(SettingsError::WriteError)?;

        let settings_path = settings_dir.join("settings.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(SettingsError::SerializeError)?;

        std::fs::write(&settings_path, serialized).map_err(SettingsError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_settings)` if the file changed, `None` otherwise.
    pub fn reload(&self, settings_dir: &Path) -> Result<Option<Self>, SettingsError> {
        let settings_path = settings_dir.join("settings.ron");
        let contents =
            std::fs::read_to_string(&settings_path).map_err(SettingsError::ReadError)?;
        let new_settings: Settings =
            ron::from_str(&contents).map_err(SettingsError::ParseError)?;

        if &new_settings != self {
            log::info!("Settings reloaded with changes");
            Ok(Some(new_settings))
        } else {
            Ok(None)
        }
    }
}

// --- Validation ---

impl Settings {
    /// Check every cross-field constraint the engine relies on.
    ///
    /// Called once at startup; a failure here is fatal. Generation code
    /// assumes validated settings and does not re-check.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.terrain.validate()?;
        self.craters.validate()?;
        self.rocks.validate()?;
        self.streaming.validate()?;
        Ok(())
    }
}

impl TerrainSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.octaves == 0 {
            return Err(SettingsError::Invalid("terrain.octaves must be >= 1".into()));
        }
        if self.gain <= 0.0 || self.lacunarity <= 0.0 {
            return Err(SettingsError::Invalid(
                "terrain.gain and terrain.lacunarity must be positive".into(),
            ));
        }
        if self.base_frequency <= 0.0 {
            return Err(SettingsError::Invalid(
                "terrain.base_frequency must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl CraterSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.min_radius <= 0.0 || self.max_radius <= self.min_radius {
            return Err(SettingsError::Invalid(format!(
                "crater radius range [{}, {}] must be positive and increasing",
                self.min_radius, self.max_radius
            )));
        }
        if self.size_exponent == 0.0 {
            return Err(SettingsError::Invalid(
                "craters.size_exponent must be nonzero".into(),
            ));
        }
        if self.density_per_km2 < 0.0 {
            return Err(SettingsError::Invalid(
                "craters.density_per_km2 must be non-negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.floor_flatness) {
            return Err(SettingsError::Invalid(
                "craters.floor_flatness must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

impl RockSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.min_diameter <= 0.0 || self.max_diameter <= self.min_diameter {
            return Err(SettingsError::Invalid(format!(
                "rock diameter range [{}, {}] must be positive and increasing",
                self.min_diameter, self.max_diameter
            )));
        }
        if self.size_exponent == 0.0 {
            return Err(SettingsError::Invalid(
                "rocks.size_exponent must be nonzero".into(),
            ));
        }
        if self.level_min_diameter_scale < 1.0 {
            return Err(SettingsError::Invalid(
                "rocks.level_min_diameter_scale must be >= 1".into(),
            ));
        }
        if self.prototype_count == 0 {
            return Err(SettingsError::Invalid(
                "rocks.prototype_count must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl StreamingSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.region_width <= 0.0 || self.region_depth <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "region dimensions {}x{} must be positive",
                self.region_width, self.region_depth
            )));
        }
        if self.resolutions.is_empty() {
            return Err(SettingsError::Invalid(
                "streaming.resolutions must not be empty".into(),
            ));
        }
        if self.resolutions.len() != self.distance_thresholds.len() {
            return Err(SettingsError::Invalid(format!(
                "streaming.resolutions ({}) and streaming.distance_thresholds ({}) \
                 must have the same length",
                self.resolutions.len(),
                self.distance_thresholds.len()
            )));
        }
        for window in self.resolutions.windows(2) {
            let (finer, coarser) = (window[0], window[1]);
            if coarser >= finer {
                return Err(SettingsError::Invalid(
                    "streaming.resolutions must be strictly decreasing (finest first)".into(),
                ));
            }
            // Stitch snapping is exact only when the coarser cell count
            // divides the finer one.
            if coarser < 2 || (finer - 1) % (coarser - 1) != 0 {
                return Err(SettingsError::Invalid(format!(
                    "resolution {coarser} does not nest inside {finer}: \
                     cell counts must divide evenly"
                )));
            }
        }
        if let Some(&last) = self.resolutions.last()
            && last < 2
        {
            return Err(SettingsError::Invalid(
                "every resolution must be at least 2 vertices per edge".into(),
            ));
        }
        let mut prev = 0.0;
        for &threshold in &self.distance_thresholds {
            if threshold <= prev {
                return Err(SettingsError::Invalid(
                    "streaming.distance_thresholds must be positive and strictly increasing"
                        .into(),
                ));
            }
            prev = threshold;
        }
        Ok(())
    }
}
