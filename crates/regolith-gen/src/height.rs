//! Layered terrain height synthesis.
//!
//! Composes a primary eroded fractal terrain, a canyon/desert variant, a
//! broad altitude offset, and river/lake depressions into a single pure
//! height function. A low-frequency selector noise blends the two variants
//! smoothly so biome boundaries never show a hard cutoff.

use noise::{NoiseFn, Simplex};

use crate::TerrainArgs;
use crate::seed::det_pow;

// Per-purpose seed offsets keep every noise source independent while still
// deriving from the single world seed.
const CANYON_SEED_OFFSET: u64 = 101;
const ALTITUDE_SEED_OFFSET: u64 = 202;
const RIVER_SEED_OFFSET: u64 = 303;
const BIOME_SEED_OFFSET: u64 = 404;

/// Power-curve sharpening applied inside the erosion fold.
const EROSION_POWER: f64 = 2.0;
/// Stronger sharpening for the canyon variant's mesas.
const CANYON_POWER: f64 = 3.0;
/// Canyon terrain peaks at this fraction of the primary amplitude.
const CANYON_AMPLITUDE_SCALE: f64 = 0.65;
/// Canyon noise runs at a different frequency so its ridgelines never
/// correlate with the rolling variant's hills.
const CANYON_FREQUENCY_SCALE: f64 = 1.7;
/// Broad uplift runs at a quarter of the base frequency.
const ALTITUDE_FREQUENCY_SCALE: f64 = 0.25;
/// Broad uplift amplitude as a fraction of the primary amplitude.
const ALTITUDE_AMPLITUDE_SCALE: f64 = 0.5;
/// River/lake noise frequency relative to base.
const RIVER_FREQUENCY_SCALE: f64 = 0.5;
/// Rivers carve where |noise| falls inside this band around zero.
const RIVER_HALF_BAND: f64 = 0.08;
/// Lakes form where the river noise dips below this value.
const LAKE_THRESHOLD: f64 = -0.55;
/// Biome selector noise frequency relative to base.
const BIOME_FREQUENCY_SCALE: f64 = 0.15;
/// Selector value at the middle of the rolling-to-canyon transition.
const BIOME_THRESHOLD: f64 = 0.2;
/// Half-width of the transition band in selector-noise units.
const BIOME_BAND: f64 = 0.25;

/// Terrain variant selected by the biome noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Biome {
    /// Rolling eroded hills.
    Rolling,
    /// Canyon-and-mesa desert.
    Canyon,
}

/// One evaluated surface point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightSample {
    /// Terrain elevation in meters (craters not included).
    pub height: f64,
    /// Variant blend weight: 0 = rolling, 1 = canyon.
    pub biome_blend: f64,
}

/// Pure height function over the world plane.
///
/// Construction is cheap; build one per generation task from its
/// [`TerrainArgs`] and evaluate every vertex through it. For a given args
/// value the evaluator is side-effect-free and bit-deterministic.
pub struct HeightEvaluator {
    base: Simplex,
    canyon: Simplex,
    altitude: Simplex,
    river: Simplex,
    biome: Simplex,
    octaves: u32,
    gain: f64,
    lacunarity: f64,
    base_frequency: f64,
    amplitude: f64,
    erosion_strength: f64,
    river_strength: f64,
    lake_strength: f64,
}

impl HeightEvaluator {
    /// Create an evaluator for the given parameter bundle.
    pub fn new(args: &TerrainArgs) -> Self {
        Self {
            base: Simplex::new(args.seed as u32),
            canyon: Simplex::new(args.seed.wrapping_add(CANYON_SEED_OFFSET) as u32),
            altitude: Simplex::new(args.seed.wrapping_add(ALTITUDE_SEED_OFFSET) as u32),
            river: Simplex::new(args.seed.wrapping_add(RIVER_SEED_OFFSET) as u32),
            biome: Simplex::new(args.seed.wrapping_add(BIOME_SEED_OFFSET) as u32),
            octaves: args.octaves,
            gain: args.gain,
            lacunarity: args.lacunarity,
            base_frequency: args.base_frequency,
            amplitude: args.amplitude,
            erosion_strength: args.erosion_strength,
            river_strength: args.river_strength,
            lake_strength: args.lake_strength,
        }
    }

    /// Evaluate the surface at a world-plane coordinate (meters).
    ///
    /// Adjacent regions sample identical world coordinates along their shared
    /// boundary, which is what makes their pre-stitch edge heights agree.
    pub fn evaluate(&self, x: f64, z: f64) -> HeightSample {
        let blend = self.biome_blend(x, z);
        let rolling = self.variant_height(Biome::Rolling, x, z);
        let canyon = self.variant_height(Biome::Canyon, x, z);
        let mut height = lerp(rolling, canyon, blend);
        height += self.altitude_offset(x, z);
        height += self.depression(x, z);
        HeightSample {
            height,
            biome_blend: blend,
        }
    }

    /// Height of one terrain variant before uplift and depressions.
    ///
    /// Both variants run the same fold: fractal noise into `[0, 1]`,
    /// smoothstep, power-curve sharpening, then a ping-pong that turns the
    /// midband into canyon-like ridgelines.
    pub fn variant_height(&self, biome: Biome, x: f64, z: f64) -> f64 {
        let (noise, freq_scale, power, strength, amp) = match biome {
            Biome::Rolling => (
                &self.base,
                1.0,
                EROSION_POWER,
                self.erosion_strength,
                self.amplitude,
            ),
            Biome::Canyon => (
                &self.canyon,
                CANYON_FREQUENCY_SCALE,
                CANYON_POWER,
                1.0,
                self.amplitude * CANYON_AMPLITUDE_SCALE,
            ),
        };
        let n = self.fbm(noise, x, z, freq_scale);
        let t = n * 0.5 + 0.5;
        let folded = ping_pong(det_pow(smoothstep(t), power) * 2.0);
        let eroded = lerp(t, folded, strength);
        (eroded * 2.0 - 1.0) * amp
    }

    /// Broad low-frequency uplift shifting whole areas up or down.
    fn altitude_offset(&self, x: f64, z: f64) -> f64 {
        let f = self.base_frequency * ALTITUDE_FREQUENCY_SCALE;
        self.altitude.get([x * f, z * f]) * self.amplitude * ALTITUDE_AMPLITUDE_SCALE
    }

    /// River and lake depression, always `<= 0` and continuous everywhere.
    ///
    /// Rivers follow the zero level-set of the river noise (a narrow carved
    /// band); lakes are broad basins where the same noise dips low. The
    /// deeper of the two wins at any point.
    fn depression(&self, x: f64, z: f64) -> f64 {
        let f = self.base_frequency * RIVER_FREQUENCY_SCALE;
        let n = self.river.get([x * f, z * f]);

        let channel = 1.0 - smoothstep((n.abs() / RIVER_HALF_BAND).min(1.0));
        let river = -channel * self.river_strength;

        let lake = if n < LAKE_THRESHOLD {
            let t = ((LAKE_THRESHOLD - n) / (LAKE_THRESHOLD + 1.0)).clamp(0.0, 1.0);
            -smoothstep(t) * self.lake_strength
        } else {
            0.0
        };

        river.min(lake)
    }

    /// Blend weight between the rolling and canyon variants, in `[0, 1]`.
    pub fn biome_blend(&self, x: f64, z: f64) -> f64 {
        let f = self.base_frequency * BIOME_FREQUENCY_SCALE;
        let n = self.biome.get([x * f, z * f]);
        smoothstep(((n - BIOME_THRESHOLD) / BIOME_BAND * 0.5 + 0.5).clamp(0.0, 1.0))
    }

    /// Normalized fractal noise in `[-1, 1]`.
    fn fbm(&self, noise: &Simplex, x: f64, z: f64, freq_scale: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.base_frequency * freq_scale;
        let mut amplitude = 1.0;
        let mut norm = 0.0;

        for _ in 0..self.octaves {
            total += noise.get([x * frequency, z * frequency]) * amplitude;
            norm += amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.gain;
        }

        total / norm
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Hermite smoothstep over a pre-clamped `[0, 1]` input.
#[inline]
fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Fold `[0, 2]` onto `[0, 1]` as a triangle wave.
#[inline]
fn ping_pong(t: f64) -> f64 {
    let t = t % 2.0;
    if t < 1.0 { t } else { 2.0 - t }
}
