//! Instanced rock scatter.
//!
//! Rocks are placed per region and per detail level with their own seed
//! stream, so a coarse region swap never reshuffles the fine rocks around
//! it. Each rock picks a prototype from a fixed-size library, sits on the
//! sampled surface partially buried, and aligns its stable axis to the
//! local surface normal. Steep placements greedily relocate toward flatter
//! ground nearby.

use std::f64::consts::TAU;

use glam::{DQuat, DVec2, DVec3, Mat4};
use hashbrown::HashMap;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::args::{RockParams, TerrainArgs};
use crate::field::HeightField;
use crate::seed::{det_pow, region_rng, rock_purpose};

/// Hard ceiling on rocks per region and level.
const ROCK_CAP: u32 = 4096;
/// A prototype's local origin sits at this fraction of its diameter above
/// its lowest point.
const ORIGIN_HEIGHT_FRACTION: f64 = 0.35;
/// Burial fraction range drawn per rock.
const BURIAL_MIN: f64 = 0.40;
const BURIAL_SPAN: f64 = 0.20;
/// Yaw jitter applied around the surface normal, radians.
const YAW_JITTER: f64 = 0.35;
/// Salt for the per-prototype stable axis stream.
const AXIS_SALT: u64 = 0x0A51_05A1;

/// All instances of one prototype within a region, ready for instanced
/// rendering. Transforms are relative to the region center.
#[derive(Clone, Debug, PartialEq)]
pub struct RockPlacement {
    pub prototype: u32,
    pub transforms: Vec<Mat4>,
}

/// Scatter rocks over a generated height grid.
///
/// `level` selects the detail tier: higher levels raise the minimum
/// diameter, which thins the population to the boulders worth drawing from
/// far away. Output is grouped by prototype and sorted, so equal inputs
/// produce byte-equal buffers.
pub fn place_rocks(
    field: &HeightField,
    args: &TerrainArgs,
    level: u8,
    library_size: u32,
) -> Vec<RockPlacement> {
    let params = &args.rocks;
    if library_size == 0 {
        return Vec::new();
    }

    let min_diameter = params.min_diameter_for_level(level);
    let area = args.region_width * args.region_depth;
    let expected = params.density_constant * det_pow(min_diameter, params.size_exponent) * area;
    let count = (expected.round().max(0.0) as u32).min(ROCK_CAP);

    let mut rng = region_rng(args.seed, args.region, rock_purpose(level));
    let region_center = args.region.center(args.region_width, args.region_depth);
    let half = DVec2::new(args.region_width, args.region_depth) * 0.5;

    let mut by_prototype: HashMap<u32, Vec<Mat4>> = HashMap::new();
    for _ in 0..count {
        let u = rng.random::<f64>();
        let v = rng.random::<f64>();
        let pos = DVec2::new(
            (args.region.x as f64 + u - 0.5) * args.region_width,
            (args.region.z as f64 + v - 0.5) * args.region_depth,
        );
        let diameter = sample_diameter(&mut rng, min_diameter, params);
        let prototype = rng.random_range(0..library_size);

        let pos = relocate_to_flatter(field, pos, region_center, half, params, &mut rng);

        let normal = field.normal(pos.x, pos.y);
        let yaw = (rng.random::<f64>() - 0.5) * 2.0 * YAW_JITTER;
        let rotation = rock_rotation(prototype_stable_axis(prototype), normal, yaw);

        let burial = BURIAL_MIN + rng.random::<f64>() * BURIAL_SPAN;
        let offset_y = diameter * (ORIGIN_HEIGHT_FRACTION - burial);
        let translation = DVec3::new(
            pos.x - region_center.x,
            field.sample(pos.x, pos.y) + offset_y,
            pos.y - region_center.y,
        );

        let transform = glam::DMat4::from_scale_rotation_translation(
            DVec3::splat(diameter),
            rotation,
            translation,
        );
        by_prototype
            .entry(prototype)
            .or_default()
            .push(transform.as_mat4());
    }

    let mut placements: Vec<RockPlacement> = by_prototype
        .into_iter()
        .map(|(prototype, transforms)| RockPlacement {
            prototype,
            transforms,
        })
        .collect();
    placements.sort_by_key(|p| p.prototype);
    placements
}

fn sample_diameter(rng: &mut ChaCha8Rng, min_diameter: f64, params: &RockParams) -> f64 {
    crate::power_law::sample_power_law(
        rng,
        min_diameter,
        params.max_diameter.max(min_diameter),
        params.size_exponent,
    )
}

/// Greedy slope relocation.
///
/// If the start point is too steep, a handful of nearby candidates are
/// tried and the flattest wins. The start point competes too, so the
/// result is never steeper than where the rock began.
fn relocate_to_flatter(
    field: &HeightField,
    start: DVec2,
    region_center: DVec2,
    half: DVec2,
    params: &RockParams,
    rng: &mut ChaCha8Rng,
) -> DVec2 {
    let start_slope = field.gradient(start.x, start.y).length();
    if start_slope <= params.slope_limit {
        return start;
    }

    let mut best = start;
    let mut best_slope = start_slope;
    for _ in 0..params.relocation_attempts {
        let angle = rng.random::<f64>() * TAU;
        let dist = rng.random::<f64>() * params.relocation_radius;
        let candidate = (start + DVec2::from_angle(angle) * dist)
            .clamp(region_center - half, region_center + half);
        let slope = field.gradient(candidate.x, candidate.y).length();
        if slope < best_slope {
            best = candidate;
            best_slope = slope;
        }
    }
    best
}

/// Rotation placing a prototype's stable axis along the surface normal,
/// with a yaw twist around that normal.
fn rock_rotation(axis: DVec3, normal: DVec3, yaw: f64) -> DQuat {
    DQuat::from_axis_angle(normal, yaw) * DQuat::from_rotation_arc(axis, normal)
}

/// The near-vertical axis a prototype prefers to rest on.
///
/// Derived from the prototype id alone, so every placement of the same
/// prototype agrees on which way is up.
fn prototype_stable_axis(prototype: u32) -> DVec3 {
    use rand::SeedableRng;
    let mut rng = ChaCha8Rng::seed_from_u64(AXIS_SALT ^ prototype as u64);
    let x = (rng.random::<f64>() - 0.5) * 0.8;
    let z = (rng.random::<f64>() - 0.5) * 0.8;
    DVec3::new(x, 1.0, z).normalize()
}
