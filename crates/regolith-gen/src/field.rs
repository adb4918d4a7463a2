//! Regular height grid for one region at one resolution.
//!
//! The grid stores final heights (terrain plus craters) at `resolution x
//! resolution` vertices spanning the region, row-major with `x` varying
//! fastest. Vertex world coordinates are computed with one shared f64
//! expression, so the boundary column of a region and the matching column
//! of its neighbor evaluate the noise at bit-identical inputs and produce
//! bit-identical heights.

use glam::{DVec2, DVec3};

use crate::args::{RegionKey, TerrainArgs};
use crate::crater::CraterField;
use crate::height::HeightEvaluator;

#[derive(Debug)]
pub struct HeightField {
    key: RegionKey,
    resolution: u32,
    width: f64,
    depth: f64,
    heights: Vec<f64>,
    blends: Vec<f32>,
}

impl HeightField {
    /// Sample the full terrain stack over the region described by `args`.
    pub fn generate(args: &TerrainArgs, craters: &CraterField) -> Self {
        let resolution = args.resolution;
        debug_assert!(resolution >= 2, "a height grid needs at least one cell");
        let cells = (resolution - 1) as f64;
        let evaluator = HeightEvaluator::new(args);

        let count = (resolution * resolution) as usize;
        let mut heights = Vec::with_capacity(count);
        let mut blends = Vec::with_capacity(count);
        for j in 0..resolution {
            for i in 0..resolution {
                let x = (args.region.x as f64 + i as f64 / cells - 0.5) * args.region_width;
                let z = (args.region.z as f64 + j as f64 / cells - 0.5) * args.region_depth;
                let sample = evaluator.evaluate(x, z);
                heights.push(sample.height + craters.height_offset(x, z));
                blends.push(sample.biome_blend as f32);
            }
        }

        Self {
            key: args.region,
            resolution,
            width: args.region_width,
            depth: args.region_depth,
            heights,
            blends,
        }
    }

    /// Wrap an existing height grid, for physics queries over precomputed
    /// data. Biome blends are zeroed.
    pub fn from_heights(
        key: RegionKey,
        resolution: u32,
        width: f64,
        depth: f64,
        heights: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(heights.len(), (resolution * resolution) as usize);
        let blends = vec![0.0; heights.len()];
        Self {
            key,
            resolution,
            width,
            depth,
            heights,
            blends,
        }
    }

    pub fn key(&self) -> RegionKey {
        self.key
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn blends(&self) -> &[f32] {
        &self.blends
    }

    #[inline]
    pub fn height_at(&self, i: u32, j: u32) -> f64 {
        self.heights[(j * self.resolution + i) as usize]
    }

    /// World-plane coordinate of grid vertex `(i, j)`.
    #[inline]
    pub fn vertex_world(&self, i: u32, j: u32) -> DVec2 {
        let cells = (self.resolution - 1) as f64;
        DVec2::new(
            (self.key.x as f64 + i as f64 / cells - 0.5) * self.width,
            (self.key.z as f64 + j as f64 / cells - 0.5) * self.depth,
        )
    }

    /// Vertex position relative to the region center, with height as `y`.
    #[inline]
    pub fn vertex_local(&self, i: u32, j: u32) -> DVec3 {
        let cells = (self.resolution - 1) as f64;
        DVec3::new(
            (i as f64 / cells - 0.5) * self.width,
            self.height_at(i, j),
            (j as f64 / cells - 0.5) * self.depth,
        )
    }

    /// Bilinear height at a world-plane point, clamped to the region.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let cells = (self.resolution - 1) as f64;
        let gx = ((x / self.width - self.key.x as f64 + 0.5) * cells).clamp(0.0, cells);
        let gz = ((z / self.depth - self.key.z as f64 + 0.5) * cells).clamp(0.0, cells);

        let i0 = (gx as u32).min(self.resolution - 2);
        let j0 = (gz as u32).min(self.resolution - 2);
        let fx = gx - i0 as f64;
        let fz = gz - j0 as f64;

        let h00 = self.height_at(i0, j0);
        let h10 = self.height_at(i0 + 1, j0);
        let h01 = self.height_at(i0, j0 + 1);
        let h11 = self.height_at(i0 + 1, j0 + 1);

        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;
        top + (bottom - top) * fz
    }

    /// Height slope `(dh/dx, dh/dz)` at a world-plane point, by central
    /// differences at half the cell spacing. Flattens toward the region
    /// border where sampling clamps.
    pub fn gradient(&self, x: f64, z: f64) -> DVec2 {
        let step = self.width / (self.resolution - 1) as f64;
        let eps = step * 0.5;
        DVec2::new(
            (self.sample(x + eps, z) - self.sample(x - eps, z)) / (2.0 * eps),
            (self.sample(x, z + eps) - self.sample(x, z - eps)) / (2.0 * eps),
        )
    }

    /// Upward surface normal at a world-plane point.
    pub fn normal(&self, x: f64, z: f64) -> DVec3 {
        let g = self.gradient(x, z);
        // y = 1 keeps the vector length >= 1, so normalize cannot blow up.
        DVec3::new(-g.x, 1.0, -g.y).normalize()
    }

    /// Resample the region onto a `samples x samples` grid, row-major.
    ///
    /// Used for physics height grids at arbitrary density independent of the
    /// render resolution.
    pub fn resample(&self, samples: u32) -> Vec<f64> {
        let cells = samples.saturating_sub(1).max(1) as f64;
        let mut out = Vec::with_capacity((samples * samples) as usize);
        for j in 0..samples {
            for i in 0..samples {
                let p = DVec2::new(
                    (self.key.x as f64 + i as f64 / cells - 0.5) * self.width,
                    (self.key.z as f64 + j as f64 / cells - 0.5) * self.depth,
                );
                out.push(self.sample(p.x, p.y));
            }
        }
        out
    }
}
