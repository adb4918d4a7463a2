//! Render-ready vertex and index buffers for one region mesh.

use glam::DVec3;
use regolith_gen::HeightField;

use crate::stitch::grid_indices;

/// A single terrain vertex, interleaved for direct GPU upload.
///
/// Positions are relative to the region center so f32 precision holds no
/// matter how far the region sits from the world origin.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    /// Region-local position, height in `y`.
    pub position: [f32; 3],
    /// Area-weighted smooth surface normal.
    pub normal: [f32; 3],
    /// Grid-aligned texture coordinates over `[0, 1]`.
    pub uv: [f32; 2],
    /// Biome blend weight: 0 = rolling, 1 = canyon.
    pub biome: f32,
}

static_assertions::assert_eq_size!(TerrainVertex, [u8; 36]);

/// The mesh output of one region build.
///
/// The index buffer here is always the uniform full-detail grid; stitching
/// swaps in a replacement index buffer later without touching vertices.
pub struct MeshBuffers {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex data as raw bytes for buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes for buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Triangulate a height grid into render buffers.
///
/// Normals are accumulated from face normals in f64, weighted by triangle
/// area, then normalized per vertex. Vertex order is row-major matching the
/// grid, which every index builder in this crate relies on.
pub fn build_region_mesh(field: &HeightField) -> MeshBuffers {
    let resolution = field.resolution();
    let cells = resolution - 1;
    let count = (resolution * resolution) as usize;

    let mut accum = vec![DVec3::ZERO; count];
    for j in 0..cells {
        for i in 0..cells {
            let p00 = field.vertex_local(i, j);
            let p01 = field.vertex_local(i, j + 1);
            let p10 = field.vertex_local(i + 1, j);
            let p11 = field.vertex_local(i + 1, j + 1);

            let idx = |i: u32, j: u32| (j * resolution + i) as usize;
            // Unnormalized cross products carry the area weighting.
            let n0 = (p01 - p00).cross(p10 - p00);
            accum[idx(i, j)] += n0;
            accum[idx(i, j + 1)] += n0;
            accum[idx(i + 1, j)] += n0;
            let n1 = (p01 - p10).cross(p11 - p10);
            accum[idx(i + 1, j)] += n1;
            accum[idx(i, j + 1)] += n1;
            accum[idx(i + 1, j + 1)] += n1;
        }
    }

    let blends = field.blends();
    let mut vertices = Vec::with_capacity(count);
    for j in 0..resolution {
        for i in 0..resolution {
            let slot = (j * resolution + i) as usize;
            let normal = accum[slot].normalize_or(DVec3::Y);
            vertices.push(TerrainVertex {
                position: field.vertex_local(i, j).as_vec3().to_array(),
                normal: normal.as_vec3().to_array(),
                uv: [i as f32 / cells as f32, j as f32 / cells as f32],
                biome: blends[slot],
            });
        }
    }

    MeshBuffers {
        vertices,
        indices: grid_indices(resolution),
    }
}
