//! Crack-free index buffers across detail-level boundaries.
//!
//! A region rendered at fine resolution next to a coarser neighbor produces
//! T-junction cracks along the shared edge: the fine edge has vertices the
//! coarse side lacks. The fix is done purely in index space. The uniform
//! grid keeps every vertex, and [`stitched_indices`] emits an alternative
//! index buffer that insets the regular grid one cell away from each coarse
//! neighbor and bridges the gap with triangle fans touching only the edge
//! vertices the neighbor also has. Vertex buffers are never modified, so a
//! neighbor change only swaps indices.
//!
//! [`snap_edge_heights`] is the vertex-morph alternative for renderers that
//! prefer keeping the uniform topology and flattening edge heights instead.

use crate::buffers::TerrainVertex;

/// One side of a region, in corner-chained order.
///
/// Each side's edge runs from its `t = 0` corner to its `t = cells` corner,
/// and every side starts where its predecessor ends: North owns NW to NE,
/// East NE to SE, South SE to SW, West SW back to NW.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// `j = 0` edge, toward negative world Z.
    North,
    /// `i = cells` edge, toward positive world X.
    East,
    /// `j = cells` edge, toward positive world Z.
    South,
    /// `i = 0` edge, toward negative world X.
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::East => Side::West,
            Side::South => Side::North,
            Side::West => Side::East,
        }
    }

    /// Region-grid offset of the neighbor on this side.
    pub fn grid_offset(self) -> (i32, i32) {
        match self {
            Side::North => (0, -1),
            Side::East => (1, 0),
            Side::South => (0, 1),
            Side::West => (-1, 0),
        }
    }

    fn predecessor(self) -> Side {
        match self {
            Side::North => Side::West,
            Side::East => Side::North,
            Side::South => Side::East,
            Side::West => Side::South,
        }
    }

    fn successor(self) -> Side {
        match self {
            Side::North => Side::East,
            Side::East => Side::South,
            Side::South => Side::West,
            Side::West => Side::North,
        }
    }

    /// Map edge-frame coordinates to grid coordinates.
    ///
    /// `t` runs along the edge from the side's start corner, `d` steps
    /// inward. All four mappings preserve orientation, so one triangle
    /// emission order works for every side.
    fn frame(self, t: u32, d: u32, cells: u32) -> (u32, u32) {
        match self {
            Side::North => (t, d),
            Side::East => (cells - d, t),
            Side::South => (cells - t, cells - d),
            Side::West => (d, cells - t),
        }
    }
}

/// Resolved detail relationship between a region and its four neighbors.
///
/// `neighbors[side]` holds the neighbor's resolution when that neighbor
/// renders coarser than this region; `None` means same or finer detail, in
/// which case the neighbor owns any stitching on the shared edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StitchContext {
    /// Vertices per edge of this region's grid.
    pub resolution: u32,
    /// Coarser neighbor resolutions, indexed by [`Side::ALL`] order.
    pub neighbors: [Option<u32>; 4],
}

impl StitchContext {
    /// A context with no coarser neighbors, yielding the uniform grid.
    pub fn uniform(resolution: u32) -> Self {
        Self {
            resolution,
            neighbors: [None; 4],
        }
    }

    /// Vertex-spacing ratio toward the neighbor on `side`, `>= 2` when that
    /// side needs stitching.
    ///
    /// Resolutions come from a validated ladder where each finer cell count
    /// is a multiple of the coarser one; a pair outside that ladder does
    /// not stitch.
    pub fn ratio(&self, side: Side) -> Option<u32> {
        let neighbor = self.neighbors[side as usize]?;
        if neighbor < 2 || neighbor >= self.resolution {
            return None;
        }
        let own = self.resolution - 1;
        let coarse = neighbor - 1;
        if own % coarse != 0 {
            return None;
        }
        let ratio = own / coarse;
        (ratio > 1).then_some(ratio)
    }

    pub fn stitched(&self, side: Side) -> bool {
        self.ratio(side).is_some()
    }

    pub fn any_stitched(&self) -> bool {
        Side::ALL.iter().any(|&s| self.stitched(s))
    }
}

/// Uniform full-detail index buffer for a square height grid.
///
/// Triangles wind counter-clockwise seen from above (+Y).
pub fn grid_indices(resolution: u32) -> Vec<u32> {
    let cells = resolution - 1;
    let v = |i: u32, j: u32| j * resolution + i;
    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for j in 0..cells {
        for i in 0..cells {
            indices.extend_from_slice(&[v(i, j), v(i, j + 1), v(i + 1, j)]);
            indices.extend_from_slice(&[v(i + 1, j), v(i, j + 1), v(i + 1, j + 1)]);
        }
    }
    indices
}

/// Index buffer with edge bands rebuilt against coarser neighbors.
///
/// The regular grid is inset one cell on every stitched side. The vacated
/// band is filled with fans whose edge vertices are restricted to the
/// positions the coarse neighbor shares, which removes every T-junction.
/// Where two stitched sides meet, the band triangles chain through the
/// corner vertex itself. Interior triangles are emitted exactly as
/// [`grid_indices`] would.
pub fn stitched_indices(ctx: &StitchContext) -> Vec<u32> {
    if !ctx.any_stitched() {
        return grid_indices(ctx.resolution);
    }

    let resolution = ctx.resolution;
    let cells = resolution - 1;
    let v = |i: u32, j: u32| j * resolution + i;
    let mut indices = Vec::new();

    let i0 = ctx.stitched(Side::West) as u32;
    let i1 = cells - ctx.stitched(Side::East) as u32;
    let j0 = ctx.stitched(Side::North) as u32;
    let j1 = cells - ctx.stitched(Side::South) as u32;
    for j in j0..j1 {
        for i in i0..i1 {
            indices.extend_from_slice(&[v(i, j), v(i, j + 1), v(i + 1, j)]);
            indices.extend_from_slice(&[v(i + 1, j), v(i, j + 1), v(i + 1, j + 1)]);
        }
    }

    for side in Side::ALL {
        let Some(ratio) = ctx.ratio(side) else {
            continue;
        };
        let edge = |t: u32| {
            let (i, j) = side.frame(t, 0, cells);
            v(i, j)
        };
        let inner = |t: u32| {
            let (i, j) = side.frame(t, 1, cells);
            v(i, j)
        };
        // Where the adjacent side is also stitched, the band narrows into
        // the shared corner instead of using the missing inner vertex.
        let pred = ctx.stitched(side.predecessor());
        let succ = ctx.stitched(side.successor());
        let chain = |t: u32| {
            if t == 0 && pred {
                edge(0)
            } else if t == cells && succ {
                edge(cells)
            } else {
                inner(t)
            }
        };
        let snap = |t: u32| (((t + ratio / 2) / ratio) * ratio).min(cells);

        for t in 0..cells {
            let a = chain(t);
            let b = chain(t + 1);
            let c0 = edge(snap(t));
            let c1 = edge(snap(t + 1));
            if c0 == c1 {
                push_triangle(&mut indices, a, b, c0);
            } else {
                push_triangle(&mut indices, a, b, c1);
                push_triangle(&mut indices, a, c1, c0);
            }
        }
    }

    indices
}

fn push_triangle(indices: &mut Vec<u32>, a: u32, b: u32, c: u32) {
    if a != b && b != c && a != c {
        indices.extend_from_slice(&[a, b, c]);
    }
}

/// Morph stitched-edge vertex heights onto the coarse neighbor's silhouette.
///
/// Every fine edge vertex between two coarse-shared positions gets the
/// linear interpolation of those two heights, so the fine edge collapses
/// onto the coarse edge polyline. Leaves all other vertices untouched.
/// Callers owning a shared base mesh should apply this to a copy.
pub fn snap_edge_heights(vertices: &mut [TerrainVertex], ctx: &StitchContext) {
    let resolution = ctx.resolution;
    let cells = resolution - 1;
    let slot = |t: u32, side: Side| {
        let (i, j) = side.frame(t, 0, cells);
        (j * resolution + i) as usize
    };
    for side in Side::ALL {
        let Some(ratio) = ctx.ratio(side) else {
            continue;
        };
        for t in 1..cells {
            if t % ratio == 0 {
                continue;
            }
            let lo = (t / ratio) * ratio;
            let hi = (lo + ratio).min(cells);
            let frac = (t - lo) as f32 / (hi - lo) as f32;
            let y_lo = vertices[slot(lo, side)].position[1];
            let y_hi = vertices[slot(hi, side)].position[1];
            vertices[slot(t, side)].position[1] = y_lo + (y_hi - y_lo) * frac;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    /// Signed double-area of the whole index buffer in grid units. Every
    /// upward-facing triangle contributes a negative value, so a buffer that
    /// tiles the full region without gaps or overlaps sums to exactly
    /// `-2 * cells^2`.
    fn signed_double_area(indices: &[u32], resolution: u32) -> i64 {
        let coords = |v: u32| ((v % resolution) as i64, (v / resolution) as i64);
        indices
            .chunks(3)
            .map(|tri| {
                let (ax, az) = coords(tri[0]);
                let (bx, bz) = coords(tri[1]);
                let (cx, cz) = coords(tri[2]);
                (bx - ax) * (cz - az) - (bz - az) * (cx - ax)
            })
            .sum()
    }

    fn assert_tiles_region(indices: &[u32], resolution: u32) {
        let cells = (resolution - 1) as i64;
        let coords = |v: u32| ((v % resolution) as i64, (v / resolution) as i64);
        for tri in indices.chunks(3) {
            let (ax, az) = coords(tri[0]);
            let (bx, bz) = coords(tri[1]);
            let (cx, cz) = coords(tri[2]);
            let cross = (bx - ax) * (cz - az) - (bz - az) * (cx - ax);
            assert!(cross < 0, "triangle {tri:?} is degenerate or wound downward");
        }
        assert_eq!(
            signed_double_area(indices, resolution),
            -2 * cells * cells,
            "triangles must tile the region exactly"
        );
    }

    /// Count directed edges: a watertight, consistently wound triangulation
    /// uses every interior edge exactly once per direction and every region
    /// perimeter edge exactly once total.
    fn assert_watertight(indices: &[u32], resolution: u32) {
        let mut directed: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        for tri in indices.chunks(3) {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                *directed.entry((a, b)).or_default() += 1;
            }
        }
        let cells = resolution - 1;
        let on_perimeter = |v: u32| {
            let (i, j) = (v % resolution, v / resolution);
            i == 0 || i == cells || j == 0 || j == cells
        };
        for (&(a, b), &count) in &directed {
            assert_eq!(count, 1, "edge {a}->{b} used {count} times; mesh overlaps itself");
            let paired = directed.contains_key(&(b, a));
            let boundary = {
                let (ai, aj) = (a % resolution, a / resolution);
                let (bi, bj) = (b % resolution, b / resolution);
                (ai == 0 && bi == 0)
                    || (ai == cells && bi == cells)
                    || (aj == 0 && bj == 0)
                    || (aj == cells && bj == cells)
            };
            assert!(
                paired || boundary,
                "edge {a}->{b} is unmatched but not on the perimeter \
                 (perimeter flags: {} {})",
                on_perimeter(a),
                on_perimeter(b)
            );
        }
    }

    fn ctx(resolution: u32, neighbors: [Option<u32>; 4]) -> StitchContext {
        StitchContext {
            resolution,
            neighbors,
        }
    }

    #[test]
    fn test_uniform_grid_tiles_region() {
        for resolution in [3, 5, 9, 17] {
            let indices = grid_indices(resolution);
            let cells = (resolution - 1) as usize;
            assert_eq!(indices.len(), cells * cells * 6);
            assert_tiles_region(&indices, resolution);
            assert_watertight(&indices, resolution);
        }
    }

    #[test]
    fn test_unstitched_context_matches_uniform_grid() {
        let c = ctx(9, [None; 4]);
        assert_eq!(stitched_indices(&c), grid_indices(9));
        // A finer neighbor never triggers stitching either.
        let finer = ctx(9, [Some(17), None, None, None]);
        assert_eq!(stitched_indices(&finer), grid_indices(9));
    }

    #[test]
    fn test_ratio_resolves_ladder_steps() {
        let c = ctx(17, [Some(9), Some(5), Some(3), None]);
        assert_eq!(c.ratio(Side::North), Some(2));
        assert_eq!(c.ratio(Side::East), Some(4));
        assert_eq!(c.ratio(Side::South), Some(8));
        assert_eq!(c.ratio(Side::West), None);
        assert!(c.any_stitched());
    }

    #[test]
    fn test_single_stitched_side_tiles_and_seals() {
        for neighbor in [Some(5), Some(3)] {
            for side in 0..4 {
                let mut neighbors = [None; 4];
                neighbors[side] = neighbor;
                let indices = stitched_indices(&ctx(9, neighbors));
                assert_tiles_region(&indices, 9);
                assert_watertight(&indices, 9);
            }
        }
    }

    #[test]
    fn test_adjacent_stitched_corners_tile_and_seal() {
        // Every pair of adjacent sides, with equal and mixed ratios.
        let pairs = [(0, 1), (1, 2), (2, 3), (3, 0)];
        for (a, b) in pairs {
            for (ra, rb) in [(Some(5), Some(5)), (Some(5), Some(3)), (Some(3), Some(5))] {
                let mut neighbors = [None; 4];
                neighbors[a] = ra;
                neighbors[b] = rb;
                let indices = stitched_indices(&ctx(9, neighbors));
                assert_tiles_region(&indices, 9);
                assert_watertight(&indices, 9);
            }
        }
    }

    #[test]
    fn test_all_sides_stitched_tiles_and_seals() {
        for neighbor in [Some(9), Some(5), Some(3)] {
            let indices = stitched_indices(&ctx(17, [neighbor; 4]));
            assert_tiles_region(&indices, 17);
            assert_watertight(&indices, 17);
        }
    }

    #[test]
    fn test_smallest_grid_stitches() {
        // 3x3 grid against a 2x2 neighbor: the band is a full fan.
        let indices = stitched_indices(&ctx(3, [None, Some(2), None, None]));
        assert_tiles_region(&indices, 3);
        assert_watertight(&indices, 3);
    }

    #[test]
    fn test_stitched_edge_references_only_shared_vertices() {
        let resolution = 9u32;
        let cells = resolution - 1;
        for (side, ratio) in [(Side::East, 2u32), (Side::North, 4), (Side::South, 2)] {
            let mut neighbors = [None; 4];
            neighbors[side as usize] = Some(cells / ratio + 1);
            let indices = stitched_indices(&ctx(resolution, neighbors));
            for &v in &indices {
                let (i, j) = (v % resolution, v / resolution);
                let on_edge = match side {
                    Side::North => j == 0,
                    Side::East => i == cells,
                    Side::South => j == cells,
                    Side::West => i == 0,
                };
                if on_edge {
                    let t = match side {
                        Side::North | Side::South => i,
                        Side::East | Side::West => j,
                    };
                    assert_eq!(
                        t % ratio,
                        0,
                        "edge vertex {v} at offset {t} has no coarse counterpart"
                    );
                }
            }
        }
    }

    #[test]
    fn test_interior_triangles_unchanged_by_stitching() {
        let resolution = 9u32;
        let canonical = |tri: &[u32]| {
            // Rotate so the smallest index leads; winding is preserved.
            let min = (0..3).min_by_key(|&k| tri[k]).unwrap();
            [tri[min], tri[(min + 1) % 3], tri[(min + 2) % 3]]
        };
        let uniform: Vec<[u32; 3]> = grid_indices(resolution)
            .chunks(3)
            .map(canonical)
            .collect();
        let stitched: std::collections::HashSet<[u32; 3]> =
            stitched_indices(&ctx(resolution, [Some(5), Some(3), None, Some(5)]))
                .chunks(3)
                .map(canonical)
                .collect();

        let cells = resolution - 1;
        let in_band = |v: u32| {
            let (i, j) = (v % resolution, v / resolution);
            i <= 1 || i >= cells - 1 || j <= 1 || j >= cells - 1
        };
        let mut interior_checked = 0;
        for tri in &uniform {
            if tri.iter().any(|&v| in_band(v)) {
                continue;
            }
            assert!(
                stitched.contains(tri),
                "interior triangle {tri:?} was disturbed by edge stitching"
            );
            interior_checked += 1;
        }
        assert!(interior_checked > 0, "test never saw an interior triangle");
    }

    #[test]
    fn test_restitching_is_deterministic() {
        let c = ctx(17, [Some(9), None, Some(5), None]);
        assert_eq!(stitched_indices(&c), stitched_indices(&c));
    }

    #[test]
    fn test_snap_edge_heights_interpolates() {
        let resolution = 5u32;
        let mut vertices = Vec::new();
        for j in 0..resolution {
            for i in 0..resolution {
                vertices.push(TerrainVertex {
                    // Quadratic in j so edge interpolation visibly moves heights.
                    position: [i as f32, (i * 10 + j * j) as f32, j as f32],
                    normal: [0.0, 1.0, 0.0],
                    uv: [0.0, 0.0],
                    biome: 0.0,
                });
            }
        }
        let reference = vertices.clone();
        // East edge (i = 4) against a 3-vertex neighbor: ratio 2.
        snap_edge_heights(&mut vertices, &ctx(resolution, [None, Some(3), None, None]));

        let at = |i: u32, j: u32| vertices[(j * resolution + i) as usize];
        // Odd rows on the east edge become the mean of their neighbors.
        assert_eq!(at(4, 1).position[1], (at(4, 0).position[1] + at(4, 2).position[1]) / 2.0);
        assert_eq!(at(4, 3).position[1], (at(4, 2).position[1] + at(4, 4).position[1]) / 2.0);
        // Shared rows and all off-edge vertices are untouched.
        for j in 0..resolution {
            for i in 0..resolution {
                let idx = (j * resolution + i) as usize;
                if i == 4 && j % 2 == 1 {
                    continue;
                }
                assert_eq!(
                    vertices[idx], reference[idx],
                    "vertex ({i}, {j}) should not have moved"
                );
            }
        }
    }

    #[test]
    fn test_stitched_edge_coincides_with_coarse_neighbor() {
        use regolith_gen::{CraterField, HeightField, RegionKey, TerrainArgs};
        let base = TerrainArgs::default();
        let craters = |region| {
            CraterField::generate_for_region(
                base.seed,
                region,
                &base.craters,
                base.region_width,
                base.region_depth,
            )
        };
        let fine_key = RegionKey::new(0, 0);
        let coarse_key = RegionKey::new(1, 0);
        let fine = HeightField::generate(&base.for_region(fine_key, 9), &craters(fine_key));
        let coarse = HeightField::generate(&base.for_region(coarse_key, 5), &craters(coarse_key));

        let indices = stitched_indices(&ctx(9, [None, Some(5), None, None]));
        // Every fine east-edge vertex the stitched buffer still references
        // must coincide bit-for-bit with a coarse west-edge vertex, so the
        // seam has no vertical gap at all.
        let mut checked = 0;
        for &v in &indices {
            let (i, j) = (v % 9, v / 9);
            if i != 8 {
                continue;
            }
            assert_eq!(j % 2, 0, "edge vertex at row {j} has no coarse counterpart");
            assert_eq!(
                fine.height_at(8, j),
                coarse.height_at(0, j / 2),
                "seam heights diverged at fine row {j}"
            );
            checked += 1;
        }
        assert!(checked > 0, "stitched buffer never referenced the east edge");
    }

    #[test]
    fn test_side_frames_chain_corner_to_corner() {
        let cells = 8;
        for side in Side::ALL {
            let end = side.frame(cells, 0, cells);
            let next_start = side.successor().frame(0, 0, cells);
            assert_eq!(end, next_start, "{side:?} must end where its successor starts");
            assert_eq!(side.predecessor().successor(), side);
            assert_eq!(side.opposite().opposite(), side);
        }
    }
}
