//! Region meshing: vertex/index buffer construction and crack-free
//! detail-boundary stitching for streamed terrain.

pub mod buffers;
pub mod cache;
pub mod stitch;

pub use buffers::{MeshBuffers, TerrainVertex, build_region_mesh};
pub use cache::StitchCache;
pub use stitch::{Side, StitchContext, grid_indices, snap_edge_heights, stitched_indices};
