//! Region streaming: background builds on a worker pool, chunk lifecycle
//! management, and seam stitching between neighboring detail levels.

pub mod chunk;
pub mod events;
pub mod pool;
pub mod streamer;

pub use chunk::{ChunkEntry, LevelData};
pub use events::StreamEvent;
pub use pool::{
    BuildJob, BuildOutcome, BuildPool, ChunkPayload, build_chunk_sync, default_thread_count,
};
pub use streamer::{StreamerStats, TerrainStreamer};
