//! Streaming lifecycle events for downstream render and physics systems.

use regolith_gen::RegionKey;

/// State changes produced by one orchestrator tick.
///
/// Consumers that mirror GPU buffers react to these instead of diffing the
/// whole chunk table every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A newly built level was installed for a region. Vertex, index, and
    /// rock buffers for it are ready to upload.
    LevelReady { region: RegionKey, level: u8 },
    /// The region's active index buffer was swapped, either to stitch
    /// toward a coarser neighbor or to revert to the uniform grid.
    IndicesUpdated { region: RegionKey, level: u8 },
    /// A spare built level was dropped after the desired one became active.
    LevelRetired { region: RegionKey, level: u8 },
    /// The region left the view radius and was unloaded entirely.
    RegionRemoved { region: RegionKey },
}

impl StreamEvent {
    /// The region this event concerns.
    #[must_use]
    pub fn region(&self) -> RegionKey {
        match self {
            StreamEvent::LevelReady { region, .. }
            | StreamEvent::IndicesUpdated { region, .. }
            | StreamEvent::LevelRetired { region, .. }
            | StreamEvent::RegionRemoved { region } => *region,
        }
    }
}
