//! Per-region bookkeeping for built detail levels.

use std::sync::Arc;

use regolith_gen::{HeightField, RockPlacement};
use regolith_mesh::{StitchContext, TerrainVertex};
use rustc_hash::FxHashMap;

/// One built detail level of a region, ready to render.
pub struct LevelData {
    field: Arc<HeightField>,
    vertices: Vec<TerrainVertex>,
    /// Unstitched full-detail indices, kept so stitching can always revert
    /// without a rebuild.
    base_indices: Arc<Vec<u32>>,
    /// Indices currently handed to the renderer.
    active_indices: Arc<Vec<u32>>,
    /// The neighbor arrangement `active_indices` was built for.
    stitch: StitchContext,
    rocks: Vec<RockPlacement>,
}

impl LevelData {
    pub fn new(
        field: Arc<HeightField>,
        vertices: Vec<TerrainVertex>,
        indices: Arc<Vec<u32>>,
        rocks: Vec<RockPlacement>,
    ) -> Self {
        let stitch = StitchContext::uniform(field.resolution());
        Self {
            field,
            vertices,
            base_indices: Arc::clone(&indices),
            active_indices: indices,
            stitch,
            rocks,
        }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn base_indices(&self) -> &Arc<Vec<u32>> {
        &self.base_indices
    }

    /// The index buffer the renderer should draw right now.
    pub fn active_indices(&self) -> &Arc<Vec<u32>> {
        &self.active_indices
    }

    pub fn stitch(&self) -> StitchContext {
        self.stitch
    }

    pub fn rocks(&self) -> &[RockPlacement] {
        &self.rocks
    }

    /// Swap in a replacement index buffer for a new neighbor arrangement.
    pub(crate) fn set_active_indices(&mut self, indices: Arc<Vec<u32>>, stitch: StitchContext) {
        self.active_indices = indices;
        self.stitch = stitch;
    }
}

/// All state the orchestrator keeps for one loaded region.
///
/// A region can hold several built levels at once while a refinement is in
/// flight; exactly one is active for rendering. Spare levels are retired
/// once the desired one is active.
#[derive(Default)]
pub struct ChunkEntry {
    levels: FxHashMap<u8, LevelData>,
    active_level: Option<u8>,
}

impl ChunkEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a built level, replacing any previous build of it.
    pub(crate) fn install(&mut self, level: u8, data: LevelData) {
        self.levels.insert(level, data);
    }

    /// Drop a built level, clearing the active marker if it pointed there.
    pub(crate) fn retire(&mut self, level: u8) -> Option<LevelData> {
        let removed = self.levels.remove(&level);
        if self.active_level == Some(level) {
            self.active_level = None;
        }
        removed
    }

    pub(crate) fn set_active(&mut self, level: Option<u8>) {
        debug_assert!(level.is_none_or(|l| self.levels.contains_key(&l)));
        self.active_level = level;
    }

    pub fn has_level(&self, level: u8) -> bool {
        self.levels.contains_key(&level)
    }

    pub fn level(&self, level: u8) -> Option<&LevelData> {
        self.levels.get(&level)
    }

    /// The level currently rendered, if any build has landed yet.
    pub fn active_level(&self) -> Option<u8> {
        self.active_level
    }

    /// Data of the active level.
    pub fn active(&self) -> Option<&LevelData> {
        self.levels.get(&self.active_level?)
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut LevelData> {
        self.levels.get_mut(&self.active_level?)
    }

    /// Built level indices, finest first.
    pub fn built_levels(&self) -> Vec<u8> {
        let mut levels: Vec<u8> = self.levels.keys().copied().collect();
        levels.sort_unstable();
        levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regolith_gen::RegionKey;

    fn flat_level(resolution: u32) -> LevelData {
        let field = HeightField::from_heights(
            RegionKey::new(0, 0),
            resolution,
            64.0,
            64.0,
            vec![0.0; (resolution * resolution) as usize],
        );
        let indices = Arc::new(regolith_mesh::grid_indices(resolution));
        LevelData::new(Arc::new(field), Vec::new(), indices, Vec::new())
    }

    #[test]
    fn test_install_and_active_selection() {
        let mut entry = ChunkEntry::new();
        assert!(entry.is_empty());
        assert_eq!(entry.active_level(), None);

        entry.install(1, flat_level(5));
        entry.set_active(Some(1));
        assert_eq!(entry.active_level(), Some(1));
        assert_eq!(entry.active().unwrap().field().resolution(), 5);
    }

    #[test]
    fn test_retire_clears_active_marker() {
        let mut entry = ChunkEntry::new();
        entry.install(0, flat_level(9));
        entry.install(1, flat_level(5));
        entry.set_active(Some(1));

        assert!(entry.retire(1).is_some());
        assert_eq!(entry.active_level(), None);
        assert!(entry.has_level(0));
        assert_eq!(entry.built_levels(), vec![0]);
    }

    #[test]
    fn test_new_level_starts_unstitched() {
        let data = flat_level(9);
        assert_eq!(data.stitch(), StitchContext::uniform(9));
        assert!(Arc::ptr_eq(data.active_indices(), data.base_indices()));
    }

    #[test]
    fn test_set_active_indices_reverts_cleanly() {
        let mut data = flat_level(9);
        let stitched = StitchContext {
            resolution: 9,
            neighbors: [None, Some(5), None, None],
        };
        let replacement = Arc::new(regolith_mesh::stitched_indices(&stitched));
        data.set_active_indices(Arc::clone(&replacement), stitched);
        assert!(Arc::ptr_eq(data.active_indices(), &replacement));
        assert_eq!(data.stitch(), stitched);

        let base = Arc::clone(data.base_indices());
        data.set_active_indices(Arc::clone(&base), StitchContext::uniform(9));
        assert!(Arc::ptr_eq(data.active_indices(), data.base_indices()));
    }
}
