//! LRU cache for stitched index buffers.
//!
//! Stitched index buffers depend only on the region's resolution and the
//! coarser-neighbor pattern, not on the region itself, so a handful of
//! distinct buffers serve an entire scene. Buffers are shared as `Arc` so a
//! cache eviction never invalidates a mesh still holding one.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::stitch::{StitchContext, stitched_indices};

pub struct StitchCache {
    entries: FxHashMap<StitchContext, Arc<Vec<u32>>>,
    order: VecDeque<StitchContext>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl StitchCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups served from the cache since construction.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to build a buffer since construction.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Fetch the index buffer for a stitch pattern, building it on miss.
    ///
    /// Hits refresh recency; when full, the least recently used pattern is
    /// evicted.
    pub fn indices(&mut self, ctx: &StitchContext) -> Arc<Vec<u32>> {
        if let Some(hit) = self.entries.get(ctx) {
            self.hits += 1;
            let buffer = Arc::clone(hit);
            if let Some(pos) = self.order.iter().position(|k| k == ctx) {
                self.order.remove(pos);
                self.order.push_back(*ctx);
            }
            return buffer;
        }

        self.misses += 1;
        let built = Arc::new(stitched_indices(ctx));
        if self.entries.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.entries.remove(&oldest);
        }
        self.order.push_back(*ctx);
        self.entries.insert(*ctx, Arc::clone(&built));
        built
    }
}
