//! The streaming orchestrator.
//!
//! [`TerrainStreamer`] owns every chunk entry, the request queue, and the
//! stitch cache. Workers never touch shared terrain state; they receive a
//! self-contained job and send a payload back. One [`TerrainStreamer::update`]
//! call per tick polls finished builds, dispatches new ones, and reconciles
//! seams, without ever blocking on a worker.

use std::sync::Arc;

use regolith_gen::{CraterParams, RegionKey, RockParams, RockPlacement, TerrainArgs};
use regolith_lod::{LevelTable, ObserverState, QueuedRequest, RequestQueue, nearest_set};
use regolith_mesh::{Side, StitchCache, StitchContext};
use regolith_settings::Settings;
use rustc_hash::FxHashMap;

use crate::chunk::{ChunkEntry, LevelData};
use crate::events::StreamEvent;
use crate::pool::{BuildJob, BuildOutcome, BuildPool, ChunkPayload, default_thread_count};

/// Upper bound on builds queued or executing at once.
const MAX_IN_FLIGHT: usize = 64;
/// Capacity of the finished-build channel.
const RESULT_CAPACITY: usize = 128;
/// Builds dispatched per tick at most, so one tick never floods the pool.
const DISPATCH_BUDGET: usize = 8;

/// Counters accumulated across the streamer's lifetime.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamerStats {
    /// Build jobs handed to the worker pool.
    pub dispatched: u64,
    /// Builds installed into chunk entries.
    pub completed: u64,
    /// Builds discarded because their generation was outdated on arrival.
    pub stale_discarded: u64,
    /// Builds that panicked on a worker.
    pub failed: u64,
    /// Spare levels dropped after their replacement became active.
    pub retired: u64,
    /// Regions unloaded after leaving the view radius.
    pub removed: u64,
    /// Stitched index buffers served from the cache.
    pub stitch_cache_hits: u64,
    /// Stitched index buffers built on a cache miss.
    pub stitch_cache_misses: u64,
}

/// Owns all mutable streaming state and drives the build lifecycle.
///
/// Single-threaded by construction: every method takes `&mut self` and all
/// cross-thread traffic flows through the worker pool's channels. Render and
/// physics consumers read chunk state between ticks.
pub struct TerrainStreamer {
    /// Template generation parameters; region and resolution are retargeted
    /// per job.
    base_args: TerrainArgs,
    table: LevelTable,
    nearest_count: usize,
    rock_prototypes: u32,
    pool: BuildPool,
    queue: RequestQueue,
    chunks: FxHashMap<RegionKey, ChunkEntry>,
    /// Per-region build generation. Bumped when a region unloads, so
    /// results from its previous life are discarded on arrival. Survives
    /// the chunk entry itself.
    generations: FxHashMap<RegionKey, u64>,
    stitch_cache: StitchCache,
    stats: StreamerStats,
}

impl TerrainStreamer {
    /// Build a streamer from validated settings.
    ///
    /// # Panics
    ///
    /// Panics if the resolution ladder or distance thresholds are invalid.
    /// [`Settings::validate`] rejects the same inputs up front with a proper
    /// error; call it first.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let streaming = &settings.streaming;
        let table = LevelTable::new(
            streaming.resolutions.clone(),
            streaming.distance_thresholds.clone(),
        );
        let threads = default_thread_count(streaming.worker_threads);
        log::info!(
            "terrain streamer: {} detail levels, view radius {}m, {threads} build workers",
            table.level_count(),
            table.view_radius(),
        );

        Self {
            base_args: base_args(settings),
            table,
            nearest_count: streaming.nearest_tier_count,
            rock_prototypes: settings.rocks.prototype_count,
            pool: BuildPool::new(threads, MAX_IN_FLIGHT, RESULT_CAPACITY),
            queue: RequestQueue::new(),
            chunks: FxHashMap::default(),
            generations: FxHashMap::default(),
            stitch_cache: StitchCache::new(streaming.stitch_cache_capacity),
            stats: StreamerStats::default(),
        }
    }

    /// Runs one streaming tick and returns the state changes it produced.
    ///
    /// Polls once and never blocks; a tick with no finished builds and no
    /// observer movement is close to free.
    pub fn update(&mut self, observer: &ObserverState) -> Vec<StreamEvent> {
        let width = self.base_args.region_width;
        let depth = self.base_args.region_depth;
        let mut events = Vec::new();

        // --- Step 1: Decide what should be loaded ---
        let visible = observer.visible_regions(self.table.view_radius(), width, depth);
        let nearest = nearest_set(&visible, self.nearest_count);
        let mut desired: FxHashMap<RegionKey, u8> = FxHashMap::default();
        for &region in &visible {
            let distance = observer.distance_to(region, width, depth);
            if let Some(level) = self.table.select_by_distance(distance) {
                desired.insert(region, level);
            }
        }

        // --- Step 2: Drop queued requests that fell out of scope ---
        let max_level = self.table.max_level();
        let chunks = &self.chunks;
        self.queue.prune(|request| match desired.get(&request.region) {
            None => false,
            Some(&want) => {
                if request.level == want {
                    true
                } else {
                    // A queued horizon fill stays useful only while the
                    // region has nothing on screen.
                    request.level == max_level
                        && chunks.get(&request.region).is_none_or(ChunkEntry::is_empty)
                }
            }
        });

        // --- Step 3: Queue missing builds ---
        for &region in &visible {
            let Some(&want) = desired.get(&region) else {
                continue;
            };
            let entry = self.chunks.get(&region);
            let has_want = entry.is_some_and(|e| e.has_level(want));
            if !has_want && !self.pool.is_pending(region, want) {
                self.queue.push(QueuedRequest::new(region, want));
            }
            // Regions with nothing built yet also request the cheap
            // coarsest level, so coverage appears before refinement lands.
            let nothing_built = entry.is_none_or(ChunkEntry::is_empty);
            if nothing_built && want != max_level && !self.pool.is_pending(region, max_level) {
                self.queue.push(QueuedRequest::new(region, max_level));
            }
        }

        // --- Step 4: Rank pending work against the current observer ---
        self.queue.sort(observer, &nearest, &self.table, width, depth);

        // --- Step 5: Dispatch up to the per-tick budget ---
        let mut dispatched = 0;
        while dispatched < DISPATCH_BUDGET
            && (self.pool.in_flight_count() as usize) < MAX_IN_FLIGHT
        {
            let Some(request) = self.queue.pop() else {
                break;
            };
            // The queue can briefly hold requests satisfied since they were
            // pushed; skip instead of rebuilding.
            let satisfied = self
                .chunks
                .get(&request.region)
                .is_some_and(|e| e.has_level(request.level));
            if satisfied || self.pool.is_pending(request.region, request.level) {
                continue;
            }
            let generation = *self.generations.entry(request.region).or_insert(0);
            let args = self
                .base_args
                .for_region(request.region, self.table.resolution(request.level));
            let job = BuildJob {
                args,
                level: request.level,
                generation,
                rock_prototypes: self.rock_prototypes,
            };
            if self.pool.submit(job).is_err() {
                // Pool is saturated; retry next tick.
                self.queue.push(request);
                break;
            }
            self.stats.dispatched += 1;
            dispatched += 1;
        }

        // --- Step 6: Install finished builds ---
        for outcome in self.pool.drain_results() {
            match outcome {
                BuildOutcome::Built(payload) => self.install_payload(*payload, &mut events),
                BuildOutcome::Failed {
                    region,
                    level,
                    message,
                    ..
                } => {
                    log::error!(
                        "build worker panicked for region {region} level {level}: {message}"
                    );
                    self.stats.failed += 1;
                }
            }
        }

        // --- Step 7: Unload regions that left the view radius ---
        let mut stale: Vec<RegionKey> = self
            .chunks
            .keys()
            .copied()
            .filter(|key| !desired.contains_key(key))
            .collect();
        stale.sort_unstable();
        for region in stale {
            self.chunks.remove(&region);
            *self.generations.entry(region).or_insert(0) += 1;
            self.pool.cancel_region(region);
            self.stats.removed += 1;
            log::debug!("unloaded region {region}");
            events.push(StreamEvent::RegionRemoved { region });
        }

        // --- Step 8: Activate levels, retire spares, restitch seams ---
        self.activate_and_stitch(&desired, &mut events);

        events
    }

    /// Sample a square height grid over a region for physics, resampled
    /// bilinearly from one built level. `None` until that level is built.
    #[must_use]
    pub fn height_grid(&self, region: RegionKey, level: u8, samples: u32) -> Option<Vec<f64>> {
        let data = self.chunks.get(&region)?.level(level)?;
        Some(data.field().resample(samples))
    }

    #[must_use]
    pub fn chunk(&self, region: RegionKey) -> Option<&ChunkEntry> {
        self.chunks.get(&region)
    }

    /// Render buffers for one built level of a region.
    #[must_use]
    pub fn mesh(&self, region: RegionKey, level: u8) -> Option<&LevelData> {
        self.chunks.get(&region)?.level(level)
    }

    /// Rock instance groups for one built level of a region.
    #[must_use]
    pub fn rocks(&self, region: RegionKey, level: u8) -> Option<&[RockPlacement]> {
        Some(self.chunks.get(&region)?.level(level)?.rocks())
    }

    /// The level a region currently renders, if any.
    #[must_use]
    pub fn active_level(&self, region: RegionKey) -> Option<u8> {
        self.chunks.get(&region)?.active_level()
    }

    pub fn loaded_regions(&self) -> impl Iterator<Item = (RegionKey, &ChunkEntry)> {
        self.chunks.iter().map(|(key, entry)| (*key, entry))
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.pool.in_flight_count()
    }

    #[must_use]
    pub fn stats(&self) -> StreamerStats {
        let mut stats = self.stats;
        stats.stitch_cache_hits = self.stitch_cache.hits();
        stats.stitch_cache_misses = self.stitch_cache.misses();
        stats
    }

    #[must_use]
    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    /// Install one finished payload unless its generation is outdated.
    fn install_payload(&mut self, payload: ChunkPayload, events: &mut Vec<StreamEvent>) {
        let current = self.generations.get(&payload.region).copied().unwrap_or(0);
        if payload.generation != current {
            log::debug!(
                "discarding stale build for region {} level {} (generation {}, now {})",
                payload.region,
                payload.level,
                payload.generation,
                current,
            );
            self.stats.stale_discarded += 1;
            return;
        }
        log::debug!(
            "region {} level {} built in {}us ({} rock groups)",
            payload.region,
            payload.level,
            payload.build_time_us,
            payload.rocks.len(),
        );

        let data = LevelData::new(
            Arc::new(payload.field),
            payload.vertices,
            Arc::new(payload.indices),
            payload.rocks,
        );
        let entry = self.chunks.entry(payload.region).or_default();
        entry.install(payload.level, data);
        self.stats.completed += 1;
        events.push(StreamEvent::LevelReady {
            region: payload.region,
            level: payload.level,
        });
    }

    /// Pick each region's render level, retire spares, and reconcile seam
    /// stitching.
    ///
    /// Two passes over a sorted key list: the first settles every region's
    /// active resolution into a read-only table, the second stitches each
    /// region against that table. No region ever reads a neighbor's state
    /// while it is still being decided.
    fn activate_and_stitch(
        &mut self,
        desired: &FxHashMap<RegionKey, u8>,
        events: &mut Vec<StreamEvent>,
    ) {
        let mut keys: Vec<RegionKey> = self.chunks.keys().copied().collect();
        keys.sort_unstable();
        let max_level = self.table.max_level();

        // Pass 1: resolve active levels.
        let mut resolved: FxHashMap<RegionKey, u32> = FxHashMap::default();
        for &region in &keys {
            let Some(&want) = desired.get(&region) else {
                continue;
            };
            let Some(entry) = self.chunks.get_mut(&region) else {
                continue;
            };
            let active = choose_active(entry, want, max_level);
            entry.set_active(active);
            if active == Some(want) {
                for level in entry.built_levels() {
                    if level != want && entry.retire(level).is_some() {
                        self.stats.retired += 1;
                        events.push(StreamEvent::LevelRetired { region, level });
                    }
                }
            }
            if let Some(level) = entry.active_level() {
                resolved.insert(region, self.table.resolution(level));
            }
        }

        // Pass 2: stitch every region against the settled table.
        for &region in &keys {
            let Some(&resolution) = resolved.get(&region) else {
                continue;
            };
            let mut neighbors = [None; 4];
            for (slot, side) in Side::ALL.iter().enumerate() {
                let (dx, dz) = side.grid_offset();
                if let Some(&neighbor_res) = resolved.get(&region.offset(dx, dz))
                    && neighbor_res < resolution
                {
                    neighbors[slot] = Some(neighbor_res);
                }
            }
            let ctx = StitchContext {
                resolution,
                neighbors,
            };

            let Some(entry) = self.chunks.get_mut(&region) else {
                continue;
            };
            let Some(level) = entry.active_level() else {
                continue;
            };
            let Some(data) = entry.active_mut() else {
                continue;
            };
            if data.stitch() == ctx {
                continue;
            }
            let indices = if ctx.any_stitched() {
                self.stitch_cache.indices(&ctx)
            } else {
                Arc::clone(data.base_indices())
            };
            data.set_active_indices(indices, ctx);
            events.push(StreamEvent::IndicesUpdated { region, level });
        }
    }
}

/// The level to render for a region wanting `want`: the desired level when
/// built, else the nearest built coarser level, else the nearest built
/// finer one.
fn choose_active(entry: &ChunkEntry, want: u8, max_level: u8) -> Option<u8> {
    if entry.has_level(want) {
        return Some(want);
    }
    let mut level = want;
    while level < max_level {
        level += 1;
        if entry.has_level(level) {
            return Some(level);
        }
    }
    (0..want).rev().find(|&level| entry.has_level(level))
}

/// Generation parameters assembled from settings, targeting the finest
/// resolution at the origin until retargeted per job.
fn base_args(settings: &Settings) -> TerrainArgs {
    TerrainArgs {
        seed: settings.terrain.seed,
        octaves: settings.terrain.octaves,
        gain: settings.terrain.gain,
        lacunarity: settings.terrain.lacunarity,
        base_frequency: settings.terrain.base_frequency,
        amplitude: settings.terrain.amplitude,
        erosion_strength: settings.terrain.erosion_strength,
        river_strength: settings.terrain.river_strength,
        lake_strength: settings.terrain.lake_strength,
        craters: CraterParams {
            density_per_km2: settings.craters.density_per_km2,
            min_radius: settings.craters.min_radius,
            max_radius: settings.craters.max_radius,
            size_exponent: settings.craters.size_exponent,
            depth_ratio: settings.craters.depth_ratio,
            rim_height_fraction: settings.craters.rim_height_fraction,
            rim_width_fraction: settings.craters.rim_width_fraction,
            floor_flatness: settings.craters.floor_flatness,
            wobble_amplitude: settings.craters.wobble_amplitude,
        },
        rocks: RockParams {
            density_constant: settings.rocks.density_constant,
            size_exponent: settings.rocks.size_exponent,
            min_diameter: settings.rocks.min_diameter,
            max_diameter: settings.rocks.max_diameter,
            level_min_diameter_scale: settings.rocks.level_min_diameter_scale,
            slope_limit: settings.rocks.slope_limit,
            relocation_attempts: settings.rocks.relocation_attempts,
            relocation_radius: settings.rocks.relocation_radius,
        },
        region_width: settings.streaming.region_width,
        region_depth: settings.streaming.region_depth,
        resolution: settings.streaming.resolutions[0],
        region: RegionKey::new(0, 0),
    }
}
