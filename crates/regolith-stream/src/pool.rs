//! Background region builds on a worker thread pool.
//!
//! A region build runs the whole generation pipeline: noise synthesis,
//! crater overlay, mesh construction, and rock scattering. That is far too
//! slow for the orchestrator thread, so builds execute on named worker
//! threads and finished payloads come back over a bounded channel. A build
//! that panics is caught on the worker and reported as a failed outcome;
//! the pool itself keeps running.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use regolith_gen::{
    CraterField, HeightField, RegionKey, RockPlacement, TerrainArgs, place_rocks,
};
use regolith_mesh::{TerrainVertex, build_region_mesh};

/// A request to build one region at one detail level.
#[derive(Clone, Debug)]
pub struct BuildJob {
    /// Generation parameters already retargeted at the region and
    /// resolution to build.
    pub args: TerrainArgs,
    /// Detail level the resolution was taken from.
    pub level: u8,
    /// The region's generation counter at dispatch time. The orchestrator
    /// discards any result stamped with an outdated counter.
    pub generation: u64,
    /// Rock prototypes available for instancing.
    pub rock_prototypes: u32,
}

/// Everything one finished build hands back to the orchestrator.
#[derive(Debug)]
pub struct ChunkPayload {
    pub region: RegionKey,
    pub level: u8,
    pub generation: u64,
    /// The sampled height grid, kept for physics queries and resampling.
    pub field: HeightField,
    /// Render vertices, positioned relative to the region center.
    pub vertices: Vec<TerrainVertex>,
    /// Uniform full-detail index buffer.
    pub indices: Vec<u32>,
    /// Rock instances grouped by prototype.
    pub rocks: Vec<RockPlacement>,
    /// Build wall time in microseconds.
    pub build_time_us: u64,
}

/// Outcome of one worker job.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The build finished and is ready to install.
    Built(Box<ChunkPayload>),
    /// The build panicked on its worker thread.
    Failed {
        region: RegionKey,
        level: u8,
        generation: u64,
        message: String,
    },
}

impl BuildOutcome {
    /// The region this outcome belongs to.
    #[must_use]
    pub fn region(&self) -> RegionKey {
        match self {
            BuildOutcome::Built(payload) => payload.region,
            BuildOutcome::Failed { region, .. } => *region,
        }
    }

    /// The detail level this outcome belongs to.
    #[must_use]
    pub fn level(&self) -> u8 {
        match self {
            BuildOutcome::Built(payload) => payload.level,
            BuildOutcome::Failed { level, .. } => *level,
        }
    }
}

/// Internal wrapper carrying a job and its cancellation flag.
struct ActiveJob {
    job: BuildJob,
    cancelled: Arc<AtomicBool>,
}

/// Manages region builds across a thread pool.
pub struct BuildPool {
    /// Sender for submitting build jobs.
    job_sender: Sender<ActiveJob>,
    /// Receiver for collecting finished builds on the orchestrator thread.
    result_receiver: Receiver<BuildOutcome>,
    /// Cancellation flag per pending build, keyed by region and level.
    active: Arc<DashMap<(RegionKey, u8), Arc<AtomicBool>>>,
    /// Current number of in-flight jobs.
    in_flight: Arc<AtomicU64>,
}

impl BuildPool {
    /// Create a pool with the given worker count and queue capacities.
    ///
    /// `max_concurrent` bounds the job queue; excess submissions are
    /// rejected. `result_capacity` bounds the finished-build channel, so
    /// workers stall rather than pile up memory if results go undrained.
    pub fn new(thread_count: usize, max_concurrent: usize, result_capacity: usize) -> Self {
        let (job_sender, job_receiver) = bounded::<ActiveJob>(max_concurrent * 2);
        let (result_sender, result_receiver) = bounded::<BuildOutcome>(result_capacity);
        let in_flight = Arc::new(AtomicU64::new(0));

        for _ in 0..thread_count {
            let receiver = job_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name("mesh-build-worker".into())
                .spawn(move || {
                    while let Ok(active) = receiver.recv() {
                        // Check cancellation before starting work.
                        if active.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let outcome = run_job(&active.job);

                        // Check cancellation after the build.
                        if !active.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(outcome);
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("Failed to spawn mesh build worker thread");
        }

        Self {
            job_sender,
            result_receiver,
            active: Arc::new(DashMap::new()),
            in_flight,
        }
    }

    /// Submit a region build for background execution.
    ///
    /// Returns `Ok(())` if the job was queued, or `Err(job)` if the queue
    /// is full.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, job: BuildJob) -> Result<(), BuildJob> {
        let key = (job.args.region, job.level);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active.insert(key, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let active = ActiveJob {
            job: job.clone(),
            cancelled,
        };
        self.job_sender.try_send(active).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            let key = {
                let inner = e.into_inner();
                (inner.job.args.region, inner.job.level)
            };
            self.active.remove(&key);
            job
        })
    }

    /// Cancel a pending build for one region and level.
    ///
    /// A build that already completed is unaffected; its result is still
    /// delivered and must be filtered by generation on arrival.
    pub fn cancel(&self, region: RegionKey, level: u8) {
        if let Some((_, cancelled)) = self.active.remove(&(region, level)) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Cancel every pending build for a region, across all levels.
    pub fn cancel_region(&self, region: RegionKey) {
        self.active.retain(|key, cancelled| {
            if key.0 == region {
                cancelled.store(true, Ordering::Relaxed);
                false
            } else {
                true
            }
        });
    }

    /// Drain all finished builds from the result channel.
    ///
    /// Call this once per tick on the orchestrator thread.
    pub fn drain_results(&self) -> Vec<BuildOutcome> {
        let mut results = Vec::new();
        while let Ok(outcome) = self.result_receiver.try_recv() {
            self.active.remove(&(outcome.region(), outcome.level()));
            results.push(outcome);
        }
        results
    }

    /// Number of jobs currently in flight (queued or executing).
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if a build for the given region and level is pending.
    pub fn is_pending(&self, region: RegionKey, level: u8) -> bool {
        self.active.contains_key(&(region, level))
    }
}

/// Worker count for a configured setting, where 0 means hardware-based:
/// all cores minus headroom for the orchestrator and render threads.
pub fn default_thread_count(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}

/// Run one job with panic isolation, timing the build.
fn run_job(job: &BuildJob) -> BuildOutcome {
    let start = std::time::Instant::now();
    match catch_unwind(AssertUnwindSafe(|| build_chunk_sync(job))) {
        Ok(mut payload) => {
            payload.build_time_us = start.elapsed().as_micros() as u64;
            BuildOutcome::Built(Box::new(payload))
        }
        Err(panic) => BuildOutcome::Failed {
            region: job.args.region,
            level: job.level,
            generation: job.generation,
            message: panic_message(panic.as_ref()),
        },
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Build a region synchronously. This is the CPU-intensive pipeline that
/// runs on worker threads.
///
/// Stage order is fixed: craters need only the parameters, the height grid
/// folds the crater offsets in, meshing reads the finished grid, and rock
/// placement samples the grid for ground height and slope.
pub fn build_chunk_sync(job: &BuildJob) -> ChunkPayload {
    let args = &job.args;
    let craters = CraterField::generate_for_region(
        args.seed,
        args.region,
        &args.craters,
        args.region_width,
        args.region_depth,
    );
    let field = HeightField::generate(args, &craters);
    let mesh = build_region_mesh(&field);
    let rocks = place_rocks(&field, args, job.level, job.rock_prototypes);

    ChunkPayload {
        region: args.region,
        level: job.level,
        generation: job.generation,
        field,
        vertices: mesh.vertices,
        indices: mesh.indices,
        rocks,
        build_time_us: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_for(region: RegionKey, resolution: u32) -> BuildJob {
        let args = TerrainArgs::default().for_region(region, resolution);
        BuildJob {
            args,
            level: 1,
            generation: 0,
            rock_prototypes: 4,
        }
    }

    #[test]
    fn test_build_chunk_sync_is_deterministic() {
        let job = job_for(RegionKey::new(3, -2), 9);
        let a = build_chunk_sync(&job);
        let b = build_chunk_sync(&job);

        assert_eq!(a.field.heights(), b.field.heights());
        assert_eq!(a.indices, b.indices);
        assert_eq!(a.rocks, b.rocks);
        assert_eq!(a.vertices.len(), b.vertices.len());
    }

    #[test]
    fn test_payload_shapes_match_resolution() {
        let job = job_for(RegionKey::new(0, 0), 9);
        let payload = build_chunk_sync(&job);

        assert_eq!(payload.vertices.len(), 81);
        assert_eq!(payload.indices.len(), 8 * 8 * 6);
        assert_eq!(payload.region, RegionKey::new(0, 0));
        assert_eq!(payload.level, 1);
    }

    #[test]
    fn test_pool_delivers_all_submitted_jobs() {
        let pool = BuildPool::new(4, 64, 128);

        let mut submitted = 0;
        for x in 0..4_i32 {
            for z in 0..4_i32 {
                let job = job_for(RegionKey::new(x, z), 9);
                if pool.submit(job).is_ok() {
                    submitted += 1;
                }
            }
        }
        assert_eq!(submitted, 16);

        let mut received = 0;
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
        while received < submitted && std::time::Instant::now() < deadline {
            received += pool.drain_results().len();
            if received < submitted {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        }

        assert_eq!(
            received, submitted,
            "should receive all submitted builds: got {received}/{submitted}"
        );
        assert_eq!(pool.in_flight_count(), 0);
    }

    #[test]
    fn test_pending_tracking() {
        let pool = BuildPool::new(1, 64, 64);
        let region = RegionKey::new(7, 7);

        assert!(!pool.is_pending(region, 1));
        let _ = pool.submit(job_for(region, 9));
        assert!(pool.is_pending(region, 1));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while pool.in_flight_count() > 0 && std::time::Instant::now() < deadline {
            let _ = pool.drain_results();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let _ = pool.drain_results();
        assert!(!pool.is_pending(region, 1));
    }

    #[test]
    fn test_cancel_region_clears_pending_flags() {
        let pool = BuildPool::new(1, 64, 64);
        let region = RegionKey::new(2, 2);

        let _ = pool.submit(job_for(region, 9));
        let mut other = job_for(region, 5);
        other.level = 2;
        let _ = pool.submit(other);

        pool.cancel_region(region);
        assert!(!pool.is_pending(region, 1));
        assert!(!pool.is_pending(region, 2));
        // Results may still arrive for builds that finished before the
        // cancellation landed; correctness relies on generation checks.
    }

    #[test]
    fn test_panic_message_extraction() {
        let panic = catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(panic.as_ref()), "boom");

        let panic = catch_unwind(|| std::panic::panic_any(42_u32)).unwrap_err();
        assert_eq!(panic_message(panic.as_ref()), "unknown panic");
    }

    #[test]
    fn test_default_thread_count() {
        assert_eq!(default_thread_count(3), 3);
        assert!(default_thread_count(0) >= 1);
    }
}
