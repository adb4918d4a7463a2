//! Priority queue for pending chunk build requests.
//!
//! Requests are scored additively, lower is more urgent, and fall into three
//! tiers. Regions in the nearest set fill toward their target level first,
//! then every visible region gets its coarsest horizon level, then remaining
//! refinements run coarsest-first. Within a tier, distance orders requests
//! and regions ahead of the observer edge out regions behind.

use regolith_gen::RegionKey;
use rustc_hash::FxHashSet;

use crate::levels::LevelTable;
use crate::observer::ObserverState;

/// Score units per unit of the directional bias, which spans [-1, 1].
const DIRECTION_WEIGHT: f64 = 16.0;
/// Per missing level inside the nearest tier, in view radii.
const NEAREST_LEVEL_FACTOR: f64 = 2.0;
/// Base offset of the horizon tier, in view radii.
const HORIZON_BASE_FACTOR: f64 = 100.0;
/// Base offset of the standard tier, in view radii.
const STANDARD_BASE_FACTOR: f64 = 200.0;
/// Per missing level inside the standard tier, in view radii. Larger than
/// any in-range distance so a coarser request always precedes a finer one.
const LEVEL_PENALTY_FACTOR: f64 = 4.0;

/// One pending build: produce `region` at detail `level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueuedRequest {
    pub region: RegionKey,
    pub level: u8,
}

impl QueuedRequest {
    #[must_use]
    pub fn new(region: RegionKey, level: u8) -> Self {
        Self { region, level }
    }
}

#[derive(Clone, Debug)]
struct ScoredEntry {
    score: f64,
    request: QueuedRequest,
}

/// Deduplicated request queue, re-scored against the observer each tick.
///
/// Call [`RequestQueue::sort`] after pushing or pruning; [`RequestQueue::pop`]
/// then returns the most urgent request of the latest sort. Entries pushed
/// after a sort rank last until the next one.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: Vec<ScoredEntry>,
    members: FxHashSet<QueuedRequest>,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            members: FxHashSet::default(),
        }
    }

    /// Adds a request unless an identical one is already queued.
    /// Returns whether the request was inserted.
    pub fn push(&mut self, request: QueuedRequest) -> bool {
        if !self.members.insert(request) {
            return false;
        }
        self.entries.push(ScoredEntry {
            score: f64::MAX,
            request,
        });
        true
    }

    /// Re-scores every entry and orders the queue worst-first, so popping
    /// from the end yields the most urgent request.
    pub fn sort(
        &mut self,
        observer: &ObserverState,
        nearest: &FxHashSet<RegionKey>,
        table: &LevelTable,
        region_width: f64,
        region_depth: f64,
    ) {
        let view_radius = table.view_radius();
        let max_level = table.max_level();
        for entry in &mut self.entries {
            entry.score = request_score(
                entry.request,
                observer,
                nearest,
                max_level,
                view_radius,
                region_width,
                region_depth,
            );
        }
        self.entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.request.cmp(&a.request))
        });
    }

    /// Removes and returns the most urgent request of the latest sort.
    pub fn pop(&mut self) -> Option<QueuedRequest> {
        let entry = self.entries.pop()?;
        self.members.remove(&entry.request);
        Some(entry.request)
    }

    /// Drops every request for which `keep` returns false.
    pub fn prune(&mut self, mut keep: impl FnMut(&QueuedRequest) -> bool) {
        let members = &mut self.members;
        self.entries.retain(|entry| {
            if keep(&entry.request) {
                true
            } else {
                members.remove(&entry.request);
                false
            }
        });
    }

    #[must_use]
    pub fn contains(&self, request: QueuedRequest) -> bool {
        self.members.contains(&request)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.members.clear();
    }
}

fn request_score(
    request: QueuedRequest,
    observer: &ObserverState,
    nearest: &FxHashSet<RegionKey>,
    max_level: u8,
    view_radius: f64,
    region_width: f64,
    region_depth: f64,
) -> f64 {
    let center = request.region.center(region_width, region_depth);
    let distance = observer.distance_to(request.region, region_width, region_depth);
    let direction = -observer.ahead_factor(center) * DIRECTION_WEIGHT;
    let deficit = f64::from(max_level - request.level);

    if nearest.contains(&request.region) {
        deficit * NEAREST_LEVEL_FACTOR * view_radius + distance + direction
    } else if request.level == max_level {
        HORIZON_BASE_FACTOR * view_radius + distance + direction
    } else {
        STANDARD_BASE_FACTOR * view_radius
            + deficit * LEVEL_PENALTY_FACTOR * view_radius
            + distance
            + direction
    }
}
