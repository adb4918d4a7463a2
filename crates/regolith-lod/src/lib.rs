//! Level-of-detail policy: resolution ladders, level selection, observer
//! visibility queries, and the build request priority queue.

mod levels;
mod observer;
mod queue;

pub use levels::{LevelTable, ScreenSpaceParams};
pub use observer::{ObserverState, nearest_set};
pub use queue::{QueuedRequest, RequestQueue};
