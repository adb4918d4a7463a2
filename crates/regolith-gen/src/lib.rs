//! Deterministic terrain generation for a streamed planetary surface.
//!
//! Everything in this crate is a pure function of the world seed and the
//! region being generated: layered noise terrain, impact craters, the
//! sampled height grid, and instanced rock scatter. No global state, no
//! wall-clock input, no thread-order dependence. Two machines with the
//! same seed build the same world, bit for bit.

mod args;
mod crater;
mod field;
mod height;
mod power_law;
mod rocks;
mod seed;

pub use args::{CraterParams, RegionKey, RockParams, TerrainArgs};
pub use crater::{Crater, CraterField};
pub use field::HeightField;
pub use height::{Biome, HeightEvaluator, HeightSample};
pub use power_law::{poisson_count, sample_power_law};
pub use rocks::{RockPlacement, place_rocks};
pub use seed::{derive_region_seed, region_rng};
