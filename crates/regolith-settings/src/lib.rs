//! Settings system for the Regolith terrain engine.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, startup validation,
//! and forward/backward compatible serialization.

mod cli;
mod error;
mod settings;

pub use cli::CliArgs;
pub use error::SettingsError;
pub use settings::{
    CraterSettings, DebugSettings, RockSettings, Settings, StreamingSettings, TerrainSettings,
};
