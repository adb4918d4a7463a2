//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Settings;

/// Regolith terrain engine command-line arguments.
///
/// CLI values override settings loaded from `settings.ron`.
#[derive(Parser, Debug)]
#[command(name = "regolith", about = "Regolith terrain streaming engine")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Background build worker count (0 = auto).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Closest-region count that always schedules first.
    #[arg(long)]
    pub nearest_tier: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to settings directory (overrides default location).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Observer ticks to simulate before exiting (demo binary).
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Observer speed in meters per second (demo binary).
    #[arg(long)]
    pub speed: Option<f64>,
}

impl Settings {
    /// Apply CLI overrides to loaded settings.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(workers) = args.workers {
            self.streaming.worker_threads = workers;
        }
        if let Some(nearest) = args.nearest_tier {
            self.streaming.nearest_tier_count = nearest;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut settings = Settings::default();
        let args = CliArgs {
            seed: Some(1234),
            workers: Some(2),
            nearest_tier: None,
            log_level: Some("debug".to_string()),
            settings: None,
            ticks: None,
            speed: None,
        };
        settings.apply_cli_overrides(&args);
        assert_eq!(settings.terrain.seed, 1234);
        assert_eq!(settings.streaming.worker_threads, 2);
        assert_eq!(settings.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(settings.streaming.nearest_tier_count, 4);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Settings::default();
        let mut settings = Settings::default();
        let args = CliArgs {
            seed: None,
            workers: None,
            nearest_tier: None,
            log_level: None,
            settings: None,
            ticks: None,
            speed: None,
        };
        settings.apply_cli_overrides(&args);
        assert_eq!(settings, original);
    }
}
