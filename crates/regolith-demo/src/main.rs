//! Headless demo: an observer flies over procedurally generated terrain
//! while the streamer builds, refines, and unloads regions around it.
//!
//! Settings are loaded from `settings.ron` and can be overridden via CLI
//! flags. Run with `cargo run -p regolith-demo` for a default flight, or
//! `cargo run -p regolith-demo -- --ticks 2000 --speed 80` for a longer,
//! faster pass.

use clap::Parser;
use glam::DVec2;
use regolith_gen::RegionKey;
use regolith_lod::ObserverState;
use regolith_settings::{CliArgs, Settings};
use regolith_stream::{StreamEvent, TerrainStreamer};
use tracing::info;

/// Simulated seconds per tick.
const TICK_DT: f64 = 0.05;
/// Wall-clock pause per tick, leaving the workers time to build.
const TICK_SLEEP_MS: u64 = 10;
/// Continuous turn rate in radians per second, so the flight sweeps a wide
/// curve across region boundaries instead of a straight line.
const TURN_RATE: f64 = 0.02;

const DEFAULT_TICKS: u64 = 600;
const DEFAULT_SPEED: f64 = 40.0;

/// Event counts accumulated over the whole flight.
#[derive(Default)]
struct EventTally {
    ready: u64,
    restitched: u64,
    retired: u64,
    removed: u64,
}

impl EventTally {
    fn absorb(&mut self, events: &[StreamEvent]) {
        for event in events {
            match event {
                StreamEvent::LevelReady { .. } => self.ready += 1,
                StreamEvent::IndicesUpdated { .. } => self.restitched += 1,
                StreamEvent::LevelRetired { .. } => self.retired += 1,
                StreamEvent::RegionRemoved { .. } => self.removed += 1,
            }
        }
    }
}

fn main() {
    let args = CliArgs::parse();

    // Resolve settings directory
    let settings_dir = args.settings.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .expect("Failed to resolve config directory")
            .join("regolith")
    });

    // Load or create settings, then apply CLI overrides
    let mut settings = match Settings::load_or_create(&settings_dir) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load settings: {e}");
            std::process::exit(1);
        }
    };
    settings.apply_cli_overrides(&args);

    // Invalid settings are fatal before any engine state exists.
    if let Err(e) = settings.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let log_dir = settings_dir.join("logs");
    regolith_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&settings));

    let ticks = args.ticks.unwrap_or(DEFAULT_TICKS);
    let speed = args.speed.unwrap_or(DEFAULT_SPEED);
    info!(
        "starting flight: {ticks} ticks at {speed} m/s over seed {}",
        settings.terrain.seed
    );

    let mut streamer = TerrainStreamer::new(&settings);
    let mut tally = EventTally::default();

    let mut position = DVec2::ZERO;
    let mut heading = 0.0_f64;

    for tick in 0..ticks {
        heading += TURN_RATE * TICK_DT;
        let forward = DVec2::from_angle(heading);
        position += forward * speed * TICK_DT;

        let observer = ObserverState::new(position, forward);
        let events = streamer.update(&observer);
        tally.absorb(&events);

        if tick % 100 == 0 {
            report_progress(&streamer, &settings, position, tick);
        }

        std::thread::sleep(std::time::Duration::from_millis(TICK_SLEEP_MS));
    }

    let stats = streamer.stats();
    info!(
        "flight complete: {} builds installed ({} stale, {} failed), {} dispatched",
        stats.completed, stats.stale_discarded, stats.failed, stats.dispatched
    );
    info!(
        "stitch cache: {} hits, {} misses",
        stats.stitch_cache_hits, stats.stitch_cache_misses
    );
    info!(
        "events: {} levels ready, {} seam updates, {} levels retired, {} regions removed",
        tally.ready, tally.restitched, tally.retired, tally.removed
    );
    info!(
        "final state: {} regions loaded, {} requests queued, {} builds in flight",
        streamer.loaded_count(),
        streamer.queued_count(),
        streamer.in_flight_count()
    );
}

/// Log where the flight is and what the terrain under it looks like.
fn report_progress(streamer: &TerrainStreamer, settings: &Settings, position: DVec2, tick: u64) {
    let width = settings.streaming.region_width;
    let depth = settings.streaming.region_depth;
    let region = RegionKey::containing(position.x, position.y, width, depth);

    let ground = streamer
        .chunk(region)
        .and_then(|entry| entry.active())
        .map(|data| data.field().sample(position.x, position.y));

    match ground {
        Some(height) => info!(
            "tick {tick}: over region {region} at ({:.0}, {:.0}), ground {height:.2}m, \
             {} regions loaded",
            position.x,
            position.y,
            streamer.loaded_count()
        ),
        None => info!(
            "tick {tick}: over region {region} at ({:.0}, {:.0}), terrain still building, \
             {} regions loaded",
            position.x,
            position.y,
            streamer.loaded_count()
        ),
    }
}
