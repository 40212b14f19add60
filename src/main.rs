// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sense HAT Readings - measure and scroll environmental values
//!
//! Picks the live board (or the emulator), takes one snapshot of the
//! selected channels, scrolls it across the LED matrix and optionally
//! prints it as JSON or stores it in the configured database.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use sensehat_readings::config::BackendPreference;
use sensehat_readings::sensors::{banner, candidates, open_backend, select_backend};
use sensehat_readings::{build_info, ChannelMask, Config, EnvironmentalReadings, Gateway, NAME, VERSION};

/// Sense HAT Readings - environmental values on the LED matrix
#[derive(Parser, Debug)]
#[command(name = "sensehat-readings")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Measure temperature, humidity and air pressure on a Sense HAT")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Use the emulator, skipping the live board
    #[arg(long)]
    emulator: bool,

    /// Channel mask: 1 temperature, 2 humidity, 4 air pressure
    #[arg(long)]
    channels: Option<u32>,

    /// Seconds per one-column scroll step
    #[arg(long)]
    scroll_speed: Option<f64>,

    /// Dim the LED matrix
    #[arg(long)]
    low_light: bool,

    /// Store the snapshot in the configured database
    #[arg(long)]
    persist: bool,

    /// Print the snapshot as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", NAME, VERSION);
    debug!("Build: {:?}", build_info());

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.emulator {
        config.sensors.backend = BackendPreference::Emulator;
    }
    if let Some(code) = args.channels {
        config.display.channels = ChannelMask::new(code);
    }
    if let Some(speed) = args.scroll_speed {
        config.display.scroll_speed = speed;
    }
    if args.low_light {
        config.display.low_light = true;
    }
    if args.persist {
        config.database.enabled = true;
    }

    info!("Configuration loaded from {:?}", config_path);

    let backend = select_backend(&candidates(config.sensors.backend), |kind| {
        open_backend(kind, &config)
    })?;
    println!("{}", banner(backend.kind()));

    let mut readings = EnvironmentalReadings::from_config(backend, &config);
    readings.show_actual_data()?;

    if args.json {
        if let Some(snapshot) = readings.recorder().latest() {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
    }

    if config.database.enabled {
        let gateway = Gateway::from_config(&config.database)?;
        let inserted = readings.persist(&gateway, &config.database.location, None)?;
        info!("Stored {} new rows in {} at {}", inserted.len(), gateway.dialect(), config.database.url);
    }

    Ok(())
}
