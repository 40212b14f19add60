// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sense HAT Readings - environmental readings on a Raspberry Pi
//!
//! Reads temperature, humidity and air pressure from a Sense HAT (or an
//! emulator when no board is attached), compensates the temperature for
//! CPU heat, scrolls the values across the LED matrix and optionally
//! stores them in SQLite or PostgreSQL.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Adapter    │ → │   Recorder   │ → │  Presenter   │
//! │ board / emu  │   │  snapshots   │   │  LED matrix  │
//! └──────────────┘   └──────────────┘   └──────────────┘
//!                           ↓
//!                    ┌──────────────┐
//!                    │   Gateway    │
//!                    │ users / meas │
//!                    └──────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod config;
pub mod core;
pub mod db;
pub mod display;
pub mod error;
pub mod sensors;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{ChannelMask, EnvironmentalReadings, Recorder, Snapshot};
pub use db::{Gateway, Session, Table};
pub use display::Presenter;
pub use error::{Error, Result};
pub use sensors::{BackendKind, SenseBackend};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Display name
pub const NAME: &str = "Sense HAT Readings";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "hardware")]
    features.push("hardware".to_string());

    #[cfg(feature = "postgres")]
    features.push("postgres".to_string());

    features
}
