// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::ChannelMask;
use crate::sensors::DEFAULT_PROBE_COMMAND;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// LED matrix configuration
    pub display: DisplayConfig,

    /// Sensor configuration
    pub sensors: SensorConfig,

    /// Emulator configuration
    pub emulator: EmulatorConfig,

    /// Database configuration
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "sensehat-readings".to_string(),
            log_level: "info".to_string(),
            display: DisplayConfig::default(),
            sensors: SensorConfig::default(),
            emulator: EmulatorConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("sensehat-readings"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// LED matrix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Dim the matrix
    pub low_light: bool,

    /// Seconds per one-column shift
    pub scroll_speed: f64,

    /// Channel mask (1 temperature, 2 humidity, 4 pressure)
    pub channels: ChannelMask,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            low_light: false,
            scroll_speed: 0.1,
            channels: ChannelMask::ALL,
        }
    }
}

/// Which backend to open
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Live board, falling back to the emulator
    #[default]
    Auto,
    /// Live board only
    SenseHat,
    /// Emulator only
    Emulator,
}

/// Sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Backend to open
    pub backend: BackendPreference,

    /// I2C bus number
    pub i2c_bus: u8,

    /// sysfs name of the matrix framebuffer
    pub framebuffer_name: String,

    /// Command printing `temp=<float>'C`
    pub cpu_probe_command: String,

    /// Multiplier on the CPU-compensated temperature
    pub compensation_factor: f64,

    /// Hours subtracted from the clock when stamping snapshots
    pub time_offset_hours: i64,
    /// Minutes subtracted on top of `time_offset_hours`
    pub time_offset_minutes: i64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            i2c_bus: 1,
            framebuffer_name: crate::sensors::FRAMEBUFFER_NAME.to_string(),
            cpu_probe_command: DEFAULT_PROBE_COMMAND.to_string(),
            compensation_factor: 1.0,
            time_offset_hours: 0,
            time_offset_minutes: 0,
        }
    }
}

/// Emulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Allow falling back to the emulator
    pub enabled: bool,
    /// Ambient temperature, °C
    pub temperature: f64,
    /// Relative humidity, %
    pub humidity: f64,
    /// Air pressure, hPa
    pub pressure: f64,
    /// Reported SoC temperature, °C
    pub cpu_temperature: f64,
    /// Standard deviation of the noise added to each reading
    pub jitter: f64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature: 25.0,
            humidity: 40.0,
            pressure: 1013.0,
            cpu_temperature: 0.0,
            jitter: 0.0,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Enable database storage
    pub enabled: bool,

    /// `SQLite` or `PostGreSQL`
    pub dialect: String,

    /// File path for SQLite, connection string for PostgreSQL
    pub url: String,

    /// Value stored in `measurement_locat`
    pub location: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dialect: "SQLite".to_string(),
            url: "./data/sensehat.db".to_string(),
            location: "raspberrypi".to_string(),
        }
    }
}
