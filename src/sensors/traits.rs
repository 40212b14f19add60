// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Backend trait and common types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::display::Rgb;
use crate::error::Result;

/// Hardware interfaces the readings can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Sense HAT mounted on the Pi
    SenseHat,
    /// Software stand-in with configured readings
    Emulator,
}

impl BackendKind {
    /// Name printed in the banner
    pub const fn label(self) -> &'static str {
        match self {
            BackendKind::SenseHat => "SenseHat",
            BackendKind::Emulator => "Emulator",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trait for the board the readings come from and the matrix they go to
pub trait SenseBackend {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Temperature from the pressure sensor, °C
    fn temperature(&mut self) -> Result<f64>;

    /// Relative humidity, %
    fn humidity(&mut self) -> Result<f64>;

    /// Air pressure, hPa
    fn pressure(&mut self) -> Result<f64>;

    /// SoC temperature, °C, used to compensate self-heating
    fn cpu_temperature(&mut self) -> Result<f64>;

    /// Scroll `text` across the matrix; returns once it has left the screen
    fn show_message(&mut self, text: &str, scroll_speed: f64, colour: Rgb) -> Result<()>;

    /// Whether the matrix is dimmed
    fn low_light(&self) -> bool;

    /// Dim or undim the matrix
    fn set_low_light(&mut self, enabled: bool);
}
