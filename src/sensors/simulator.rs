// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sense HAT emulator for demo/testing

use rand::prelude::*;
use rand_distr::Normal;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

use super::{BackendKind, SenseBackend};
use crate::config::EmulatorConfig;
use crate::display::{pause, Frame, Rgb, Scroller, MATRIX_SIZE, OFF};
use crate::error::{Error, Result};

/// A message the emulated matrix has scrolled
#[derive(Debug, Clone, PartialEq)]
pub struct ShownMessage {
    /// Scrolled text
    pub text: String,
    /// Requested colour, before dimming
    pub colour: Rgb,
    /// Seconds per step
    pub scroll_speed: f64,
    /// Frames drawn
    pub frames: usize,
}

/// Shared view of everything the emulator has displayed
pub type MessageLog = Rc<RefCell<Vec<ShownMessage>>>;

/// Emulates the board with fixed readings plus optional Gaussian noise
pub struct Emulator {
    config: EmulatorConfig,
    rng: StdRng,
    low_light: bool,
    matrix: Frame,
    shown: MessageLog,
}

impl Emulator {
    /// Emulator reporting `config`'s values, entropy-seeded
    pub fn new(config: &EmulatorConfig) -> Self {
        Self {
            config: config.clone(),
            rng: StdRng::from_entropy(),
            low_light: false,
            matrix: [[OFF; MATRIX_SIZE]; MATRIX_SIZE],
            shown: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Same as [`Emulator::new`] with a reproducible noise source
    pub fn with_seed(config: &EmulatorConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(config)
        }
    }

    /// Handle on the shown-message log that outlives boxing the emulator
    pub fn message_log(&self) -> MessageLog {
        Rc::clone(&self.shown)
    }

    /// Last frame drawn
    pub fn matrix(&self) -> &Frame {
        &self.matrix
    }

    fn sample(&mut self, base: f64) -> Result<f64> {
        if self.config.jitter <= 0.0 {
            return Ok(base);
        }
        let noise = Normal::new(0.0, self.config.jitter)
            .map_err(|e| Error::Sensor(format!("emulator jitter: {}", e)))?;
        Ok(base + self.rng.sample::<f64, _>(noise))
    }
}

impl SenseBackend for Emulator {
    fn kind(&self) -> BackendKind {
        BackendKind::Emulator
    }

    fn temperature(&mut self) -> Result<f64> {
        self.sample(self.config.temperature)
    }

    fn humidity(&mut self) -> Result<f64> {
        Ok(self.sample(self.config.humidity)?.clamp(0.0, 100.0))
    }

    fn pressure(&mut self) -> Result<f64> {
        Ok(self.sample(self.config.pressure)?.max(0.0))
    }

    fn cpu_temperature(&mut self) -> Result<f64> {
        Ok(self.config.cpu_temperature)
    }

    fn show_message(&mut self, text: &str, scroll_speed: f64, colour: Rgb) -> Result<()> {
        info!("[matrix] {}", text);
        let lit = if self.low_light { colour.dimmed() } else { colour };
        let mut frames = 0;
        for frame in Scroller::new(text, lit) {
            self.matrix = frame;
            frames += 1;
            pause(scroll_speed);
        }
        self.shown.borrow_mut().push(ShownMessage {
            text: text.to_string(),
            colour,
            scroll_speed,
            frames,
        });
        Ok(())
    }

    fn low_light(&self) -> bool {
        self.low_light
    }

    fn set_low_light(&mut self, enabled: bool) {
        self.low_light = enabled;
    }
}
