// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! LED matrix presentation - colours, text scrolling, snapshot messages

mod font;

pub use font::{render_strip, Frame, Scroller, MATRIX_SIZE};

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::core::{Channel, Snapshot};
use crate::error::Result;
use crate::sensors::SenseBackend;

/// RGB colour triple as accepted by the LED matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Unlit pixel
pub const OFF: Rgb = Rgb(0, 0, 0);
/// Temperature colour
pub const RED: Rgb = Rgb(255, 0, 0);
/// Humidity colour
pub const BLUE: Rgb = Rgb(0, 0, 255);
/// Pressure colour
pub const YELLOW: Rgb = Rgb(255, 255, 0);

impl Rgb {
    /// Colour as shown with low light enabled
    pub fn dimmed(self) -> Self {
        fn dim(c: u8) -> u8 {
            if c == 0 {
                0
            } else {
                (c / 8).max(1)
            }
        }
        Rgb(dim(self.0), dim(self.1), dim(self.2))
    }

    /// Packed RGB565 as used by the Sense HAT framebuffer
    pub fn to_rgb565(self) -> u16 {
        let r = (self.0 as u16 >> 3) << 11;
        let g = (self.1 as u16 >> 2) << 5;
        let b = self.2 as u16 >> 3;
        r | g | b
    }
}

/// Block for one scroll step
pub(crate) fn pause(scroll_speed: f64) {
    if scroll_speed.is_finite() && scroll_speed > 0.0 {
        thread::sleep(Duration::from_secs_f64(scroll_speed));
    }
}

/// Formats snapshot channels as coloured scrolling messages
#[derive(Debug, Clone)]
pub struct Presenter {
    humidity: Rgb,
    temperature: Rgb,
    pressure: Rgb,
}

impl Default for Presenter {
    fn default() -> Self {
        Self {
            humidity: BLUE,
            temperature: RED,
            pressure: YELLOW,
        }
    }
}

impl Presenter {
    /// Messages for the present channels, in display order
    pub fn messages(&self, snapshot: &Snapshot) -> Vec<(String, Rgb)> {
        [Channel::Humidity, Channel::Temperature, Channel::AirPressure]
            .into_iter()
            .filter_map(|channel| {
                snapshot
                    .value(channel)
                    .map(|value| (format_message(channel, value), self.colour(channel)))
            })
            .collect()
    }

    fn colour(&self, channel: Channel) -> Rgb {
        match channel {
            Channel::Humidity => self.humidity,
            Channel::Temperature => self.temperature,
            Channel::AirPressure => self.pressure,
        }
    }

    /// Scroll every present channel of `snapshot`, one message after another
    pub fn present(
        &self,
        backend: &mut dyn SenseBackend,
        snapshot: &Snapshot,
        scroll_speed: f64,
    ) -> Result<()> {
        for (text, colour) in self.messages(snapshot) {
            debug!("Showing {:?} for {}", text, snapshot.time);
            backend.show_message(&text, scroll_speed, colour)?;
        }
        Ok(())
    }
}

/// `rH:40.0%`, `T:21.3'C`, `p:1013.2bar`
pub fn format_message(channel: Channel, value: f64) -> String {
    let value = format_value(value);
    match channel {
        Channel::Humidity => format!("rH:{}%", value),
        Channel::Temperature => format!("T:{}'C", value),
        Channel::AirPressure => format!("p:{}bar", value),
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmulatorConfig;
    use crate::sensors::Emulator;

    #[test]
    fn test_format_message() {
        assert_eq!(format_message(Channel::Humidity, 40.0), "rH:40.0%");
        assert_eq!(format_message(Channel::Temperature, -4.0), "T:-4.0'C");
        assert_eq!(format_message(Channel::Temperature, 21.3), "T:21.3'C");
        assert_eq!(format_message(Channel::AirPressure, 1013.2), "p:1013.2bar");
    }

    #[test]
    fn test_message_order_and_colours() {
        let mut snapshot = Snapshot::empty("2026-10-19_08:15");
        snapshot.temperature = Some(21.3);
        snapshot.humidity = Some(40.0);
        snapshot.air_pressure = Some(1013.0);

        let messages = Presenter::default().messages(&snapshot);
        assert_eq!(
            messages,
            vec![
                ("rH:40.0%".to_string(), BLUE),
                ("T:21.3'C".to_string(), RED),
                ("p:1013.0bar".to_string(), YELLOW),
            ]
        );
    }

    #[test]
    fn test_present_skips_absent_channels() {
        let mut emulator = Emulator::new(&EmulatorConfig::default());
        let log = emulator.message_log();
        let mut snapshot = Snapshot::empty("2026-10-19_08:15");
        snapshot.humidity = Some(40.0);

        Presenter::default().present(&mut emulator, &snapshot, 0.0).unwrap();

        let shown = log.borrow();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].text, "rH:40.0%");
        assert_eq!(shown[0].colour, BLUE);
        assert_eq!(shown[0].scroll_speed, 0.0);
    }

    #[test]
    fn test_present_empty_snapshot() {
        let mut emulator = Emulator::new(&EmulatorConfig::default());
        let log = emulator.message_log();

        Presenter::default()
            .present(&mut emulator, &Snapshot::empty("2026-10-19_08:15"), 0.0)
            .unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_rgb565() {
        assert_eq!(RED.to_rgb565(), 0xF800);
        assert_eq!(BLUE.to_rgb565(), 0x001F);
        assert_eq!(YELLOW.to_rgb565(), 0xFFE0);
        assert_eq!(OFF.to_rgb565(), 0);
    }

    #[test]
    fn test_dimmed() {
        assert_eq!(YELLOW.dimmed(), Rgb(31, 31, 0));
        assert_eq!(Rgb(3, 0, 8).dimmed(), Rgb(1, 0, 1));
    }
}
