// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Reading recorder - measures snapshots and keeps them in order

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::{round1, Channel, ChannelMask, Snapshot, TIME_FORMAT};
use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::sensors::SenseBackend;

/// Tunables applied while measuring
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSettings {
    /// Multiplier applied to `temperature - cpu_temperature`
    pub compensation_factor: f64,
    /// Subtracted from the wall clock before stamping a snapshot
    pub time_offset: Duration,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            compensation_factor: 1.0,
            time_offset: Duration::zero(),
        }
    }
}

impl From<&SensorConfig> for RecorderSettings {
    fn from(config: &SensorConfig) -> Self {
        Self {
            compensation_factor: config.compensation_factor,
            time_offset: Duration::hours(config.time_offset_hours)
                + Duration::minutes(config.time_offset_minutes),
        }
    }
}

/// Takes snapshots from a backend and owns the resulting history
pub struct Recorder {
    backend: Box<dyn SenseBackend>,
    settings: RecorderSettings,
    history: Vec<Snapshot>,
}

impl Recorder {
    /// Recorder with an empty history
    pub fn new(backend: Box<dyn SenseBackend>, settings: RecorderSettings) -> Self {
        Self {
            backend,
            settings,
            history: Vec::new(),
        }
    }

    /// Measure the channels selected by `mask` and append the snapshot
    pub fn measure(&mut self, mask: ChannelMask) -> Result<&Snapshot> {
        self.measure_at(mask, Utc::now())
    }

    /// Same as [`Recorder::measure`] with an explicit wall clock
    pub fn measure_at(&mut self, mask: ChannelMask, now: DateTime<Utc>) -> Result<&Snapshot> {
        let stamp = (now - self.settings.time_offset).format(TIME_FORMAT).to_string();
        let mut snapshot = Snapshot::empty(stamp);

        for channel in mask.channels() {
            match channel {
                Channel::Temperature => {
                    snapshot.temperature = Some(self.compensated_temperature()?);
                }
                Channel::Humidity => {
                    snapshot.humidity = Some(round1(self.backend.humidity()?));
                }
                Channel::AirPressure => {
                    snapshot.air_pressure = Some(round1(self.backend.pressure()?));
                }
            }
        }

        debug!(
            "Measured {} (mask {}): T={:?} rH={:?} p={:?}",
            snapshot.time,
            mask.code(),
            snapshot.temperature,
            snapshot.humidity,
            snapshot.air_pressure
        );

        self.history.push(snapshot);
        let index = self.history.len() - 1;
        Ok(&self.history[index])
    }

    /// Board temperature minus the CPU self-heating bias
    fn compensated_temperature(&mut self) -> Result<f64> {
        let raw = round1(self.backend.temperature()?);
        let cpu = round1(self.backend.cpu_temperature()?);
        Ok(round1((raw - cpu) * self.settings.compensation_factor))
    }

    /// Snapshots in measurement order
    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.last()
    }

    /// History entry by position; negative pointers count from the end
    pub fn get(&self, pointer: isize) -> Result<&Snapshot> {
        let len = self.history.len() as isize;
        let index = if pointer < 0 { len + pointer } else { pointer };
        if index < 0 || index >= len {
            return Err(Error::NoSnapshot(pointer));
        }
        Ok(&self.history[index as usize])
    }

    /// Settings applied while measuring
    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Backend being read
    pub fn backend(&self) -> &dyn SenseBackend {
        self.backend.as_ref()
    }

    /// Mutable access to the backend
    pub fn backend_mut(&mut self) -> &mut dyn SenseBackend {
        self.backend.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::config::EmulatorConfig;
    use crate::display::Rgb;
    use crate::sensors::{BackendKind, Emulator};

    fn emulator(temperature: f64, humidity: f64, pressure: f64, cpu: f64) -> Box<dyn SenseBackend> {
        Box::new(Emulator::new(&EmulatorConfig {
            enabled: true,
            temperature,
            humidity,
            pressure,
            cpu_temperature: cpu,
            jitter: 0.0,
        }))
    }

    /// Emulator whose hygrometer is broken
    struct NoHumidity(Emulator);

    impl SenseBackend for NoHumidity {
        fn kind(&self) -> BackendKind {
            self.0.kind()
        }
        fn temperature(&mut self) -> Result<f64> {
            self.0.temperature()
        }
        fn humidity(&mut self) -> Result<f64> {
            Err(Error::Sensor("HTS221: i2c read failed".to_string()))
        }
        fn pressure(&mut self) -> Result<f64> {
            self.0.pressure()
        }
        fn cpu_temperature(&mut self) -> Result<f64> {
            self.0.cpu_temperature()
        }
        fn show_message(&mut self, text: &str, scroll_speed: f64, colour: Rgb) -> Result<()> {
            self.0.show_message(text, scroll_speed, colour)
        }
        fn low_light(&self) -> bool {
            self.0.low_light()
        }
        fn set_low_light(&mut self, enabled: bool) {
            self.0.set_low_light(enabled)
        }
    }

    fn recorder() -> Recorder {
        Recorder::new(emulator(25.0, 40.0, 1013.0, 29.0), RecorderSettings::default())
    }

    #[test]
    fn test_channel_presence_follows_mask() {
        let mut recorder = recorder();
        for code in 0..8u32 {
            let snapshot = recorder.measure(ChannelMask::new(code)).unwrap();
            assert_eq!(snapshot.temperature.is_some(), code & 1 != 0, "mask {}", code);
            assert_eq!(snapshot.humidity.is_some(), code & 2 != 0, "mask {}", code);
            assert_eq!(snapshot.air_pressure.is_some(), code & 4 != 0, "mask {}", code);
            assert!(snapshot.warning.is_none());
        }
    }

    #[test]
    fn test_cpu_compensation() {
        let mut recorder = recorder();
        let snapshot = recorder.measure(ChannelMask::ALL).unwrap().clone();

        assert_eq!(snapshot.temperature, Some(-4.0));
        assert_eq!(snapshot.humidity, Some(40.0));
        assert_eq!(snapshot.air_pressure, Some(1013.0));
    }

    #[test]
    fn test_compensation_factor() {
        let settings = RecorderSettings {
            compensation_factor: 0.5,
            ..RecorderSettings::default()
        };
        let mut recorder = Recorder::new(emulator(31.0, 40.0, 1013.0, 20.0), settings);

        let snapshot = recorder.measure(ChannelMask::new(1)).unwrap();
        assert_eq!(snapshot.temperature, Some(5.5));
    }

    #[test]
    fn test_failed_read_appends_nothing() {
        let backend = NoHumidity(Emulator::new(&EmulatorConfig::default()));
        let mut recorder = Recorder::new(Box::new(backend), RecorderSettings::default());

        assert!(matches!(recorder.measure(ChannelMask::ALL), Err(Error::Sensor(_))));
        assert!(recorder.history().is_empty());

        // channels that avoid the broken chip still record
        recorder.measure(ChannelMask::new(5)).unwrap();
        assert_eq!(recorder.history().len(), 1);
        assert!(matches!(recorder.measure(ChannelMask::new(2)), Err(Error::Sensor(_))));
        assert_eq!(recorder.history().len(), 1);
    }

    #[test]
    fn test_readings_are_rounded() {
        let mut recorder = Recorder::new(emulator(21.34, 40.36, 1013.04, 0.0), RecorderSettings::default());

        let snapshot = recorder.measure(ChannelMask::ALL).unwrap();
        assert_eq!(snapshot.temperature, Some(21.3));
        assert_eq!(snapshot.humidity, Some(40.4));
        assert_eq!(snapshot.air_pressure, Some(1013.0));
    }

    #[test]
    fn test_history_order() {
        let mut recorder = recorder();
        let masks = [1u32, 2, 4, 7, 0];
        for code in masks {
            recorder.measure(ChannelMask::new(code)).unwrap();
        }

        assert_eq!(recorder.history().len(), masks.len());
        assert!(recorder.history()[0].temperature.is_some());
        assert!(recorder.history()[1].humidity.is_some());
        assert!(recorder.history()[2].air_pressure.is_some());
        assert_eq!(recorder.latest(), recorder.history().last());
        assert!(recorder.latest().unwrap().humidity.is_none());
    }

    #[test]
    fn test_negative_pointer() {
        let mut recorder = recorder();
        recorder.measure(ChannelMask::new(1)).unwrap();
        recorder.measure(ChannelMask::new(2)).unwrap();

        assert!(recorder.get(-1).unwrap().humidity.is_some());
        assert!(recorder.get(-2).unwrap().temperature.is_some());
        assert!(recorder.get(0).unwrap().temperature.is_some());
        assert!(matches!(recorder.get(2), Err(Error::NoSnapshot(2))));
        assert!(matches!(recorder.get(-3), Err(Error::NoSnapshot(-3))));
    }

    #[test]
    fn test_timestamp_with_offset() {
        let settings = RecorderSettings {
            compensation_factor: 1.0,
            time_offset: Duration::hours(1) + Duration::minutes(30),
        };
        let mut recorder = Recorder::new(emulator(25.0, 40.0, 1013.0, 0.0), settings);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 45, 10).unwrap();

        let snapshot = recorder.measure_at(ChannelMask::NONE, now).unwrap();
        assert_eq!(snapshot.time, "2026-02-28_23:15");
    }
}
