// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Measure, show and store environmental readings from one board

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::{ChannelMask, Recorder, RecorderSettings, Snapshot, TIME_FORMAT};
use crate::config::Config;
use crate::db::{Gateway, Record, Session, Table, Value};
use crate::display::Presenter;
use crate::error::Result;
use crate::sensors::SenseBackend;

/// Recorder plus presenter, configured once and driven by the CLI
pub struct EnvironmentalReadings {
    recorder: Recorder,
    presenter: Presenter,
    channels: ChannelMask,
    scroll_speed: f64,
}

impl EnvironmentalReadings {
    /// Facade over `backend`; applies `low_light` right away
    pub fn new(
        mut backend: Box<dyn SenseBackend>,
        channels: ChannelMask,
        scroll_speed: f64,
        low_light: bool,
        settings: RecorderSettings,
    ) -> Self {
        backend.set_low_light(low_light);
        Self {
            recorder: Recorder::new(backend, settings),
            presenter: Presenter::default(),
            channels,
            scroll_speed,
        }
    }

    /// Facade configured from the `display` and `sensors` sections
    pub fn from_config(backend: Box<dyn SenseBackend>, config: &Config) -> Self {
        Self::new(
            backend,
            config.display.channels,
            config.display.scroll_speed,
            config.display.low_light,
            RecorderSettings::from(&config.sensors),
        )
    }

    /// Take a snapshot of the configured channels
    pub fn measure(&mut self) -> Result<&Snapshot> {
        self.recorder.measure(self.channels)
    }

    /// Scroll the snapshot at `pointer` (negative counts from the end)
    pub fn show_data(&mut self, pointer: isize) -> Result<()> {
        let snapshot = self.recorder.get(pointer)?.clone();
        self.presenter
            .present(self.recorder.backend_mut(), &snapshot, self.scroll_speed)
    }

    /// Measure and immediately scroll the fresh snapshot
    pub fn show_actual_data(&mut self) -> Result<()> {
        self.measure()?;
        self.show_data(-1)
    }

    /// Write every recorded channel value as a measurement row.
    ///
    /// Rows are keyed on a hash of channel, location, value and the
    /// minute-resolution snapshot time. Identical content is stored once:
    /// persisting the same history twice inserts nothing the second time,
    /// and two snapshots taken in the same minute with equal values share
    /// their rows.
    pub fn persist(
        &self,
        gateway: &Gateway,
        location: &str,
        session: Option<&mut Session>,
    ) -> Result<Vec<String>> {
        let records: Vec<Record> = self
            .recorder
            .history()
            .iter()
            .flat_map(|s| snapshot_records(s, location))
            .collect();
        let inserted =
            gateway.insert_if_absent(session, Table::Measurement, "measurement_hash", &records)?;
        info!("Persisted {} of {} measurement rows", inserted.len(), records.len());
        Ok(inserted)
    }

    /// Underlying recorder
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Mutable access to the recorder
    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Snapshots taken so far, oldest first
    pub fn history(&self) -> &[Snapshot] {
        self.recorder.history()
    }

    /// Channels measured by [`EnvironmentalReadings::measure`]
    pub fn channels(&self) -> ChannelMask {
        self.channels
    }

    /// Seconds per scroll step
    pub fn scroll_speed(&self) -> f64 {
        self.scroll_speed
    }
}

/// Measurement records for the present channels of a snapshot
pub fn snapshot_records(snapshot: &Snapshot, location: &str) -> Vec<Record> {
    let timestamp = match NaiveDateTime::parse_from_str(&snapshot.time, TIME_FORMAT) {
        Ok(t) => Value::Real(t.and_utc().timestamp() as f64),
        Err(e) => {
            debug!("Unparsable snapshot time {:?}: {}", snapshot.time, e);
            Value::Null
        }
    };

    snapshot
        .values()
        .map(|(channel, value)| {
            let mut record = Record::new();
            record.insert("measurement_type".into(), channel.name().into());
            record.insert("measurement_locat".into(), location.into());
            record.insert("measurement_value".into(), Value::Real(value));
            record.insert("measurement_dim".into(), channel.unit().into());
            record.insert("timestamp".into(), timestamp.clone());
            record
        })
        .collect()
}
