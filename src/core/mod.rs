// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Core measurement types - snapshots, channel selection, history

mod recorder;
mod readings;

pub use recorder::{Recorder, RecorderSettings};
pub use readings::{snapshot_records, EnvironmentalReadings};

use serde::{Deserialize, Serialize};

/// Format of [`Snapshot::time`]
pub const TIME_FORMAT: &str = "%Y-%m-%d_%H:%M";

/// Round to one decimal place, correctly rounded on the stored value.
///
/// `0.15` is stored as `0.1499...` and becomes `0.1`. Exact ties (values
/// that are odd multiples of `0.05` and representable, like `21.25`) go to
/// the even digit, so `21.25` becomes `21.2` and `0.75` becomes `0.8`.
pub fn round1(value: f64) -> f64 {
    if value.is_finite() && (value * 4.0).fract() == 0.0 && (value * 2.0).fract() != 0.0 {
        let floor = (value * 10.0).floor();
        let even = if floor % 2.0 == 0.0 { floor } else { floor + 1.0 };
        return even / 10.0;
    }
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Measurement channels a snapshot can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Board temperature, °C
    Temperature,
    /// Relative humidity, %
    Humidity,
    /// Air pressure, hPa
    AirPressure,
}

impl Channel {
    /// Bit of this channel in a [`ChannelMask`]
    pub const fn bit(self) -> u8 {
        match self {
            Channel::Temperature => 1,
            Channel::Humidity => 2,
            Channel::AirPressure => 4,
        }
    }

    /// Snapshot field / stored measurement type name
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::AirPressure => "air_pressure",
        }
    }

    /// Unit the raw reading is expressed in
    pub const fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "'C",
            Channel::Humidity => "%",
            Channel::AirPressure => "hPa",
        }
    }

    /// Every channel, in mask bit order
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Humidity, Channel::AirPressure];
}

/// Selection of channels to read: 1 = temperature, 2 = humidity, 4 = pressure.
///
/// Codes are summed to combine channels (3 = temperature + humidity). Codes
/// above 7 are accepted and select nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// No channel
    pub const NONE: ChannelMask = ChannelMask(0);
    /// All three channels
    pub const ALL: ChannelMask = ChannelMask(7);

    /// Mask from its numeric code
    pub fn new(code: u32) -> Self {
        if code > 7 {
            Self::NONE
        } else {
            Self(code as u8)
        }
    }

    /// Whether `channel` is selected
    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Numeric code of the mask
    pub fn code(self) -> u32 {
        self.0 as u32
    }

    /// Selected channels in temperature, humidity, pressure order
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<u32> for ChannelMask {
    fn from(code: u32) -> Self {
        Self::new(code)
    }
}

impl From<ChannelMask> for u32 {
    fn from(mask: ChannelMask) -> Self {
        mask.code()
    }
}

/// One timestamped set of environmental values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `YYYY-MM-DD_HH:MM`
    pub time: String,
    /// CPU-compensated temperature, °C
    pub temperature: Option<f64>,
    /// Relative humidity, %
    pub humidity: Option<f64>,
    /// Air pressure, hPa
    pub air_pressure: Option<f64>,
    /// Reserved, never set
    pub warning: Option<String>,
}

impl Snapshot {
    /// Snapshot with every channel absent
    pub fn empty(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            temperature: None,
            humidity: None,
            air_pressure: None,
            warning: None,
        }
    }

    /// Value of one channel, if measured
    pub fn value(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::AirPressure => self.air_pressure,
        }
    }

    /// Present channels with their values
    pub fn values(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        Channel::ALL
            .into_iter()
            .filter_map(move |c| self.value(c).map(|v| (c, v)))
    }
}
