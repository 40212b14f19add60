// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sense HAT board - LPS25H barometer, HTS221 hygrometer, RGB565 LED matrix

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// LPS25H barometer I2C address
pub const LPS25H_ADDRESS: u16 = 0x5c;
/// HTS221 hygrometer I2C address
pub const HTS221_ADDRESS: u16 = 0x5f;

const WHO_AM_I: u8 = 0x0f;
const CTRL_REG1: u8 = 0x20;
const STATUS_REG: u8 = 0x27;

const LPS25H_ID: u8 = 0xbd;
const LPS25H_PRESS_OUT_XL: u8 = 0x28;
const LPS25H_TEMP_OUT_L: u8 = 0x2b;
/// Power on, 25 Hz, block data update
const LPS25H_POWER_ON: u8 = 0xc4;
const LPS25H_T_DA: u8 = 0x01;
const LPS25H_P_DA: u8 = 0x02;

const HTS221_ID: u8 = 0xbc;
const HTS221_HUMIDITY_OUT_L: u8 = 0x28;
const HTS221_H0_RH_X2: u8 = 0x30;
const HTS221_H1_RH_X2: u8 = 0x31;
const HTS221_H0_T0_OUT: u8 = 0x36;
const HTS221_H1_T0_OUT: u8 = 0x3a;
/// Power on, 1 Hz, block data update
const HTS221_POWER_ON: u8 = 0x85;
const HTS221_H_DA: u8 = 0x02;

/// Longer than one HTS221 output period
const DATA_READY_TIMEOUT: Duration = Duration::from_millis(1500);
const DATA_READY_POLL: Duration = Duration::from_millis(10);

/// Framebuffer driver name of the LED matrix
pub const FRAMEBUFFER_NAME: &str = "RPi-Sense FB";

/// LPS25H pressure registers (XL, L, H) to hPa
pub fn pressure_hpa(xl: u8, l: u8, h: u8) -> f64 {
    let raw = i32::from_le_bytes([0, xl, l, h]) >> 8;
    raw as f64 / 4096.0
}

/// LPS25H temperature registers (L, H) to °C
pub fn lps25h_temperature(l: u8, h: u8) -> f64 {
    42.5 + i16::from_le_bytes([l, h]) as f64 / 480.0
}

/// HTS221 factory two-point humidity calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityCalibration {
    /// Humidity at the first point, %
    pub h0_rh: f64,
    /// Humidity at the second point, %
    pub h1_rh: f64,
    /// Raw output at the first point
    pub h0_out: i16,
    /// Raw output at the second point
    pub h1_out: i16,
}

impl HumidityCalibration {
    /// Calibration from raw register values; fails if both points coincide
    pub fn from_registers(h0_rh_x2: u8, h1_rh_x2: u8, h0_out: i16, h1_out: i16) -> Result<Self> {
        if h0_out == h1_out {
            return Err(Error::Sensor("HTS221 calibration points coincide".to_string()));
        }
        Ok(Self {
            h0_rh: h0_rh_x2 as f64 / 2.0,
            h1_rh: h1_rh_x2 as f64 / 2.0,
            h0_out,
            h1_out,
        })
    }

    /// Linear interpolation between the calibration points, saturated to 0..=100
    pub fn relative_humidity(&self, raw: i16) -> f64 {
        let slope = (self.h1_rh - self.h0_rh) / (self.h1_out as f64 - self.h0_out as f64);
        let rh = self.h0_rh + slope * (raw as f64 - self.h0_out as f64);
        rh.clamp(0.0, 100.0)
    }
}

/// Poll `read_status` until every bit of `mask` is set or `timeout` passes
pub fn wait_data_ready<F>(
    chip: &str,
    mask: u8,
    timeout: Duration,
    interval: Duration,
    mut read_status: F,
) -> Result<()>
where
    F: FnMut() -> Result<u8>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let status = read_status()?;
        if status & mask == mask {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Sensor(format!(
                "{}: no new sample within {:?} (status {:#04x})",
                chip, timeout, status
            )));
        }
        thread::sleep(interval);
    }
}

/// Pack a frame as little-endian RGB565, row-major
pub fn frame_bytes(frame: &crate::display::Frame) -> Vec<u8> {
    frame
        .iter()
        .flatten()
        .flat_map(|pixel| pixel.to_rgb565().to_le_bytes())
        .collect()
}

/// Find `/dev/fbN` whose sysfs name matches the Sense HAT driver
pub fn find_framebuffer(graphics_class: &Path, name: &str) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(graphics_class)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with("fb"))
        })
        .collect();
    candidates.sort();

    for path in candidates {
        let Ok(found) = fs::read_to_string(path.join("name")) else {
            continue;
        };
        if found.trim() == name {
            if let Some(device) = path.file_name() {
                return Ok(Path::new("/dev").join(device));
            }
        }
    }
    Err(Error::Sensor(format!(
        "no framebuffer named {:?} under {:?}",
        name, graphics_class
    )))
}

#[cfg(feature = "hardware")]
pub use device::SenseHat;

#[cfg(feature = "hardware")]
mod device {
    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;
    use std::fs::{File, OpenOptions};
    use std::io::{Seek, SeekFrom, Write};
    use std::path::Path;
    use tracing::{debug, info};

    use super::*;
    use crate::config::SensorConfig;
    use crate::display::{pause, Rgb, Scroller};
    use crate::sensors::{BackendKind, CpuProbe, SenseBackend};

    fn i2c_err(chip: &str, e: impl std::fmt::Display) -> Error {
        Error::Sensor(format!("{}: {}", chip, e))
    }

    fn read_reg(dev: &mut LinuxI2CDevice, chip: &str, reg: u8) -> Result<u8> {
        dev.smbus_read_byte_data(reg).map_err(|e| i2c_err(chip, e))
    }

    fn open_chip(bus: &str, address: u16, chip: &str, id: u8, power_on: u8) -> Result<LinuxI2CDevice> {
        let mut dev = LinuxI2CDevice::new(bus, address).map_err(|e| i2c_err(chip, e))?;
        let who = read_reg(&mut dev, chip, WHO_AM_I)?;
        if who != id {
            return Err(Error::Sensor(format!(
                "{}: unexpected WHO_AM_I {:#04x} (expected {:#04x})",
                chip, who, id
            )));
        }
        dev.smbus_write_byte_data(CTRL_REG1, power_on)
            .map_err(|e| i2c_err(chip, e))?;
        Ok(dev)
    }

    /// The physical board
    pub struct SenseHat {
        barometer: LinuxI2CDevice,
        hygrometer: LinuxI2CDevice,
        calibration: HumidityCalibration,
        framebuffer: File,
        cpu: CpuProbe,
        low_light: bool,
    }

    impl SenseHat {
        /// Open both chips on the configured bus and the matrix framebuffer
        pub fn open(config: &SensorConfig) -> Result<Self> {
            let bus = format!("/dev/i2c-{}", config.i2c_bus);
            let barometer = open_chip(&bus, LPS25H_ADDRESS, "LPS25H", LPS25H_ID, LPS25H_POWER_ON)?;
            let mut hygrometer = open_chip(&bus, HTS221_ADDRESS, "HTS221", HTS221_ID, HTS221_POWER_ON)?;
            let calibration = read_calibration(&mut hygrometer)?;

            let fb_path = find_framebuffer(Path::new("/sys/class/graphics"), &config.framebuffer_name)?;
            let framebuffer = OpenOptions::new().read(true).write(true).open(&fb_path)?;

            info!("Sense HAT on {} with matrix at {:?}", bus, fb_path);
            Ok(Self {
                barometer,
                hygrometer,
                calibration,
                framebuffer,
                cpu: CpuProbe::new(&config.cpu_probe_command),
                low_light: false,
            })
        }

        fn draw(&mut self, frame: &crate::display::Frame) -> Result<()> {
            self.framebuffer.seek(SeekFrom::Start(0))?;
            self.framebuffer.write_all(&frame_bytes(frame))?;
            Ok(())
        }
    }

    /// Block until the chip flags a fresh sample for `mask`
    fn await_sample(dev: &mut LinuxI2CDevice, chip: &str, mask: u8) -> Result<()> {
        wait_data_ready(chip, mask, DATA_READY_TIMEOUT, DATA_READY_POLL, || {
            read_reg(dev, chip, STATUS_REG)
        })
    }

    fn read_i16(dev: &mut LinuxI2CDevice, chip: &str, reg: u8) -> Result<i16> {
        let l = read_reg(dev, chip, reg)?;
        let h = read_reg(dev, chip, reg + 1)?;
        Ok(i16::from_le_bytes([l, h]))
    }

    fn read_calibration(dev: &mut LinuxI2CDevice) -> Result<HumidityCalibration> {
        let h0_rh_x2 = read_reg(dev, "HTS221", HTS221_H0_RH_X2)?;
        let h1_rh_x2 = read_reg(dev, "HTS221", HTS221_H1_RH_X2)?;
        let h0_out = read_i16(dev, "HTS221", HTS221_H0_T0_OUT)?;
        let h1_out = read_i16(dev, "HTS221", HTS221_H1_T0_OUT)?;
        debug!("HTS221 calibration: {}/{} rH x2 at {}/{}", h0_rh_x2, h1_rh_x2, h0_out, h1_out);
        HumidityCalibration::from_registers(h0_rh_x2, h1_rh_x2, h0_out, h1_out)
    }

    impl SenseBackend for SenseHat {
        fn kind(&self) -> BackendKind {
            BackendKind::SenseHat
        }

        fn temperature(&mut self) -> Result<f64> {
            await_sample(&mut self.barometer, "LPS25H", LPS25H_T_DA)?;
            let l = read_reg(&mut self.barometer, "LPS25H", LPS25H_TEMP_OUT_L)?;
            let h = read_reg(&mut self.barometer, "LPS25H", LPS25H_TEMP_OUT_L + 1)?;
            Ok(lps25h_temperature(l, h))
        }

        fn humidity(&mut self) -> Result<f64> {
            await_sample(&mut self.hygrometer, "HTS221", HTS221_H_DA)?;
            let raw = read_i16(&mut self.hygrometer, "HTS221", HTS221_HUMIDITY_OUT_L)?;
            Ok(self.calibration.relative_humidity(raw))
        }

        fn pressure(&mut self) -> Result<f64> {
            await_sample(&mut self.barometer, "LPS25H", LPS25H_P_DA)?;
            let xl = read_reg(&mut self.barometer, "LPS25H", LPS25H_PRESS_OUT_XL)?;
            let l = read_reg(&mut self.barometer, "LPS25H", LPS25H_PRESS_OUT_XL + 1)?;
            let h = read_reg(&mut self.barometer, "LPS25H", LPS25H_PRESS_OUT_XL + 2)?;
            Ok(pressure_hpa(xl, l, h))
        }

        fn cpu_temperature(&mut self) -> Result<f64> {
            self.cpu.read()
        }

        fn show_message(&mut self, text: &str, scroll_speed: f64, colour: Rgb) -> Result<()> {
            let lit = if self.low_light { colour.dimmed() } else { colour };
            for frame in Scroller::new(text, lit) {
                self.draw(&frame)?;
                pause(scroll_speed);
            }
            Ok(())
        }

        fn low_light(&self) -> bool {
            self.low_light
        }

        fn set_low_light(&mut self, enabled: bool) {
            self.low_light = enabled;
        }
    }
}
