// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! CPU temperature probe (`vcgencmd measure_temp`)

use std::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Raspberry Pi firmware query
pub const DEFAULT_PROBE_COMMAND: &str = "vcgencmd measure_temp";

/// Parse `temp=48.3'C`
pub fn parse_measure_temp(output: &str) -> Result<f64> {
    let line = output.trim();
    let value = line
        .strip_prefix("temp=")
        .and_then(|rest| rest.strip_suffix("'C"))
        .ok_or_else(|| Error::CpuProbe(format!("unexpected output {:?}", line)))?;
    value
        .trim()
        .parse()
        .map_err(|e| Error::CpuProbe(format!("bad temperature {:?}: {}", value, e)))
}

/// Runs a shell command that prints the SoC temperature
#[derive(Debug, Clone)]
pub struct CpuProbe {
    command: String,
}

impl CpuProbe {
    /// Probe running `command`
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    /// Run the command once and parse its output
    pub fn read(&self) -> Result<f64> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::CpuProbe("empty probe command".to_string()))?;

        let output = Command::new(program)
            .args(parts)
            .output()
            .map_err(|e| Error::CpuProbe(format!("{}: {}", program, e)))?;
        if !output.status.success() {
            return Err(Error::CpuProbe(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("{} -> {}", self.command, stdout.trim());
        parse_measure_temp(&stdout)
    }
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_COMMAND)
    }
}
