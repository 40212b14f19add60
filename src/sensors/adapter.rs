// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Backend selection - live board first, emulator as fallback

use tracing::{info, warn};

use super::{BackendKind, Emulator, SenseBackend};
use crate::config::{BackendPreference, Config};
use crate::error::{Error, Result};

/// Backends to try, in order, for a preference
pub fn candidates(preference: BackendPreference) -> Vec<BackendKind> {
    match preference {
        BackendPreference::Auto => vec![BackendKind::SenseHat, BackendKind::Emulator],
        BackendPreference::SenseHat => vec![BackendKind::SenseHat],
        BackendPreference::Emulator => vec![BackendKind::Emulator],
    }
}

/// Open the first backend `open` succeeds with.
///
/// Failures of individual candidates are logged; if every candidate fails
/// the result is [`Error::MissingDisplay`], which callers treat as fatal.
pub fn select_backend<F>(candidates: &[BackendKind], mut open: F) -> Result<Box<dyn SenseBackend>>
where
    F: FnMut(BackendKind) -> Result<Box<dyn SenseBackend>>,
{
    for kind in candidates {
        match open(*kind) {
            Ok(backend) => {
                info!("Using backend: {}", kind);
                return Ok(backend);
            }
            Err(e) => {
                warn!("{} unavailable: {}", kind, e);
            }
        }
    }

    let attempted = candidates
        .iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::MissingDisplay { attempted })
}

/// Default opener driven by configuration
pub fn open_backend(kind: BackendKind, config: &Config) -> Result<Box<dyn SenseBackend>> {
    match kind {
        BackendKind::SenseHat => open_sense_hat(config),
        BackendKind::Emulator => {
            if !config.emulator.enabled {
                return Err(Error::Sensor("emulator disabled in configuration".to_string()));
            }
            Ok(Box::new(Emulator::new(&config.emulator)))
        }
    }
}

#[cfg(feature = "hardware")]
fn open_sense_hat(config: &Config) -> Result<Box<dyn SenseBackend>> {
    Ok(Box::new(super::SenseHat::open(&config.sensors)?))
}

#[cfg(not(feature = "hardware"))]
fn open_sense_hat(_config: &Config) -> Result<Box<dyn SenseBackend>> {
    Err(Error::Sensor("built without the hardware feature".to_string()))
}

/// Three-line banner naming the active backend
pub fn banner(kind: BackendKind) -> String {
    let rule = "=".repeat(27);
    format!("{}\n= using: {:^16} =\n{}", rule, kind.label(), rule)
}
