//! Sensor module - hardware interfaces and emulation

mod adapter;
mod cpu;
mod sensehat;
mod simulator;
mod traits;

pub use adapter::{banner, candidates, open_backend, select_backend};
pub use cpu::{parse_measure_temp, CpuProbe, DEFAULT_PROBE_COMMAND};
pub use sensehat::*;
pub use simulator::{Emulator, MessageLog, ShownMessage};
pub use traits::{BackendKind, SenseBackend};
