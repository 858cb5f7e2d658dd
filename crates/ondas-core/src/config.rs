//! The run configuration record.
//!
//! A [`RunConfig`] is everything the thin outer layer (CLI, test harness)
//! must supply for one loopback run. It can be built in code, parsed from a
//! TOML file, or assembled from command-line flags; the core only sees the
//! validated record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error as CoreError, Result as CoreResult};
use crate::scaling::CpSchedule;
use crate::timing::LoopbackMode;

/// Errors loading a run configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file.
    #[error("failed to read config '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML contents.
    #[error("failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Parameters of one loopback run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Active channels, in endpoint order.
    pub channels: Vec<u32>,
    /// FFT size (power of two, >= 4).
    pub fft_size: usize,
    /// Symbols to transmit and receive.
    pub num_symbols: usize,
    /// Tone amplitude in (0, 1].
    pub amplitude: f64,
    /// Cyclic-prefix schedule; empty for no CP.
    pub cp_schedule: Vec<u32>,
    /// TX gain in dB (ignored in internal loopback).
    pub tx_gain: Option<f64>,
    /// RX gain in dB (ignored in internal loopback).
    pub rx_gain: Option<f64>,
    /// Close the loop digitally inside the radio instead of over RF.
    pub loopback: bool,
    /// Optional DUC/DDC rate in Hz; `None` leaves converters at the device
    /// master clock rate.
    pub rate: Option<f64>,
    /// Explicit TX→RX delay override in device ticks, bypassing the
    /// latency table.
    pub delay_override: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            channels: vec![0, 1],
            fft_size: 4096,
            num_symbols: 14,
            amplitude: 0.5,
            cp_schedule: Vec::new(),
            tx_gain: Some(15.0),
            rx_gain: Some(50.0),
            loopback: false,
            rate: None,
            delay_override: None,
        }
    }
}

impl RunConfig {
    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Validates the record before it touches any hardware.
    pub fn validate(&self) -> CoreResult<()> {
        if self.channels.is_empty() {
            return Err(CoreError::invalid_parameter(
                "channels",
                "at least one channel is required",
            ));
        }
        let mut seen = self.channels.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.channels.len() {
            return Err(CoreError::invalid_parameter(
                "channels",
                "channels must be unique",
            ));
        }
        if !self.fft_size.is_power_of_two() || self.fft_size < 4 {
            return Err(CoreError::invalid_parameter(
                "fft_size",
                format!("{} is not a power of two >= 4", self.fft_size),
            ));
        }
        if self.num_symbols == 0 {
            return Err(CoreError::invalid_parameter(
                "num_symbols",
                "at least one symbol is required",
            ));
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(CoreError::invalid_parameter(
                "amplitude",
                format!("{} is outside (0, 1]", self.amplitude),
            ));
        }
        Ok(())
    }

    /// The cyclic-prefix schedule as a typed value.
    pub fn cp(&self) -> CpSchedule {
        CpSchedule::new(self.cp_schedule.clone())
    }

    /// The loopback mode implied by the `loopback` flag.
    pub fn loopback_mode(&self) -> LoopbackMode {
        if self.loopback {
            LoopbackMode::Internal
        } else {
            LoopbackMode::Rf
        }
    }
}
