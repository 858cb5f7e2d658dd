//! Timing plans and pipeline-latency lookup.
//!
//! The loop between transmit and receive has a fixed pipeline latency that
//! depends on the device's tick rate and on whether the loop is closed
//! digitally inside the radio or over the RF front end. The latency values
//! are calibration constants measured per device class, so they live in an
//! overridable [`LatencyTable`] rather than in code — and an unrecognized
//! tick rate is a hard error, never a guess, because a wrong delay silently
//! corrupts every capture.

use crate::error::{Error, Result};
use crate::scaling::{CpSchedule, total_cp_overhead};

/// How the transmit path is looped back into the receive path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopbackMode {
    /// Digital loopback inside the radio block.
    Internal,
    /// Loopback over the RF front end (cabled or over the air).
    Rf,
}

/// One calibration entry: tick rates sharing a pipeline latency.
#[derive(Clone, Debug)]
pub struct LatencyEntry {
    /// Tick rates this entry applies to, in Hz.
    pub tick_rates: Vec<f64>,
    /// Loopback mode this entry was calibrated for.
    pub mode: LoopbackMode,
    /// Pipeline latency in device ticks.
    pub cycles: u64,
}

/// Calibration table mapping (tick rate, loopback mode) to pipeline latency.
#[derive(Clone, Debug)]
pub struct LatencyTable {
    entries: Vec<LatencyEntry>,
}

impl Default for LatencyTable {
    /// The empirically measured latencies of the supported device classes.
    fn default() -> Self {
        Self {
            entries: vec![
                // 100 MHz FPGA image classes
                LatencyEntry {
                    tick_rates: vec![122.88e6, 125.0e6],
                    mode: LoopbackMode::Internal,
                    cycles: 2,
                },
                // 200 MHz FPGA image classes
                LatencyEntry {
                    tick_rates: vec![245.76e6, 250.0e6],
                    mode: LoopbackMode::Internal,
                    cycles: 12,
                },
                LatencyEntry {
                    tick_rates: vec![245.76e6, 250.0e6],
                    mode: LoopbackMode::Rf,
                    cycles: 188,
                },
            ],
        }
    }
}

impl LatencyTable {
    /// Creates a table from explicit calibration entries.
    pub fn new(entries: Vec<LatencyEntry>) -> Self {
        Self { entries }
    }

    /// Adds a calibration entry.
    pub fn push(&mut self, entry: LatencyEntry) {
        self.entries.push(entry);
    }

    /// Looks up the latency in ticks for a tick rate and mode.
    ///
    /// Rates are matched exactly (bitwise): table rates are configured
    /// constants, not measurements, so fuzzy matching would only hide
    /// configuration mistakes.
    pub fn cycles_for(&self, tick_rate: f64, mode: LoopbackMode) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| {
                entry.mode == mode
                    && entry
                        .tick_rates
                        .iter()
                        .any(|rate| rate.to_bits() == tick_rate.to_bits())
            })
            .map(|entry| entry.cycles)
    }

    /// Computes the TX→RX pipeline delay in seconds.
    ///
    /// An explicit `override_cycles` bypasses the table entirely. Without an
    /// override, an unrecognized tick rate fails with
    /// [`Error::UnsupportedTickRate`].
    pub fn loopback_delay(
        &self,
        tick_rate: f64,
        mode: LoopbackMode,
        override_cycles: Option<u64>,
    ) -> Result<f64> {
        let cycles = match override_cycles {
            Some(cycles) => cycles,
            None => self
                .cycles_for(tick_rate, mode)
                .ok_or(Error::UnsupportedTickRate(tick_rate))?,
        };
        Ok(cycles as f64 / tick_rate)
    }
}

/// Absolute timestamps and capture sizing for one transmit/receive cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingPlan {
    /// Device time of the transmit burst, in seconds.
    pub transmit_time: f64,
    /// Device time the capture window opens: transmit time plus pipeline
    /// delay.
    pub receive_time: f64,
    /// Samples to capture per channel: the symbol payload plus the cyclic
    /// prefix overhead the insertion queue will add.
    pub capture_samples: usize,
}

impl TimingPlan {
    /// Builds the plan for one cycle.
    pub fn new(
        transmit_time: f64,
        pipeline_delay: f64,
        fft_size: usize,
        num_symbols: usize,
        cp_schedule: &CpSchedule,
    ) -> Self {
        Self {
            transmit_time,
            receive_time: transmit_time + pipeline_delay,
            capture_samples: num_symbols * fft_size + total_cp_overhead(cp_schedule, num_symbols),
        }
    }
}
