//! FFT scaling patterns and cyclic-prefix arithmetic.
//!
//! Pure register math, no device access. The scaling pattern feeds the FFT
//! engine's per-stage shift control; the CP arithmetic sizes capture windows
//! so that prefix-expanded symbols fit.

use crate::error::{Error, Result};

/// Bit-packed per-stage FFT scaling register value.
///
/// The pattern holds one 2-bit field per pair of FFT stages, most-significant
/// stage first: `0b10` means "no scaling at this stage", `0b01` means "scale
/// by this stage". See the Xilinx Fast Fourier Transform v9.1 Product Guide
/// (PG901) for the register encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePattern(u32);

impl ScalePattern {
    /// Unit scale — no scaling at any stage.
    pub const UNIT: Self = Self(0);

    /// Returns the raw register value.
    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Computes the default 1/N scaling pattern for a forward transform.
///
/// Every stage is `0b10` except the stage at index `log2(fft_size)/2`
/// (when that index is in range, i.e. when `fft_size` is not a power of 4),
/// which is `0b01`. This distributes the overall 1/N magnitude scaling as
/// late in the transform as possible.
///
/// Examples: FFT size 4096 ⇒ `0b101010101010`, 2048 ⇒ `0b011010101010`.
///
/// `fft_size` must be a power of two and at least 4.
pub fn forward_scale_pattern(fft_size: usize) -> Result<ScalePattern> {
    if !fft_size.is_power_of_two() || fft_size < 4 {
        return Err(Error::invalid_parameter(
            "fft_size",
            format!("{fft_size} is not a power of two >= 4"),
        ));
    }
    let log2 = fft_size.ilog2();
    let mut pattern = 0;
    for stage in (0..(log2 + 1) / 2).rev() {
        let field = if stage == log2 / 2 { 0b01 } else { 0b10 };
        pattern = (pattern << 2) | field;
    }
    Ok(ScalePattern(pattern))
}

/// Returns the scaling pattern for an inverse transform: unit scale.
pub fn inverse_scale_pattern() -> ScalePattern {
    ScalePattern::UNIT
}

/// A cyclic-prefix schedule: the CP length for symbol `k` is
/// `schedule[k mod len]`. An empty schedule means no cyclic prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpSchedule(Vec<u32>);

impl CpSchedule {
    /// Creates a schedule from a list of CP lengths.
    pub fn new(lengths: Vec<u32>) -> Self {
        Self(lengths)
    }

    /// Returns `true` when the schedule applies no cyclic prefix.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries in the schedule.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the raw CP lengths.
    pub fn lengths(&self) -> &[u32] {
        &self.0
    }

    /// Returns the CP length applied to symbol `k`.
    pub fn length_for_symbol(&self, k: usize) -> u32 {
        if self.0.is_empty() {
            0
        } else {
            self.0[k % self.0.len()]
        }
    }
}

impl From<Vec<u32>> for CpSchedule {
    fn from(lengths: Vec<u32>) -> Self {
        Self::new(lengths)
    }
}

/// Total samples added by cyclic-prefix insertion over `num_symbols` symbols.
///
/// The schedule repeats cyclically; a schedule longer than `num_symbols`
/// contributes only its consumed prefix. Empty schedule or zero symbols
/// contribute nothing.
pub fn total_cp_overhead(schedule: &CpSchedule, num_symbols: usize) -> usize {
    (0..num_symbols)
        .map(|k| schedule.length_for_symbol(k) as usize)
        .sum()
}
