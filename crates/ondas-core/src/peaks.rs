//! Thresholded peak extraction over sent and received symbol windows.
//!
//! For one symbol index, each channel's sent and received windows are
//! scanned independently: the detection threshold is `ratio` times the
//! window's own magnitude maximum, so detection adapts to whatever level
//! survived the loop. A candidate above the threshold must also clear a
//! small integer noise floor in its quantized components — near-zero
//! windows otherwise report their quantization noise as peaks.

use ondas_fabric::codec::{decode_sc16, sc16_components};
use tracing::debug;

use crate::error::{Error, Result};
use crate::symbols::SymbolBuffer;

/// Default threshold ratio relative to the window maximum.
pub const DEFAULT_PEAK_RATIO: f64 = 0.5;

/// Minimum |real| or |imag| in integer counts for a sample to count as
/// signal rather than quantization noise.
pub const NOISE_FLOOR_COUNTS: i16 = 4;

/// Peak offsets found for one channel, within one symbol window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPeaks {
    /// The logical channel these offsets belong to.
    pub channel: u32,
    /// 0-based in-window offsets of peaks in the sent buffer.
    pub sent: Vec<usize>,
    /// 0-based in-window offsets of peaks in the received buffer.
    pub received: Vec<usize>,
}

/// Peak analysis result for one symbol index across all channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeakReport {
    /// The analyzed symbol index.
    pub symbol_index: usize,
    /// Per-channel peak offsets, in active-channel order.
    pub channels: Vec<ChannelPeaks>,
}

/// Finds peaks in symbol `symbol_index` of every channel's sent and
/// received buffers.
///
/// `sent`, `received`, and `channels` run in the same (active-channel)
/// order. Read-only; the buffers are not modified.
pub fn find_peaks(
    sent: &[SymbolBuffer],
    received: &[SymbolBuffer],
    channels: &[u32],
    symbol_index: usize,
    ratio: f64,
) -> Result<PeakReport> {
    if sent.len() != channels.len() || received.len() != channels.len() {
        return Err(Error::invalid_parameter(
            "channels",
            format!(
                "{} channels but {} sent / {} received buffers",
                channels.len(),
                sent.len(),
                received.len()
            ),
        ));
    }
    let mut report = PeakReport {
        symbol_index,
        channels: Vec::with_capacity(channels.len()),
    };
    for (chan_idx, &channel) in channels.iter().enumerate() {
        let peaks = ChannelPeaks {
            channel,
            sent: window_peaks(&sent[chan_idx], symbol_index, ratio),
            received: window_peaks(&received[chan_idx], symbol_index, ratio),
        };
        debug!(
            channel,
            symbol_index,
            sent = peaks.sent.len(),
            received = peaks.received.len(),
            "peaks found"
        );
        report.channels.push(peaks);
    }
    Ok(report)
}

/// Scans one buffer's symbol window against its own adaptive threshold.
fn window_peaks(buffer: &SymbolBuffer, symbol_index: usize, ratio: f64) -> Vec<usize> {
    let window = buffer.symbol_window(symbol_index);
    let threshold = ratio
        * window
            .iter()
            .map(|&w| decode_sc16(w).norm())
            .fold(0.0, f64::max);
    window
        .iter()
        .enumerate()
        .filter(|&(_, &word)| {
            let (real, imag) = sc16_components(word);
            decode_sc16(word).norm() > threshold
                && (real.abs() >= NOISE_FLOOR_COUNTS || imag.abs() >= NOISE_FLOOR_COUNTS)
        })
        .map(|(offset, _)| offset)
        .collect()
}
