//! Symbol buffers and test-symbol generation.
//!
//! A [`SymbolBuffer`] holds one channel's samples in the packed sc16 wire
//! format, logically segmented into `num_symbols` windows of `fft_size`
//! samples. The segmentation ignores cyclic-prefix overhead on purpose: CP
//! expansion affects how many samples a capture must request, not how the
//! payload is addressed once the prefix has been removed.

use num_complex::Complex64;
use ondas_fabric::codec::{decode_slice, encode_sc16};

/// One channel's transmitted or received samples, segmented into symbols.
#[derive(Clone, Debug)]
pub struct SymbolBuffer {
    words: Vec<u32>,
    fft_size: usize,
    num_symbols: usize,
}

impl SymbolBuffer {
    /// Wraps packed sc16 words. The buffer may be shorter than
    /// `num_symbols * fft_size` (a tolerated partial capture) or longer
    /// (trailing CP-region samples); windows clamp accordingly.
    pub fn from_words(words: Vec<u32>, fft_size: usize, num_symbols: usize) -> Self {
        Self {
            words,
            fft_size,
            num_symbols,
        }
    }

    /// FFT size of each symbol window.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of logical symbol windows.
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// The raw packed words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The packed words of symbol `k`, clamped to the samples present.
    pub fn symbol_window(&self, k: usize) -> &[u32] {
        let start = (k * self.fft_size).min(self.words.len());
        let end = (start + self.fft_size).min(self.words.len());
        &self.words[start..end]
    }

    /// Decodes symbol `k` to complex samples.
    pub fn symbol_samples(&self, k: usize) -> Vec<Complex64> {
        decode_slice(self.symbol_window(k))
    }
}

/// Generates per-channel test symbols: one tone per symbol.
///
/// Each channel gets a distinct base subcarrier, spread across the band by
/// channel index, and the tone walks up one bin per symbol so consecutive
/// symbols are distinguishable after the loop. Buffers come back in the
/// order of `channels`.
pub fn generate_symbols(
    channels: &[u32],
    num_symbols: usize,
    fft_size: usize,
    amplitude: f64,
) -> Vec<SymbolBuffer> {
    let num_chan = channels.len();
    channels
        .iter()
        .map(|&chan| {
            let mut words = vec![0u32; num_symbols * fft_size];
            for symbol_index in 0..num_symbols {
                let base = ((chan as usize + 1) * fft_size) / (num_chan * 4);
                let subcarrier = (base + symbol_index) % fft_size;
                words[symbol_index * fft_size + subcarrier] =
                    encode_sc16(Complex64::new(amplitude, 0.0));
            }
            SymbolBuffer::from_words(words, fft_size, num_symbols)
        })
        .collect()
}
