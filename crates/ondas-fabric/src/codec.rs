//! sc16 sample codec — the boundary format between host buffers and the fabric.
//!
//! Each complex sample crosses the wire as one 32-bit word: the imaginary
//! component in the high half, the real component in the low half, both as
//! signed 16-bit fixed point with full scale 32767 representing amplitude 1.0.
//!
//! ```text
//! bit 31         16 15          0
//!    ┌─────────────┬─────────────┐
//!    │ imag (i16)  │ real (i16)  │
//!    └─────────────┴─────────────┘
//! ```
//!
//! The packing is lossless for component counts in [-32767, 32767]; encode
//! then decode returns the original sample exactly.

use num_complex::Complex64;

/// Fixed-point full scale: integer count representing amplitude 1.0.
pub const FULL_SCALE: f64 = 32767.0;

/// Packs a complex sample into one sc16 word.
///
/// Components are scaled by [`FULL_SCALE`] and rounded to the nearest integer
/// count. Rounding (rather than truncation) keeps the round trip exact for
/// every representable count. Inputs are expected in [-1.0, 1.0]; values
/// outside that range saturate at the `i16` limits.
#[inline]
pub fn encode_sc16(sample: Complex64) -> u32 {
    let real = (sample.re * FULL_SCALE).round().clamp(-32768.0, 32767.0) as i16;
    let imag = (sample.im * FULL_SCALE).round().clamp(-32768.0, 32767.0) as i16;
    (u32::from(imag as u16) << 16) | u32::from(real as u16)
}

/// Unpacks one sc16 word into a complex sample.
#[inline]
pub fn decode_sc16(word: u32) -> Complex64 {
    let real = (word & 0xFFFF) as u16 as i16;
    let imag = (word >> 16) as u16 as i16;
    Complex64::new(f64::from(real) / FULL_SCALE, f64::from(imag) / FULL_SCALE)
}

/// Packs a slice of complex samples into sc16 words.
pub fn encode_slice(samples: &[Complex64]) -> Vec<u32> {
    samples.iter().map(|&s| encode_sc16(s)).collect()
}

/// Unpacks a slice of sc16 words into complex samples.
pub fn decode_slice(words: &[u32]) -> Vec<Complex64> {
    words.iter().map(|&w| decode_sc16(w)).collect()
}

/// Extracts the raw integer components of an sc16 word as `(real, imag)`.
///
/// Used by peak analysis to compare against integer noise-floor counts
/// without going through the floating-point domain.
#[inline]
pub fn sc16_components(word: u32) -> (i16, i16) {
    ((word & 0xFFFF) as u16 as i16, (word >> 16) as u16 as i16)
}
