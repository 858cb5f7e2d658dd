//! Block identities and capability contracts.
//!
//! Every block in the processing fabric is addressed by a stable string
//! [`BlockId`] and exposes one of three narrow capability traits:
//!
//! - [`RadioBlock`] — RF front end: per-channel loopback register, packet
//!   size, analog gains, and the device timebase.
//! - [`OfdmBlock`] — FFT engine with cyclic-prefix insertion/removal queues.
//! - [`ConverterBlock`] — optional up/down sample-rate converter stage.
//!
//! Configuration code depends only on these traits, never on a concrete
//! device implementation. The traits are object-safe so a fabric can hand out
//! `Arc<dyn ...>` controllers resolved at runtime (the same seam
//! [`DeviceFabric`](crate::DeviceFabric) is built around).

use std::fmt;
use std::sync::Arc;

use crate::FabricError;

/// Stable identifier of a block within the fabric, e.g. `"0/Radio#0"`.
///
/// Two lookups with equal ids must resolve to the same underlying block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(String);

impl BlockId {
    /// Creates a block id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The capability class a block belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// RF front end (TX and RX side of the loop).
    Radio,
    /// OFDM modulator/demodulator (FFT + cyclic prefix engine).
    Ofdm,
    /// Digital up converter (optional TX-path stage).
    UpConverter,
    /// Digital down converter (optional RX-path stage).
    DownConverter,
}

/// Transform direction of an OFDM block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FftDirection {
    /// Forward FFT — demodulation (receive side).
    Forward,
    /// Reverse (inverse) FFT — modulation (transmit side).
    Reverse,
}

/// Static capability limits reported by an OFDM block.
///
/// Configuration validates user settings against these before programming
/// any register, so an out-of-range FFT size or an over-long CP schedule is
/// rejected host-side instead of producing undefined device behavior.
#[derive(Clone, Copy, Debug)]
pub struct OfdmCapabilities {
    /// Largest supported FFT size.
    pub max_fft_size: usize,
    /// Largest supported single cyclic-prefix length, in samples.
    pub max_cp_length: usize,
    /// Capacity of the CP insertion schedule queue.
    pub max_cp_ins_list_length: usize,
    /// Capacity of the CP removal schedule queue.
    pub max_cp_rem_list_length: usize,
}

/// Radio front-end control surface.
pub trait RadioBlock: Send + Sync {
    /// Number of channels this radio serves.
    fn num_channels(&self) -> usize;

    /// Enables or disables the digital loopback path for one channel.
    ///
    /// Loopback routes TX samples straight back into the RX chain inside the
    /// radio block; no external RF connection is involved.
    fn set_loopback(&self, chan: usize, enabled: bool) -> Result<(), FabricError>;

    /// Sets the RX packet size (samples per packet) for one channel.
    fn set_samples_per_packet(&self, chan: usize, spp: usize) -> Result<(), FabricError>;

    /// Sets the analog TX gain in dB for one channel.
    fn set_tx_gain(&self, chan: usize, gain: f64) -> Result<(), FabricError>;

    /// Sets the analog RX gain in dB for one channel.
    fn set_rx_gain(&self, chan: usize, gain: f64) -> Result<(), FabricError>;

    /// Returns the device tick rate in Hz (the timestamp timebase).
    fn tick_rate(&self) -> f64;

    /// Returns the current device time in seconds.
    fn time_now(&self) -> f64;
}

/// OFDM modulator/demodulator control surface.
pub trait OfdmBlock: Send + Sync {
    /// Reports the block's static capability limits.
    fn capabilities(&self) -> OfdmCapabilities;

    /// Drains any residual entries from the CP insertion queue.
    fn clear_cp_insertion(&self) -> Result<(), FabricError>;

    /// Drains any residual entries from the CP removal queue.
    fn clear_cp_removal(&self) -> Result<(), FabricError>;

    /// Sets the FFT size.
    fn set_fft_size(&self, fft_size: usize) -> Result<(), FabricError>;

    /// Sets the transform direction.
    fn set_fft_direction(&self, direction: FftDirection) -> Result<(), FabricError>;

    /// Writes the per-stage scaling pattern register.
    fn set_fft_scaling(&self, pattern: u32) -> Result<(), FabricError>;

    /// Loads a cyclic-prefix insertion schedule (transmit side).
    fn load_cp_insertion(&self, lengths: &[u32]) -> Result<(), FabricError>;

    /// Loads a cyclic-prefix removal schedule (receive side).
    fn load_cp_removal(&self, lengths: &[u32]) -> Result<(), FabricError>;
}

/// Up/down converter control surface.
pub trait ConverterBlock: Send + Sync {
    /// Number of channels this converter serves.
    fn num_channels(&self) -> usize;

    /// Requests an input rate in Hz; returns the rate actually achieved.
    fn set_input_rate(&self, chan: usize, rate: f64) -> Result<f64, FabricError>;

    /// Requests an output rate in Hz; returns the rate actually achieved.
    fn set_output_rate(&self, chan: usize, rate: f64) -> Result<f64, FabricError>;
}

/// A resolved block controller, tagged with its capability class.
///
/// Cloning is cheap; all variants hold `Arc`s to the same underlying block.
#[derive(Clone)]
pub enum BlockControl {
    /// Radio front end.
    Radio(Arc<dyn RadioBlock>),
    /// OFDM modulator/demodulator.
    Ofdm(Arc<dyn OfdmBlock>),
    /// Digital up converter.
    UpConverter(Arc<dyn ConverterBlock>),
    /// Digital down converter.
    DownConverter(Arc<dyn ConverterBlock>),
}

impl BlockControl {
    /// Returns the capability class of this controller.
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Radio(_) => BlockKind::Radio,
            Self::Ofdm(_) => BlockKind::Ofdm,
            Self::UpConverter(_) => BlockKind::UpConverter,
            Self::DownConverter(_) => BlockKind::DownConverter,
        }
    }

    /// Returns the radio surface, if this is a radio block.
    pub fn as_radio(&self) -> Option<&Arc<dyn RadioBlock>> {
        match self {
            Self::Radio(radio) => Some(radio),
            _ => None,
        }
    }

    /// Returns the OFDM surface, if this is an OFDM block.
    pub fn as_ofdm(&self) -> Option<&Arc<dyn OfdmBlock>> {
        match self {
            Self::Ofdm(ofdm) => Some(ofdm),
            _ => None,
        }
    }

    /// Returns the converter surface, if this is an up or down converter.
    pub fn as_converter(&self) -> Option<&Arc<dyn ConverterBlock>> {
        match self {
            Self::UpConverter(cvt) | Self::DownConverter(cvt) => Some(cvt),
            _ => None,
        }
    }
}

impl fmt::Debug for BlockControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlockControl").field(&self.kind()).finish()
    }
}
