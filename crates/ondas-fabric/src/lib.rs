//! Device fabric abstraction for the ondas OFDM loopback exerciser.
//!
//! This crate defines the contracts the core test logic talks to, without
//! committing to any particular device or transport implementation:
//!
//! - **Block capabilities**: [`RadioBlock`], [`OfdmBlock`], [`ConverterBlock`]
//!   — the narrow control surfaces each block kind exposes
//! - **Fabric**: [`DeviceFabric`] — block discovery, port wiring, graph commit
//! - **Streaming**: [`TxStream`] / [`RxStream`] — timestamped burst send and
//!   timed, count-bounded capture
//! - **Sample codec**: [`codec`] — bit-exact sc16 packing at the host/device
//!   boundary
//! - **Mock**: [`mock`] — a deterministic in-memory fabric for tests and
//!   simulated loopback runs
//!
//! The traits are object-safe by design so applications can select a fabric
//! at runtime (`&mut dyn DeviceFabric`), and the mock implements the exact
//! same seam the real device would.

pub mod codec;

mod block;
mod fabric;
mod stream;

pub mod mock;

pub use block::{
    BlockControl, BlockId, BlockKind, ConverterBlock, FftDirection, OfdmBlock, OfdmCapabilities,
    RadioBlock,
};
pub use fabric::DeviceFabric;
pub use stream::{RxStream, TxStream};

/// Error types for fabric and transport operations.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// A connection referenced a block the fabric does not have.
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    /// A per-channel operation addressed a channel the block does not have.
    #[error("channel {chan} out of range for block '{block}' ({channels} channels)")]
    ChannelOutOfRange {
        /// Block that rejected the operation.
        block: String,
        /// Requested channel index.
        chan: usize,
        /// Number of channels the block actually has.
        channels: usize,
    },

    /// A connection was attempted after the graph was committed.
    #[error("graph already committed; no further connections may be added")]
    GraphCommitted,

    /// A streaming call did not complete within its timeout.
    #[error("stream operation timed out")]
    Timeout,

    /// The device reported an overrun or underrun on the data path.
    #[error("device-side overrun/underrun")]
    Overrun,

    /// Transport-level failure.
    #[error("stream error: {0}")]
    Stream(String),
}
