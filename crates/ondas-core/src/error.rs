//! Error types for loopback test operations.
//!
//! The taxonomy separates configuration-time failures (rejected before any
//! hardware is touched) from data-plane failures (a cycle that ran and went
//! wrong). Data-plane failures are surfaced to the caller unmodified and
//! never retried internally; a short capture in particular must not be
//! masked, since it implies real data loss.

use ondas_fabric::{BlockId, FabricError};
use thiserror::Error;

/// Errors that can occur while assembling, configuring, or driving the
/// loopback test.
#[derive(Debug, Error)]
pub enum Error {
    /// A run parameter failed validation.
    #[error("invalid {param}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        param: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A required topology block could not be resolved in the fabric.
    #[error("required block '{0}' not found in the fabric")]
    UnresolvedBlock(BlockId),

    /// An OFDM block could not be classified as transmit-side or
    /// receive-side from the topology.
    #[error("block '{0}' has no transmit/receive role in the topology")]
    UnsupportedBlockRole(BlockId),

    /// The latency table has no entry for the device tick rate and no
    /// override was given.
    #[error("unsupported tick rate: {:.02} MS/s (no latency entry, no override)", .0 / 1e6)]
    UnsupportedTickRate(f64),

    /// The transmit burst did not complete within its timeout.
    #[error("transmit burst timed out")]
    TransmitTimeout,

    /// Fewer samples were captured than were sent — data was lost.
    #[error("short capture: sent {sent} samples, received {received}")]
    ShortCapture {
        /// Samples sent per channel.
        sent: usize,
        /// Samples received per channel.
        received: usize,
    },

    /// A cycle operation was invoked in the wrong state.
    #[error("cycle is {actual}, expected {expected}")]
    CycleState {
        /// State the operation requires.
        expected: &'static str,
        /// State the cycle is actually in.
        actual: &'static str,
    },

    /// Failure reported by the device fabric or transport.
    #[error(transparent)]
    Fabric(#[from] FabricError),

    /// Failure loading the run configuration.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl Error {
    /// Creates an [`Error::InvalidParameter`].
    pub fn invalid_parameter(param: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            param,
            reason: reason.into(),
        }
    }
}

/// Convenience result type for loopback test operations.
pub type Result<T> = std::result::Result<T, Error>;
