//! Streaming transport contracts — timestamped burst send and timed capture.
//!
//! Buffers cross this boundary as packed sc16 words (see
//! [`codec`](crate::codec)), one `Vec<u32>` per channel. Transmit and receive
//! are independent asynchronous operations against the device: ordering
//! between them is enforced only by the timestamps carried in each call,
//! never by host-side sequencing.

use std::time::Duration;

use crate::FabricError;

/// Host transmit endpoint: sends timestamped sample bursts.
pub trait TxStream {
    /// Number of channels this endpoint serves.
    fn num_channels(&self) -> usize;

    /// Sends one atomic burst (start-of-burst and end-of-burst in a single
    /// call) of all channels' samples, timestamped at `at_time` seconds.
    ///
    /// `data` holds one word buffer per channel; all buffers must be the same
    /// length. Returns the number of samples sent per channel. Blocks for at
    /// most `timeout`; an expired timeout is a [`FabricError::Timeout`].
    fn send(&mut self, data: &[Vec<u32>], at_time: f64, timeout: Duration)
    -> Result<usize, FabricError>;
}

/// Host receive endpoint: arms timed captures and collects the result.
pub trait RxStream {
    /// Number of channels this endpoint serves.
    fn num_channels(&self) -> usize;

    /// Arms a count-bounded capture starting at device time `at_time`.
    ///
    /// Non-blocking: the device waits for the timestamp independently of
    /// host progress. Must be issued before the matching transmit burst so
    /// the capture window is guaranteed to be armed when the data arrives.
    fn issue_timed_capture(&mut self, at_time: f64, num_samps: usize) -> Result<(), FabricError>;

    /// Blocks until the armed capture completes or `timeout` expires.
    ///
    /// Fills one buffer per channel and returns the number of samples
    /// received per channel. A short count is returned as `Ok` — deciding
    /// whether a partial capture is fatal is the caller's policy. `Err` is
    /// reserved for device-side faults (overruns, transport failures).
    fn receive(&mut self, out: &mut [Vec<u32>], timeout: Duration) -> Result<usize, FabricError>;
}
