//! The timed transmit/receive cycle, modeled as an explicit state machine.
//!
//! One cycle walks `Idle → ArmedReceive → Transmitting → AwaitingCapture →
//! Complete` (or `Failed`). The capture is always armed before the burst is
//! sent: both are independent asynchronous operations against the device,
//! and only the timestamps — never host-side call order — decide when they
//! execute, so arming late would race the data into a closed window.
//!
//! Failures are terminal for the cycle and surfaced unmodified; whether to
//! re-run a failed cycle is the caller's decision. A capture that returns
//! fewer samples than were requested is tolerated (the tail of the window
//! is CP overhead), but fewer samples than were *sent* means data loss and
//! fails the cycle.

use std::time::Duration;

use ondas_fabric::{FabricError, RxStream, TxStream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::timing::TimingPlan;

/// Default bound on the blocking burst send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on waiting for the capture to complete.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Progress of one transmit/receive cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    /// Nothing issued yet.
    Idle,
    /// Timed capture armed on the device.
    ArmedReceive,
    /// Burst send in progress.
    Transmitting,
    /// Burst sent, waiting for the capture to complete.
    AwaitingCapture,
    /// Capture delivered to the caller.
    Complete,
    /// A data-plane failure ended the cycle.
    Failed,
}

impl CycleState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ArmedReceive => "ArmedReceive",
            Self::Transmitting => "Transmitting",
            Self::AwaitingCapture => "AwaitingCapture",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

/// One timed transmit/receive cycle over an assembled graph.
pub struct LoopbackCycle {
    plan: TimingPlan,
    state: CycleState,
    sent: usize,
    send_timeout: Duration,
    recv_timeout: Duration,
}

impl LoopbackCycle {
    /// Creates an idle cycle for the given timing plan.
    pub fn new(plan: TimingPlan) -> Self {
        Self {
            plan,
            state: CycleState::Idle,
            sent: 0,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }

    /// Overrides the send and receive timeouts.
    pub fn with_timeouts(mut self, send: Duration, recv: Duration) -> Self {
        self.send_timeout = send;
        self.recv_timeout = recv;
        self
    }

    /// Current cycle state.
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// The timing plan driving this cycle.
    pub fn plan(&self) -> &TimingPlan {
        &self.plan
    }

    /// Arms the timed capture: `Idle → ArmedReceive`.
    ///
    /// Non-blocking — the device waits for the receive timestamp on its
    /// own. Must precede [`transmit`](Self::transmit) so the capture window
    /// is guaranteed to exist regardless of host scheduling jitter.
    pub fn arm(&mut self, rx: &mut dyn RxStream) -> Result<()> {
        self.expect(CycleState::Idle)?;
        debug!(
            at = self.plan.receive_time,
            samples = self.plan.capture_samples,
            "arming timed capture"
        );
        match rx.issue_timed_capture(self.plan.receive_time, self.plan.capture_samples) {
            Ok(()) => {
                self.state = CycleState::ArmedReceive;
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Sends the burst: `ArmedReceive → Transmitting → AwaitingCapture`.
    ///
    /// One atomic burst (start- and end-of-burst) of all channels' buffers,
    /// timestamped at the plan's transmit time. Returns the per-channel
    /// sample count actually sent.
    pub fn transmit(&mut self, tx: &mut dyn TxStream, data: &[Vec<u32>]) -> Result<usize> {
        self.expect(CycleState::ArmedReceive)?;
        self.state = CycleState::Transmitting;
        match tx.send(data, self.plan.transmit_time, self.send_timeout) {
            Ok(sent) => {
                info!(sent, at = self.plan.transmit_time, "burst sent");
                self.sent = sent;
                self.state = CycleState::AwaitingCapture;
                Ok(sent)
            }
            Err(FabricError::Timeout) => Err(self.fail(Error::TransmitTimeout)),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Collects the capture: `AwaitingCapture → Complete` (or `Failed`).
    ///
    /// Blocks until the capture completes or the receive timeout expires.
    /// Returns the per-channel sample count received; `out` is filled one
    /// buffer per channel.
    pub fn finish(&mut self, rx: &mut dyn RxStream, out: &mut [Vec<u32>]) -> Result<usize> {
        self.expect(CycleState::AwaitingCapture)?;
        match rx.receive(out, self.recv_timeout) {
            Ok(received) if received < self.sent => Err(self.fail(Error::ShortCapture {
                sent: self.sent,
                received,
            })),
            Ok(received) => {
                info!(received, "capture complete");
                self.state = CycleState::Complete;
                Ok(received)
            }
            // Overruns and transport faults are surfaced, not retried.
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn expect(&self, expected: CycleState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::CycleState {
                expected: expected.name(),
                actual: self.state.name(),
            })
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = CycleState::Failed;
        err
    }
}

/// Runs one full cycle: arm, transmit, collect.
///
/// Convenience wrapper over the three-step API; returns the per-channel
/// sample count received.
pub fn run_cycle(
    plan: TimingPlan,
    tx: &mut dyn TxStream,
    rx: &mut dyn RxStream,
    data: &[Vec<u32>],
    out: &mut [Vec<u32>],
) -> Result<usize> {
    let mut cycle = LoopbackCycle::new(plan);
    cycle.arm(rx)?;
    cycle.transmit(tx, data)?;
    cycle.finish(rx, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::CpSchedule;
    use ondas_fabric::mock::MockFabric;

    const TICK_RATE: f64 = 125.0e6;

    fn plan(fft_size: usize, num_symbols: usize, cp: &CpSchedule) -> TimingPlan {
        TimingPlan::new(1.0, 2.0 / TICK_RATE, fft_size, num_symbols, cp)
    }

    #[test]
    fn cycle_walks_the_happy_path() {
        let fabric = MockFabric::new(TICK_RATE);
        let mut tx = fabric.tx_stream(1);
        let mut rx = fabric.rx_stream(1);
        let data = vec![vec![7u32; 16]];
        let mut out = vec![Vec::new()];

        let mut cycle = LoopbackCycle::new(plan(8, 2, &CpSchedule::new(vec![2, 1])));
        assert_eq!(cycle.state(), CycleState::Idle);

        cycle.arm(&mut rx).unwrap();
        assert_eq!(cycle.state(), CycleState::ArmedReceive);

        assert_eq!(cycle.transmit(&mut tx, &data).unwrap(), 16);
        assert_eq!(cycle.state(), CycleState::AwaitingCapture);

        let received = cycle.finish(&mut rx, &mut out).unwrap();
        assert_eq!(cycle.state(), CycleState::Complete);
        assert_eq!(received, 19);
        assert_eq!(&out[0][..16], &data[0][..]);
    }

    #[test]
    fn transmit_before_arm_is_a_state_error() {
        let fabric = MockFabric::new(TICK_RATE);
        let mut tx = fabric.tx_stream(1);
        let mut cycle = LoopbackCycle::new(plan(8, 1, &CpSchedule::default()));

        let err = cycle.transmit(&mut tx, &[vec![0u32; 8]]).unwrap_err();
        assert!(matches!(err, Error::CycleState { .. }));
        // A misuse error does not fail the cycle; it never started.
        assert_eq!(cycle.state(), CycleState::Idle);
    }

    #[test]
    fn send_timeout_fails_the_cycle() {
        let fabric = MockFabric::new(TICK_RATE);
        let mut tx = fabric.tx_stream(1);
        let mut rx = fabric.rx_stream(1);
        tx.fail_with_timeout(true);

        let mut cycle = LoopbackCycle::new(plan(8, 1, &CpSchedule::default()));
        cycle.arm(&mut rx).unwrap();
        let err = cycle.transmit(&mut tx, &[vec![0u32; 8]]).unwrap_err();
        assert!(matches!(err, Error::TransmitTimeout));
        assert_eq!(cycle.state(), CycleState::Failed);
    }

    #[test]
    fn short_capture_fails_the_cycle() {
        let fabric = MockFabric::new(TICK_RATE);
        let mut tx = fabric.tx_stream(1);
        let mut rx = fabric.rx_stream(1);
        rx.truncate_next(4);

        let mut cycle = LoopbackCycle::new(plan(8, 1, &CpSchedule::default()));
        cycle.arm(&mut rx).unwrap();
        cycle.transmit(&mut tx, &[vec![3u32; 8]]).unwrap();
        let mut out = vec![Vec::new()];
        let err = cycle.finish(&mut rx, &mut out).unwrap_err();
        assert!(matches!(err, Error::ShortCapture { sent: 8, received: 4 }));
        assert_eq!(cycle.state(), CycleState::Failed);
    }

    #[test]
    fn capture_shorter_than_requested_but_covering_the_burst_is_ok() {
        let fabric = MockFabric::new(TICK_RATE);
        let mut tx = fabric.tx_stream(1);
        let mut rx = fabric.rx_stream(1);
        // 19 requested (16 payload + 3 CP), only 17 delivered — still >= sent.
        rx.truncate_next(17);

        let mut out = vec![Vec::new()];
        let received = run_cycle(
            plan(8, 2, &CpSchedule::new(vec![2, 1])),
            &mut tx,
            &mut rx,
            &[vec![1u32; 16]],
            &mut out,
        )
        .unwrap();
        assert_eq!(received, 17);
    }
}
