//! Deterministic in-memory fabric and transport for tests and simulated runs.
//!
//! [`MockFabric`] stands in for a real device: blocks are plain structs with
//! register maps behind mutexes, connections are recorded in a log, and the
//! transmit/receive path models the net effect of a matched
//! modulate/demodulate pair in digital loopback — an exactly aligned capture
//! returns the transmitted samples unchanged, while a mistimed capture window
//! shifts them, so timing bugs show up as data corruption here just as they
//! would on hardware.
//!
//! The mock applies a fixed pipeline latency of `loopback_delay_cycles` ticks
//! between the transmit timestamp and the moment data reaches the capture
//! window. A capture armed at `tx_time + delay_cycles / tick_rate` lines up
//! sample-exactly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::block::{
    BlockControl, BlockId, ConverterBlock, FftDirection, OfdmBlock, OfdmCapabilities, RadioBlock,
};
use crate::fabric::DeviceFabric;
use crate::stream::{RxStream, TxStream};
use crate::FabricError;

/// Loopback-enable register base address, one slot every 128 bytes per channel.
const REG_LOOPBACK_BASE: u32 = 0x1000;
const REG_LOOPBACK_STRIDE: u32 = 128;

/// Shared state of the mock's loopback data path.
#[derive(Default)]
struct LinkState {
    /// Per-channel word buffers from the last burst.
    tx_data: Vec<Vec<u32>>,
    /// Timestamp of the last burst, in seconds.
    tx_time: f64,
    /// Armed capture: (start time, sample count).
    pending_capture: Option<(f64, usize)>,
    /// If set, the next receive returns at most this many samples.
    truncate_next: Option<usize>,
}

/// In-memory radio block with a poke-style register map.
pub struct MockRadioBlock {
    id: BlockId,
    channels: usize,
    tick_rate: f64,
    regs: Mutex<HashMap<u32, u32>>,
    spp: Mutex<Vec<Option<usize>>>,
    tx_gain: Mutex<Vec<Option<f64>>>,
    rx_gain: Mutex<Vec<Option<f64>>>,
    time_now: Mutex<f64>,
}

impl MockRadioBlock {
    fn new(id: BlockId, channels: usize, tick_rate: f64) -> Self {
        Self {
            id,
            channels,
            tick_rate,
            regs: Mutex::new(HashMap::new()),
            spp: Mutex::new(vec![None; channels]),
            tx_gain: Mutex::new(vec![None; channels]),
            rx_gain: Mutex::new(vec![None; channels]),
            time_now: Mutex::new(0.0),
        }
    }

    fn check_chan(&self, chan: usize) -> Result<(), FabricError> {
        if chan < self.channels {
            Ok(())
        } else {
            Err(FabricError::ChannelOutOfRange {
                block: self.id.to_string(),
                chan,
                channels: self.channels,
            })
        }
    }

    /// Returns whether the loopback register is set for a channel.
    pub fn loopback_enabled(&self, chan: usize) -> bool {
        let addr = REG_LOOPBACK_BASE + REG_LOOPBACK_STRIDE * chan as u32;
        self.regs.lock().unwrap().get(&addr).copied() == Some(1)
    }

    /// Returns the programmed samples-per-packet for a channel.
    pub fn samples_per_packet(&self, chan: usize) -> Option<usize> {
        self.spp.lock().unwrap()[chan]
    }

    /// Returns the programmed TX gain for a channel.
    pub fn tx_gain(&self, chan: usize) -> Option<f64> {
        self.tx_gain.lock().unwrap()[chan]
    }

    /// Returns the programmed RX gain for a channel.
    pub fn rx_gain(&self, chan: usize) -> Option<f64> {
        self.rx_gain.lock().unwrap()[chan]
    }

    /// Advances the mock device clock to `seconds`.
    pub fn set_time_now(&self, seconds: f64) {
        *self.time_now.lock().unwrap() = seconds;
    }
}

impl RadioBlock for MockRadioBlock {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn set_loopback(&self, chan: usize, enabled: bool) -> Result<(), FabricError> {
        self.check_chan(chan)?;
        let addr = REG_LOOPBACK_BASE + REG_LOOPBACK_STRIDE * chan as u32;
        self.regs.lock().unwrap().insert(addr, u32::from(enabled));
        Ok(())
    }

    fn set_samples_per_packet(&self, chan: usize, spp: usize) -> Result<(), FabricError> {
        self.check_chan(chan)?;
        self.spp.lock().unwrap()[chan] = Some(spp);
        Ok(())
    }

    fn set_tx_gain(&self, chan: usize, gain: f64) -> Result<(), FabricError> {
        self.check_chan(chan)?;
        self.tx_gain.lock().unwrap()[chan] = Some(gain);
        Ok(())
    }

    fn set_rx_gain(&self, chan: usize, gain: f64) -> Result<(), FabricError> {
        self.check_chan(chan)?;
        self.rx_gain.lock().unwrap()[chan] = Some(gain);
        Ok(())
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    fn time_now(&self) -> f64 {
        *self.time_now.lock().unwrap()
    }
}

#[derive(Default)]
struct OfdmState {
    fft_size: Option<usize>,
    direction: Option<FftDirection>,
    scaling: Option<u32>,
    cp_insertion: Vec<u32>,
    cp_removal: Vec<u32>,
    insertion_clears: usize,
    removal_clears: usize,
}

/// In-memory OFDM block recording every programmed setting.
pub struct MockOfdmBlock {
    caps: OfdmCapabilities,
    state: Mutex<OfdmState>,
}

impl MockOfdmBlock {
    fn new(caps: OfdmCapabilities) -> Self {
        Self {
            caps,
            state: Mutex::new(OfdmState::default()),
        }
    }

    /// Returns the programmed FFT size.
    pub fn fft_size(&self) -> Option<usize> {
        self.state.lock().unwrap().fft_size
    }

    /// Returns the programmed transform direction.
    pub fn direction(&self) -> Option<FftDirection> {
        self.state.lock().unwrap().direction
    }

    /// Returns the programmed scaling register value.
    pub fn scaling(&self) -> Option<u32> {
        self.state.lock().unwrap().scaling
    }

    /// Returns the loaded CP insertion schedule.
    pub fn cp_insertion(&self) -> Vec<u32> {
        self.state.lock().unwrap().cp_insertion.clone()
    }

    /// Returns the loaded CP removal schedule.
    pub fn cp_removal(&self) -> Vec<u32> {
        self.state.lock().unwrap().cp_removal.clone()
    }

    /// Number of times the insertion queue was cleared.
    pub fn insertion_clears(&self) -> usize {
        self.state.lock().unwrap().insertion_clears
    }

    /// Number of times the removal queue was cleared.
    pub fn removal_clears(&self) -> usize {
        self.state.lock().unwrap().removal_clears
    }
}

impl OfdmBlock for MockOfdmBlock {
    fn capabilities(&self) -> OfdmCapabilities {
        self.caps
    }

    fn clear_cp_insertion(&self) -> Result<(), FabricError> {
        let mut state = self.state.lock().unwrap();
        state.cp_insertion.clear();
        state.insertion_clears += 1;
        Ok(())
    }

    fn clear_cp_removal(&self) -> Result<(), FabricError> {
        let mut state = self.state.lock().unwrap();
        state.cp_removal.clear();
        state.removal_clears += 1;
        Ok(())
    }

    fn set_fft_size(&self, fft_size: usize) -> Result<(), FabricError> {
        self.state.lock().unwrap().fft_size = Some(fft_size);
        Ok(())
    }

    fn set_fft_direction(&self, direction: FftDirection) -> Result<(), FabricError> {
        self.state.lock().unwrap().direction = Some(direction);
        Ok(())
    }

    fn set_fft_scaling(&self, pattern: u32) -> Result<(), FabricError> {
        self.state.lock().unwrap().scaling = Some(pattern);
        Ok(())
    }

    fn load_cp_insertion(&self, lengths: &[u32]) -> Result<(), FabricError> {
        self.state.lock().unwrap().cp_insertion = lengths.to_vec();
        Ok(())
    }

    fn load_cp_removal(&self, lengths: &[u32]) -> Result<(), FabricError> {
        self.state.lock().unwrap().cp_removal = lengths.to_vec();
        Ok(())
    }
}

/// In-memory up/down converter that achieves every requested rate exactly.
pub struct MockConverterBlock {
    channels: usize,
    input_rates: Mutex<Vec<Option<f64>>>,
    output_rates: Mutex<Vec<Option<f64>>>,
}

impl MockConverterBlock {
    fn new(channels: usize) -> Self {
        Self {
            channels,
            input_rates: Mutex::new(vec![None; channels]),
            output_rates: Mutex::new(vec![None; channels]),
        }
    }

    /// Returns the requested input rate for a channel.
    pub fn input_rate(&self, chan: usize) -> Option<f64> {
        self.input_rates.lock().unwrap()[chan]
    }

    /// Returns the requested output rate for a channel.
    pub fn output_rate(&self, chan: usize) -> Option<f64> {
        self.output_rates.lock().unwrap()[chan]
    }
}

impl ConverterBlock for MockConverterBlock {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn set_input_rate(&self, chan: usize, rate: f64) -> Result<f64, FabricError> {
        self.input_rates.lock().unwrap()[chan] = Some(rate);
        Ok(rate)
    }

    fn set_output_rate(&self, chan: usize, rate: f64) -> Result<f64, FabricError> {
        self.output_rates.lock().unwrap()[chan] = Some(rate);
        Ok(rate)
    }
}

/// Deterministic in-memory device fabric.
pub struct MockFabric {
    blocks: HashMap<BlockId, BlockControl>,
    connections: Vec<String>,
    committed: bool,
    link: Arc<Mutex<LinkState>>,
    tick_rate: f64,
    loopback_delay_cycles: u64,
}

impl MockFabric {
    /// Creates an empty fabric with the given tick rate and a 2-cycle
    /// pipeline latency (the internal-loopback latency of the 100 MHz
    /// device class).
    pub fn new(tick_rate: f64) -> Self {
        Self {
            blocks: HashMap::new(),
            connections: Vec::new(),
            committed: false,
            link: Arc::new(Mutex::new(LinkState::default())),
            tick_rate,
            loopback_delay_cycles: 2,
        }
    }

    /// Overrides the modeled pipeline latency in ticks.
    pub fn with_loopback_delay(mut self, cycles: u64) -> Self {
        self.loopback_delay_cycles = cycles;
        self
    }

    /// Adds a radio block and returns it for later inspection.
    pub fn add_radio(&mut self, id: impl Into<BlockId>, channels: usize) -> Arc<MockRadioBlock> {
        let id = id.into();
        let radio = Arc::new(MockRadioBlock::new(id.clone(), channels, self.tick_rate));
        self.blocks
            .insert(id, BlockControl::Radio(radio.clone() as Arc<dyn RadioBlock>));
        radio
    }

    /// Adds an OFDM block with default capabilities.
    pub fn add_ofdm(&mut self, id: impl Into<BlockId>) -> Arc<MockOfdmBlock> {
        self.add_ofdm_with_caps(
            id,
            OfdmCapabilities {
                max_fft_size: 4096,
                max_cp_length: 4095,
                max_cp_ins_list_length: 32,
                max_cp_rem_list_length: 32,
            },
        )
    }

    /// Adds an OFDM block with explicit capability limits.
    pub fn add_ofdm_with_caps(
        &mut self,
        id: impl Into<BlockId>,
        caps: OfdmCapabilities,
    ) -> Arc<MockOfdmBlock> {
        let ofdm = Arc::new(MockOfdmBlock::new(caps));
        self.blocks.insert(
            id.into(),
            BlockControl::Ofdm(ofdm.clone() as Arc<dyn OfdmBlock>),
        );
        ofdm
    }

    /// Adds a digital up converter.
    pub fn add_up_converter(
        &mut self,
        id: impl Into<BlockId>,
        channels: usize,
    ) -> Arc<MockConverterBlock> {
        let cvt = Arc::new(MockConverterBlock::new(channels));
        self.blocks.insert(
            id.into(),
            BlockControl::UpConverter(cvt.clone() as Arc<dyn ConverterBlock>),
        );
        cvt
    }

    /// Adds a digital down converter.
    pub fn add_down_converter(
        &mut self,
        id: impl Into<BlockId>,
        channels: usize,
    ) -> Arc<MockConverterBlock> {
        let cvt = Arc::new(MockConverterBlock::new(channels));
        self.blocks.insert(
            id.into(),
            BlockControl::DownConverter(cvt.clone() as Arc<dyn ConverterBlock>),
        );
        cvt
    }

    /// Creates a transmit endpoint bound to this fabric's loopback path.
    pub fn tx_stream(&self, channels: usize) -> MockTxStream {
        MockTxStream {
            channels,
            link: Arc::clone(&self.link),
            fail_with_timeout: false,
        }
    }

    /// Creates a receive endpoint bound to this fabric's loopback path.
    pub fn rx_stream(&self, channels: usize) -> MockRxStream {
        MockRxStream {
            channels,
            link: Arc::clone(&self.link),
            tick_rate: self.tick_rate,
            delay_cycles: self.loopback_delay_cycles,
        }
    }

    /// Returns the recorded connection log, in wiring order.
    pub fn connections(&self) -> &[String] {
        &self.connections
    }

    /// Returns whether the graph has been committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    fn check_open(&self) -> Result<(), FabricError> {
        if self.committed {
            Err(FabricError::GraphCommitted)
        } else {
            Ok(())
        }
    }

    fn check_known(&self, id: &BlockId) -> Result<(), FabricError> {
        if self.blocks.contains_key(id) {
            Ok(())
        } else {
            Err(FabricError::UnknownBlock(id.to_string()))
        }
    }
}

impl DeviceFabric for MockFabric {
    fn find_block(&self, id: &BlockId) -> Option<BlockControl> {
        self.blocks.get(id).cloned()
    }

    fn connect(
        &mut self,
        src: &BlockId,
        src_port: usize,
        dst: &BlockId,
        dst_port: usize,
    ) -> Result<(), FabricError> {
        self.check_open()?;
        self.check_known(src)?;
        self.check_known(dst)?;
        let connection = format!("{src}:{src_port} -> {dst}:{dst_port}");
        tracing::debug!("mock connect: {connection}");
        self.connections.push(connection);
        Ok(())
    }

    fn connect_tx_endpoint(
        &mut self,
        endpoint_chan: usize,
        dst: &BlockId,
        dst_port: usize,
    ) -> Result<(), FabricError> {
        self.check_open()?;
        self.check_known(dst)?;
        self.connections
            .push(format!("tx-endpoint:{endpoint_chan} -> {dst}:{dst_port}"));
        Ok(())
    }

    fn connect_rx_endpoint(
        &mut self,
        src: &BlockId,
        src_port: usize,
        endpoint_chan: usize,
    ) -> Result<(), FabricError> {
        self.check_open()?;
        self.check_known(src)?;
        self.connections
            .push(format!("{src}:{src_port} -> rx-endpoint:{endpoint_chan}"));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), FabricError> {
        self.check_open()?;
        tracing::debug!(connections = self.connections.len(), "mock graph committed");
        self.committed = true;
        Ok(())
    }
}

/// Transmit endpoint of the mock loopback path.
pub struct MockTxStream {
    channels: usize,
    link: Arc<Mutex<LinkState>>,
    fail_with_timeout: bool,
}

impl MockTxStream {
    /// Makes the next and all following sends fail with a timeout.
    pub fn fail_with_timeout(&mut self, fail: bool) {
        self.fail_with_timeout = fail;
    }
}

impl TxStream for MockTxStream {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn send(
        &mut self,
        data: &[Vec<u32>],
        at_time: f64,
        _timeout: Duration,
    ) -> Result<usize, FabricError> {
        if self.fail_with_timeout {
            return Err(FabricError::Timeout);
        }
        if data.len() != self.channels {
            return Err(FabricError::Stream(format!(
                "burst has {} channel buffers, endpoint has {} channels",
                data.len(),
                self.channels
            )));
        }
        let len = data.first().map_or(0, Vec::len);
        if data.iter().any(|chan| chan.len() != len) {
            return Err(FabricError::Stream(
                "channel buffers in a burst must be equal length".into(),
            ));
        }
        let mut link = self.link.lock().unwrap();
        link.tx_data = data.to_vec();
        link.tx_time = at_time;
        Ok(len)
    }
}

/// Receive endpoint of the mock loopback path.
pub struct MockRxStream {
    channels: usize,
    link: Arc<Mutex<LinkState>>,
    tick_rate: f64,
    delay_cycles: u64,
}

impl MockRxStream {
    /// Forces the next receive to deliver at most `count` samples,
    /// simulating a device-side short capture.
    pub fn truncate_next(&mut self, count: usize) {
        self.link.lock().unwrap().truncate_next = Some(count);
    }
}

impl RxStream for MockRxStream {
    fn num_channels(&self) -> usize {
        self.channels
    }

    fn issue_timed_capture(&mut self, at_time: f64, num_samps: usize) -> Result<(), FabricError> {
        self.link.lock().unwrap().pending_capture = Some((at_time, num_samps));
        Ok(())
    }

    fn receive(&mut self, out: &mut [Vec<u32>], _timeout: Duration) -> Result<usize, FabricError> {
        let mut link = self.link.lock().unwrap();
        let Some((capture_time, num_samps)) = link.pending_capture.take() else {
            return Err(FabricError::Stream("no capture armed".into()));
        };
        if link.tx_data.is_empty() {
            // Nothing was transmitted inside the capture window.
            return Ok(0);
        }
        // Sample offset of the capture window relative to the moment the
        // transmitted data reaches the receive side.
        let offset =
            ((capture_time - link.tx_time) * self.tick_rate).round() as i64 - self.delay_cycles as i64;
        let count = match link.truncate_next.take() {
            Some(limit) => num_samps.min(limit),
            None => num_samps,
        };
        for (buf, tx) in out.iter_mut().zip(&link.tx_data) {
            buf.clear();
            buf.resize(count, 0);
            for (i, word) in buf.iter_mut().enumerate() {
                let src = i as i64 + offset;
                if src >= 0 && (src as usize) < tx.len() {
                    *word = tx[src as usize];
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_block_fabric() -> MockFabric {
        let mut fabric = MockFabric::new(125.0e6);
        fabric.add_radio("0/Radio#0", 2);
        fabric.add_ofdm("0/OFDM#0");
        fabric
    }

    #[test]
    fn find_block_misses_return_none() {
        let fabric = two_block_fabric();
        assert!(fabric.find_block(&BlockId::from("0/DUC#0")).is_none());
        assert!(fabric.find_block(&BlockId::from("0/Radio#0")).is_some());
    }

    #[test]
    fn connect_after_commit_is_rejected() {
        let mut fabric = two_block_fabric();
        fabric.commit().unwrap();
        let err = fabric
            .connect(&"0/OFDM#0".into(), 0, &"0/Radio#0".into(), 0)
            .unwrap_err();
        assert!(matches!(err, FabricError::GraphCommitted));
    }

    #[test]
    fn loopback_register_round_trips() {
        let mut fabric = two_block_fabric();
        let radio = fabric.add_radio("0/Radio#1", 2);
        radio.set_loopback(1, true).unwrap();
        assert!(radio.loopback_enabled(1));
        assert!(!radio.loopback_enabled(0));
    }

    #[test]
    fn aligned_capture_returns_transmitted_words() {
        let fabric = two_block_fabric();
        let mut tx = fabric.tx_stream(1);
        let mut rx = fabric.rx_stream(1);

        let data = vec![vec![1u32, 2, 3, 4]];
        let tx_time = 1.0;
        let rx_time = tx_time + 2.0 / 125.0e6;
        rx.issue_timed_capture(rx_time, 6).unwrap();
        tx.send(&data, tx_time, Duration::from_secs(5)).unwrap();

        let mut out = vec![Vec::new()];
        let received = rx.receive(&mut out, Duration::from_secs(5)).unwrap();
        assert_eq!(received, 6);
        assert_eq!(out[0], vec![1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn mistimed_capture_shifts_the_window() {
        let fabric = two_block_fabric();
        let mut tx = fabric.tx_stream(1);
        let mut rx = fabric.rx_stream(1);

        // Armed one tick late: the first transmitted word is lost.
        let tx_time = 1.0;
        let rx_time = tx_time + 3.0 / 125.0e6;
        rx.issue_timed_capture(rx_time, 4).unwrap();
        tx.send(&[vec![10u32, 20, 30, 40]], tx_time, Duration::from_secs(5))
            .unwrap();

        let mut out = vec![Vec::new()];
        rx.receive(&mut out, Duration::from_secs(5)).unwrap();
        assert_eq!(out[0], vec![20, 30, 40, 0]);
    }
}
