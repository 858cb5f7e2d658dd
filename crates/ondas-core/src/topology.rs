//! Declarative channel topology — the per-channel connection tables.
//!
//! A [`ChannelTopology`] says, for every logical channel, which block ports
//! its transmit and receive paths traverse and in what order. The tables are
//! data, not code: the graph assembler walks them hop by hop and the device
//! fabric does the actual wiring. Topologies are supplied once at startup
//! and are immutable for the run.

use std::collections::BTreeMap;

use ondas_fabric::BlockId;

/// Direction of a signal path through the fabric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Host to antenna: modulator → (up converter) → radio.
    Transmit,
    /// Antenna to host: radio → (down converter) → demodulator.
    Receive,
}

impl Direction {
    /// Short uppercase label for logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Transmit => "TX",
            Self::Receive => "RX",
        }
    }
}

/// One hop of a channel's signal path.
///
/// The converter names an optional intermediate stage between source and
/// destination: it is resolved best-effort and its absence never fails
/// assembly. The actual connection runs from `src` to `dst`; intermediate
/// routing is the fabric's concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    /// Source block.
    pub src: BlockId,
    /// Port on the source block.
    pub src_port: usize,
    /// Optional converter stage crossed by this hop.
    pub converter: BlockId,
    /// Port on the converter.
    pub converter_port: usize,
    /// Destination block.
    pub dst: BlockId,
    /// Port on the destination block.
    pub dst_port: usize,
}

impl Hop {
    /// Creates a hop from `(src, src_port)` via `(converter, converter_port)`
    /// to `(dst, dst_port)`.
    pub fn new(
        src: impl Into<BlockId>,
        src_port: usize,
        converter: impl Into<BlockId>,
        converter_port: usize,
        dst: impl Into<BlockId>,
        dst_port: usize,
    ) -> Self {
        Self {
            src: src.into(),
            src_port,
            converter: converter.into(),
            converter_port,
            dst: dst.into(),
            dst_port,
        }
    }
}

/// The ordered transmit and receive paths of one channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelPlan {
    /// Transmit-path hops, in the order data leaves the host.
    pub tx: Vec<Hop>,
    /// Receive-path hops, in the order data returns to the host.
    pub rx: Vec<Hop>,
}

impl ChannelPlan {
    /// Returns the hop list for one direction.
    pub fn hops(&self, direction: Direction) -> &[Hop] {
        match direction {
            Direction::Transmit => &self.tx,
            Direction::Receive => &self.rx,
        }
    }
}

/// Per-channel connection tables for a whole device.
#[derive(Clone, Debug, Default)]
pub struct ChannelTopology {
    channels: BTreeMap<u32, ChannelPlan>,
}

impl ChannelTopology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the plan for a channel.
    pub fn insert(&mut self, channel: u32, plan: ChannelPlan) {
        self.channels.insert(channel, plan);
    }

    /// Returns the plan for a channel, if the topology has one.
    pub fn plan(&self, channel: u32) -> Option<&ChannelPlan> {
        self.channels.get(&channel)
    }

    /// Returns all channels the topology describes, in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = u32> + '_ {
        self.channels.keys().copied()
    }

    /// The standard four-channel topology: two radios, each fed by one OFDM
    /// block pair through an optional DUC/DDC pair, two channels per radio.
    ///
    /// ```text
    /// ch 0,1:  OFDM#0 ─> DUC#0 ─> Radio#0 ─> DDC#0 ─> OFDM#1
    /// ch 2,3:  OFDM#2 ─> DUC#1 ─> Radio#1 ─> DDC#1 ─> OFDM#3
    /// ```
    pub fn x4_default() -> Self {
        let mut topology = Self::new();
        for (chan, ofdm_pair, cvt, radio) in [
            (0, (0, 1), 0, 0),
            (1, (0, 1), 0, 0),
            (2, (2, 3), 1, 1),
            (3, (2, 3), 1, 1),
        ] {
            let port = (chan % 2) as usize;
            let (ofdm_tx, ofdm_rx) = ofdm_pair;
            topology.insert(
                chan,
                ChannelPlan {
                    tx: vec![Hop::new(
                        format!("0/OFDM#{ofdm_tx}"),
                        port,
                        format!("0/DUC#{cvt}"),
                        port,
                        format!("0/Radio#{radio}"),
                        port,
                    )],
                    rx: vec![Hop::new(
                        format!("0/Radio#{radio}"),
                        port,
                        format!("0/DDC#{cvt}"),
                        port,
                        format!("0/OFDM#{ofdm_rx}"),
                        port,
                    )],
                },
            );
        }
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x4_covers_four_channels() {
        let topology = ChannelTopology::x4_default();
        assert_eq!(topology.channels().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn x4_channel_pairs_share_blocks_on_distinct_ports() {
        let topology = ChannelTopology::x4_default();
        let ch0 = &topology.plan(0).unwrap().tx[0];
        let ch1 = &topology.plan(1).unwrap().tx[0];
        assert_eq!(ch0.src, ch1.src);
        assert_eq!(ch0.src_port, 0);
        assert_eq!(ch1.src_port, 1);
    }

    #[test]
    fn x4_rx_path_ends_in_the_pair_demodulator() {
        let topology = ChannelTopology::x4_default();
        let rx = &topology.plan(2).unwrap().rx[0];
        assert_eq!(rx.src, BlockId::from("0/Radio#1"));
        assert_eq!(rx.dst, BlockId::from("0/OFDM#3"));
    }
}
