//! The graph assembler: wires active channels through the fabric.

use std::sync::Arc;

use ondas_fabric::{
    BlockKind, ConverterBlock, DeviceFabric, OfdmBlock, RadioBlock, RxStream, TxStream,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::topology::{ChannelTopology, Direction};

use super::arena::{BlockArena, BlockEntry, ChainRole};

/// The result of assembly: every block the active channels touch, grouped
/// by capability for downstream configuration.
pub struct AssembledGraph {
    arena: BlockArena,
}

impl std::fmt::Debug for AssembledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledGraph")
            .field("blocks", &self.arena.len())
            .finish()
    }
}

impl AssembledGraph {
    /// All radio blocks, in resolution order.
    pub fn radios(&self) -> Vec<Arc<dyn RadioBlock>> {
        self.arena
            .iter()
            .filter_map(|entry| entry.control.as_radio().cloned())
            .collect()
    }

    /// OFDM blocks tagged transmit-side (modulators).
    pub fn modulators(&self) -> Vec<Arc<dyn OfdmBlock>> {
        self.ofdm_with_role(ChainRole::Transmit)
    }

    /// OFDM blocks tagged receive-side (demodulators).
    pub fn demodulators(&self) -> Vec<Arc<dyn OfdmBlock>> {
        self.ofdm_with_role(ChainRole::Receive)
    }

    /// All OFDM entries with their resolved chain role.
    ///
    /// Fails with [`Error::UnsupportedBlockRole`] if any OFDM block ended up
    /// untagged — a topology that references an OFDM block without putting
    /// it at a chain boundary cannot be configured.
    pub fn ofdm_roles(&self) -> Result<Vec<(Arc<dyn OfdmBlock>, ChainRole)>> {
        self.arena
            .iter()
            .filter_map(|entry| entry.control.as_ofdm().cloned().map(|ofdm| (entry, ofdm)))
            .map(|(entry, ofdm)| {
                let role = entry
                    .role
                    .ok_or_else(|| Error::UnsupportedBlockRole(entry.id.clone()))?;
                Ok((ofdm, role))
            })
            .collect()
    }

    /// Up converters present in the assembled paths.
    pub fn up_converters(&self) -> Vec<Arc<dyn ConverterBlock>> {
        self.converters_of(BlockKind::UpConverter)
    }

    /// Down converters present in the assembled paths.
    pub fn down_converters(&self) -> Vec<Arc<dyn ConverterBlock>> {
        self.converters_of(BlockKind::DownConverter)
    }

    /// All resolved entries, in resolution order.
    pub fn entries(&self) -> impl Iterator<Item = &BlockEntry> {
        self.arena.iter()
    }

    /// Number of distinct blocks resolved during assembly.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` when assembly resolved no blocks.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    fn ofdm_with_role(&self, role: ChainRole) -> Vec<Arc<dyn OfdmBlock>> {
        self.arena
            .iter()
            .filter(|entry| entry.role == Some(role))
            .filter_map(|entry| entry.control.as_ofdm().cloned())
            .collect()
    }

    fn converters_of(&self, kind: BlockKind) -> Vec<Arc<dyn ConverterBlock>> {
        self.arena
            .iter()
            .filter(|entry| entry.control.kind() == kind)
            .filter_map(|entry| entry.control.as_converter().cloned())
            .collect()
    }
}

/// Wires the active channels through the fabric.
///
/// Channels are processed in the given order, transmit path before receive
/// path; the resulting connection sequence is deterministic so wiring logs
/// are reproducible. For each hop, source and destination are required
/// blocks; the converter named by the hop is probed best-effort and skipped
/// when the physical topology omits it.
///
/// When a host transmit endpoint is supplied, its channel-indexed port is
/// wired to the first transmit hop's source before that hop's inter-block
/// connection — the order data physically departs the host. The receive
/// endpoint is wired after the last receive hop's inter-block connection.
///
/// The caller commits the fabric graph once assembly (and any rate
/// configuration) is done.
pub fn assemble(
    fabric: &mut dyn DeviceFabric,
    topology: &ChannelTopology,
    channels: &[u32],
    tx_endpoint: Option<&dyn TxStream>,
    rx_endpoint: Option<&dyn RxStream>,
) -> Result<AssembledGraph> {
    if let Some(tx) = tx_endpoint {
        check_endpoint_width("tx_endpoint", tx.num_channels(), channels.len())?;
    }
    if let Some(rx) = rx_endpoint {
        check_endpoint_width("rx_endpoint", rx.num_channels(), channels.len())?;
    }

    let mut arena = BlockArena::new();
    for (chan_idx, &chan) in channels.iter().enumerate() {
        let plan = topology.plan(chan).ok_or_else(|| {
            Error::invalid_parameter("channels", format!("channel {chan} not in topology"))
        })?;
        for direction in [Direction::Transmit, Direction::Receive] {
            let hops = plan.hops(direction);
            debug!(
                channel = chan,
                direction = direction.label(),
                hops = hops.len(),
                "wiring channel path"
            );
            for (hop_idx, hop) in hops.iter().enumerate() {
                let first = hop_idx == 0;
                let last = hop_idx == hops.len() - 1;

                let src = arena.resolve(fabric, &hop.src)?;
                let dst = arena.resolve(fabric, &hop.dst)?;

                if direction == Direction::Transmit && first && tx_endpoint.is_some() {
                    debug!("  tx-endpoint:{chan_idx} -> {}:{}", hop.src, hop.src_port);
                    fabric.connect_tx_endpoint(chan_idx, &hop.src, hop.src_port)?;
                }

                debug!(
                    "  {}:{} -> {}:{}",
                    hop.src, hop.src_port, hop.dst, hop.dst_port
                );
                fabric.connect(&hop.src, hop.src_port, &hop.dst, hop.dst_port)?;

                // The up/down converter stage is optional in the physical
                // topology; a miss is not an error.
                if arena.resolve_optional(fabric, &hop.converter).is_none() {
                    debug!("  optional converter {} not present", hop.converter);
                }

                if direction == Direction::Receive && last && rx_endpoint.is_some() {
                    debug!("  {}:{} -> rx-endpoint:{chan_idx}", hop.dst, hop.dst_port);
                    fabric.connect_rx_endpoint(&hop.dst, hop.dst_port, chan_idx)?;
                }

                match direction {
                    Direction::Transmit => {
                        if arena.get(src).control.kind() == BlockKind::Ofdm {
                            arena.tag_role(src, ChainRole::Transmit)?;
                        }
                    }
                    Direction::Receive => {
                        if arena.get(dst).control.kind() == BlockKind::Ofdm {
                            arena.tag_role(dst, ChainRole::Receive)?;
                        }
                    }
                }
            }
        }
    }
    Ok(AssembledGraph { arena })
}

fn check_endpoint_width(param: &'static str, endpoint: usize, active: usize) -> Result<()> {
    if endpoint < active {
        return Err(Error::invalid_parameter(
            param,
            format!("endpoint has {endpoint} channels, {active} active channels requested"),
        ));
    }
    Ok(())
}
