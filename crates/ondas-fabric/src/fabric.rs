//! The device fabric contract — block discovery, wiring, and commit.
//!
//! A [`DeviceFabric`] is the host's handle on the device's block topology. It
//! resolves blocks by id, creates port-to-port connections (routing through
//! whatever infrastructure the device needs, transparently), attaches host
//! stream endpoints at chain boundaries, and finalizes the whole graph with a
//! one-shot [`commit`](DeviceFabric::commit).
//!
//! `find_block` returns an `Option` by design: some stages of a signal path
//! (the up/down converters) are optional in the physical topology, and their
//! absence is an answer, not an error. Callers that require a block decide
//! for themselves what a `None` means.

use crate::block::{BlockControl, BlockId};
use crate::FabricError;

/// Host-side handle on the device's block fabric.
pub trait DeviceFabric {
    /// Resolves a block by id, or `None` if the topology has no such block.
    ///
    /// Repeat lookups with the same id return controllers for the same
    /// underlying block.
    fn find_block(&self, id: &BlockId) -> Option<BlockControl>;

    /// Connects a source block port to a destination block port.
    ///
    /// Any intermediate routing infrastructure between the two blocks is
    /// traversed transparently.
    fn connect(
        &mut self,
        src: &BlockId,
        src_port: usize,
        dst: &BlockId,
        dst_port: usize,
    ) -> Result<(), FabricError>;

    /// Connects a host transmit-endpoint channel to a block port.
    fn connect_tx_endpoint(
        &mut self,
        endpoint_chan: usize,
        dst: &BlockId,
        dst_port: usize,
    ) -> Result<(), FabricError>;

    /// Connects a block port to a host receive-endpoint channel.
    fn connect_rx_endpoint(
        &mut self,
        src: &BlockId,
        src_port: usize,
        endpoint_chan: usize,
    ) -> Result<(), FabricError>;

    /// Finalizes the graph. No further connections may be added afterwards.
    fn commit(&mut self) -> Result<(), FabricError>;
}
