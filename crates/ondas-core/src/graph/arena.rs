//! Arena of resolved block controllers, indexed by stable id.

use std::collections::HashMap;

use ondas_fabric::{BlockControl, BlockId, DeviceFabric};

use crate::error::{Error, Result};

/// Stable handle to an entry in a [`BlockArena`].
///
/// Handles are assigned in resolution order and never invalidated for the
/// arena's lifetime. Resolving the same id twice yields the same handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle(pub(crate) usize);

impl BlockHandle {
    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which side of the loop a block serves.
///
/// Assigned during assembly from the topology's direction lists — an OFDM
/// block that sources a transmit hop is transmit-side, one that terminates a
/// receive hop is receive-side. Roles are never inferred from block ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainRole {
    /// Transmit side: modulation, inverse transform, CP insertion.
    Transmit,
    /// Receive side: demodulation, forward transform, CP removal.
    Receive,
}

/// A resolved block with its assembly-time metadata.
pub struct BlockEntry {
    /// Stable fabric id.
    pub id: BlockId,
    /// Resolved controller.
    pub control: BlockControl,
    /// Chain role, where the topology implies one.
    pub role: Option<ChainRole>,
}

/// Lazy cache of block controllers: each id is resolved against the fabric
/// at most once, repeat lookups return the existing entry.
#[derive(Default)]
pub struct BlockArena {
    entries: Vec<BlockEntry>,
    index: HashMap<BlockId, usize>,
}

impl BlockArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a required block, creating its entry on first reference.
    ///
    /// Fails with [`Error::UnresolvedBlock`] if the fabric has no block with
    /// this id.
    pub fn resolve(&mut self, fabric: &dyn DeviceFabric, id: &BlockId) -> Result<BlockHandle> {
        if let Some(&idx) = self.index.get(id) {
            return Ok(BlockHandle(idx));
        }
        let control = fabric
            .find_block(id)
            .ok_or_else(|| Error::UnresolvedBlock(id.clone()))?;
        Ok(self.insert(id.clone(), control))
    }

    /// Resolves an optional block. A fabric miss is an answer, not an error.
    pub fn resolve_optional(
        &mut self,
        fabric: &dyn DeviceFabric,
        id: &BlockId,
    ) -> Option<BlockHandle> {
        if let Some(&idx) = self.index.get(id) {
            return Some(BlockHandle(idx));
        }
        let control = fabric.find_block(id)?;
        Some(self.insert(id.clone(), control))
    }

    fn insert(&mut self, id: BlockId, control: BlockControl) -> BlockHandle {
        let idx = self.entries.len();
        self.entries.push(BlockEntry {
            id: id.clone(),
            control,
            role: None,
        });
        self.index.insert(id, idx);
        BlockHandle(idx)
    }

    /// Tags an entry with a chain role.
    ///
    /// Re-tagging with the same role is a no-op; a conflicting role means
    /// the topology is inconsistent and fails with
    /// [`Error::UnsupportedBlockRole`].
    pub fn tag_role(&mut self, handle: BlockHandle, role: ChainRole) -> Result<()> {
        let entry = &mut self.entries[handle.0];
        match entry.role {
            None => {
                entry.role = Some(role);
                Ok(())
            }
            Some(existing) if existing == role => Ok(()),
            Some(_) => Err(Error::UnsupportedBlockRole(entry.id.clone())),
        }
    }

    /// Returns an entry by handle.
    pub fn get(&self, handle: BlockHandle) -> &BlockEntry {
        &self.entries[handle.0]
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockEntry> {
        self.entries.iter()
    }
}
