//! Graph assembly — turning connection tables into a wired block graph.
//!
//! The assembler walks a [`ChannelTopology`](crate::topology::ChannelTopology)
//! for the active channels, resolves block controllers lazily through a
//! [`BlockArena`] (one instance per id for the whole run), creates the
//! fabric connections in deterministic order, and tags each OFDM block with
//! its chain role so later configuration never has to guess direction from
//! block names.
//!
//! Assembly is one-shot and non-reentrant: there is no partial-assembly
//! rollback. A missing required block aborts with
//! [`Error::UnresolvedBlock`](crate::Error::UnresolvedBlock); a missing
//! optional converter is recorded and ignored — the only locally recovered
//! condition in the whole pipeline.

mod arena;
mod assemble;

pub use arena::{BlockArena, BlockEntry, BlockHandle, ChainRole};
pub use assemble::{AssembledGraph, assemble};
