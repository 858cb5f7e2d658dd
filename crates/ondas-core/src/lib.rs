//! Core of the ondas OFDM loopback exerciser.
//!
//! One run pushes generated OFDM symbols through a chain of hardware
//! processing blocks and compares what comes back:
//!
//! ```text
//!     Host TX endpoint ─> Modulator ─> DUC ─> Radio TX ─>──┐
//!                                                          │
//!     ┌──────────< RF / digital loopback <─────────────────┘
//!     │
//!     └─> Radio RX ─> DDC ─> Demodulator ─> Host RX endpoint
//! ```
//!
//! The pieces, leaf first:
//!
//! - [`scaling`] — FFT scale-register patterns and CP arithmetic (pure math)
//! - [`topology`] — declarative per-channel connection tables
//! - [`graph`] — the assembler: lazy block arena, deterministic wiring,
//!   assembly-time role tagging
//! - [`blocks`] — per-block-kind configuration (radio, modulator,
//!   demodulator) validated against block capabilities
//! - [`timing`] — timing plans and the overridable pipeline-latency table
//! - [`engine`] — the timed TX/RX cycle as an explicit state machine
//! - [`symbols`] / [`peaks`] — test-symbol generation and thresholded peak
//!   analysis of the capture
//! - [`config`] — the run parameter record
//!
//! Everything talks to hardware through the trait seams in `ondas-fabric`,
//! so the whole pipeline runs unchanged against the in-memory mock fabric.
//!
//! # Concurrency
//!
//! A single logical thread drives one cycle at a time. The armed capture
//! and the transmit burst are independent asynchronous device operations
//! ordered only by their timestamps; the host merely guarantees the capture
//! is armed first. Configuration must never overlap an active cycle — the
//! caller serializes those phases.

pub mod blocks;
pub mod config;
pub mod engine;
pub mod graph;
pub mod peaks;
pub mod scaling;
pub mod symbols;
pub mod timing;
pub mod topology;

mod error;

pub use blocks::{configure_ofdm, configure_radio, samples_per_packet};
pub use config::{ConfigError, RunConfig};
pub use engine::{CycleState, LoopbackCycle, run_cycle};
pub use error::{Error, Result};
pub use graph::{AssembledGraph, BlockArena, ChainRole, assemble};
pub use peaks::{ChannelPeaks, PeakReport, find_peaks};
pub use scaling::{
    CpSchedule, ScalePattern, forward_scale_pattern, inverse_scale_pattern, total_cp_overhead,
};
pub use symbols::{SymbolBuffer, generate_symbols};
pub use timing::{LatencyEntry, LatencyTable, LoopbackMode, TimingPlan};
pub use topology::{ChannelPlan, ChannelTopology, Direction, Hop};
