//! End-to-end loopback tests against the mock fabric.
//!
//! These drive the whole pipeline the way the CLI does — assemble the graph
//! from the standard topology, configure every block, run one timed cycle,
//! and analyze the capture — with the in-memory fabric standing in for the
//! device.

use ondas_core::{
    ChainRole, ChannelTopology, CpSchedule, Error, LatencyTable, LoopbackCycle, LoopbackMode,
    SymbolBuffer, TimingPlan, assemble, configure_ofdm, configure_radio, find_peaks,
    generate_symbols, run_cycle, samples_per_packet,
};
use ondas_fabric::mock::MockFabric;
use ondas_fabric::{DeviceFabric, RadioBlock};

const TICK_RATE: f64 = 125.0e6;

/// Builds a mock fabric with the full two-radio block set.
fn x4_fabric() -> MockFabric {
    let mut fabric = MockFabric::new(TICK_RATE);
    fabric.add_radio("0/Radio#0", 2);
    fabric.add_radio("0/Radio#1", 2);
    for idx in 0..4 {
        fabric.add_ofdm(format!("0/OFDM#{idx}"));
    }
    for idx in 0..2 {
        fabric.add_up_converter(format!("0/DUC#{idx}"), 2);
        fabric.add_down_converter(format!("0/DDC#{idx}"), 2);
    }
    fabric
}

/// Builds the same fabric without the optional converter stages.
fn converterless_fabric() -> MockFabric {
    let mut fabric = MockFabric::new(TICK_RATE);
    fabric.add_radio("0/Radio#0", 2);
    fabric.add_radio("0/Radio#1", 2);
    for idx in 0..4 {
        fabric.add_ofdm(format!("0/OFDM#{idx}"));
    }
    fabric
}

#[test]
fn assembly_groups_blocks_by_capability_and_role() {
    let mut fabric = x4_fabric();
    let topology = ChannelTopology::x4_default();

    let graph = assemble(&mut fabric, &topology, &[0, 1], None, None).unwrap();
    assert_eq!(graph.radios().len(), 1);
    assert_eq!(graph.modulators().len(), 1);
    assert_eq!(graph.demodulators().len(), 1);
    assert_eq!(graph.up_converters().len(), 1);
    assert_eq!(graph.down_converters().len(), 1);

    let roles = graph.ofdm_roles().unwrap();
    assert_eq!(roles.len(), 2);
    assert!(roles.iter().any(|(_, role)| *role == ChainRole::Transmit));
    assert!(roles.iter().any(|(_, role)| *role == ChainRole::Receive));
}

#[test]
fn all_four_channels_resolve_both_radios() {
    let mut fabric = x4_fabric();
    let topology = ChannelTopology::x4_default();

    let graph = assemble(&mut fabric, &topology, &[0, 1, 2, 3], None, None).unwrap();
    assert_eq!(graph.radios().len(), 2);
    assert_eq!(graph.modulators().len(), 2);
    assert_eq!(graph.demodulators().len(), 2);
}

#[test]
fn wiring_order_is_deterministic_and_endpoint_bracketed() {
    let mut fabric = x4_fabric();
    let topology = ChannelTopology::x4_default();
    let tx = fabric.tx_stream(2);
    let rx = fabric.rx_stream(2);

    assemble(&mut fabric, &topology, &[0, 1], Some(&tx), Some(&rx)).unwrap();
    let expected = [
        "tx-endpoint:0 -> 0/OFDM#0:0",
        "0/OFDM#0:0 -> 0/Radio#0:0",
        "0/Radio#0:0 -> 0/OFDM#1:0",
        "0/OFDM#1:0 -> rx-endpoint:0",
        "tx-endpoint:1 -> 0/OFDM#0:1",
        "0/OFDM#0:1 -> 0/Radio#0:1",
        "0/Radio#0:1 -> 0/OFDM#1:1",
        "0/OFDM#1:1 -> rx-endpoint:1",
    ];
    assert_eq!(fabric.connections(), &expected);
}

#[test]
fn missing_optional_converters_do_not_abort_assembly() {
    let mut fabric = converterless_fabric();
    let topology = ChannelTopology::x4_default();

    let graph = assemble(&mut fabric, &topology, &[0, 1], None, None).unwrap();
    assert!(graph.up_converters().is_empty());
    assert!(graph.down_converters().is_empty());
    assert_eq!(graph.modulators().len(), 1);
}

#[test]
fn missing_required_block_aborts_assembly() {
    let mut fabric = MockFabric::new(TICK_RATE);
    // Radios only — the required OFDM blocks are absent.
    fabric.add_radio("0/Radio#0", 2);
    let topology = ChannelTopology::x4_default();

    let err = assemble(&mut fabric, &topology, &[0], None, None).unwrap_err();
    assert!(matches!(err, Error::UnresolvedBlock(id) if id.as_str() == "0/OFDM#0"));
}

#[test]
fn unknown_channel_is_rejected() {
    let mut fabric = x4_fabric();
    let topology = ChannelTopology::x4_default();
    let err = assemble(&mut fabric, &topology, &[7], None, None).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { param: "channels", .. }));
}

#[test]
fn full_loopback_cycle_round_trips_the_symbols() {
    let channels = [0u32, 1];
    let fft_size = 64;
    let num_symbols = 3;
    let cp = CpSchedule::new(vec![4, 2]);

    let mut fabric = x4_fabric();
    let topology = ChannelTopology::x4_default();
    let mut tx = fabric.tx_stream(channels.len());
    let mut rx = fabric.rx_stream(channels.len());

    let graph = assemble(&mut fabric, &topology, &channels, Some(&tx), Some(&rx)).unwrap();
    fabric.commit().unwrap();
    assert!(fabric.is_committed());

    let spp = samples_per_packet(fft_size);
    for radio in graph.radios() {
        configure_radio(radio.as_ref(), spp, Some(15.0), Some(50.0), true).unwrap();
    }
    for (ofdm, role) in graph.ofdm_roles().unwrap() {
        configure_ofdm(ofdm.as_ref(), role, fft_size, &cp).unwrap();
    }

    let sent = generate_symbols(&channels, num_symbols, fft_size, 0.5);
    let data: Vec<Vec<u32>> = sent.iter().map(|buffer| buffer.words().to_vec()).collect();

    let radio = graph.radios().remove(0);
    let delay = LatencyTable::default()
        .loopback_delay(radio.tick_rate(), LoopbackMode::Internal, None)
        .unwrap();
    let plan = TimingPlan::new(radio.time_now() + 1.0, delay, fft_size, num_symbols, &cp);
    assert_eq!(plan.capture_samples, num_symbols * fft_size + 4 + 2 + 4);

    let mut out = vec![Vec::new(); channels.len()];
    let received = run_cycle(plan, &mut tx, &mut rx, &data, &mut out).unwrap();
    assert_eq!(received, plan.capture_samples);

    let captured: Vec<SymbolBuffer> = out
        .into_iter()
        .map(|words| SymbolBuffer::from_words(words, fft_size, num_symbols))
        .collect();

    // An aligned capture returns every transmitted tone at its offset:
    // exactly one peak per channel per symbol, identical in and out.
    for symbol_index in 0..num_symbols {
        let report = find_peaks(&sent, &captured, &channels, symbol_index, 0.5).unwrap();
        for peaks in &report.channels {
            assert_eq!(peaks.sent.len(), 1, "symbol {symbol_index}");
            assert_eq!(peaks.sent, peaks.received, "symbol {symbol_index}");
        }
    }
}

#[test]
fn wrong_delay_misaligns_the_capture() {
    let channels = [0u32];
    let fft_size = 16;
    let num_symbols = 1;

    let fabric = x4_fabric();
    let mut tx = fabric.tx_stream(1);
    let mut rx = fabric.rx_stream(1);

    let sent = generate_symbols(&channels, num_symbols, fft_size, 1.0);
    let data = vec![sent[0].words().to_vec()];

    // Deliberately arm one tick late.
    let plan = TimingPlan::new(1.0, 3.0 / TICK_RATE, fft_size, num_symbols, &CpSchedule::default());
    let mut out = vec![Vec::new()];
    run_cycle(plan, &mut tx, &mut rx, &data, &mut out).unwrap();

    let captured = vec![SymbolBuffer::from_words(out.remove(0), fft_size, num_symbols)];
    let report = find_peaks(&sent, &captured, &channels, 0, 0.5).unwrap();
    // The tone still arrives, shifted one bin early in the window.
    assert_eq!(report.channels[0].sent, vec![4]);
    assert_eq!(report.channels[0].received, vec![3]);
}

#[test]
fn stepwise_cycle_reports_states() {
    let fabric = x4_fabric();
    let mut tx = fabric.tx_stream(1);
    let mut rx = fabric.rx_stream(1);

    let plan = TimingPlan::new(
        1.0,
        2.0 / TICK_RATE,
        8,
        2,
        &CpSchedule::new(vec![2, 1]),
    );
    assert_eq!(plan.capture_samples, 19);

    let mut cycle = LoopbackCycle::new(plan);
    cycle.arm(&mut rx).unwrap();
    cycle.transmit(&mut tx, &[vec![0u32; 16]]).unwrap();
    let mut out = vec![Vec::new()];
    cycle.finish(&mut rx, &mut out).unwrap();
    assert_eq!(out[0].len(), 19);
}
