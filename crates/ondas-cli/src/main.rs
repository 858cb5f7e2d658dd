//! ondas — OFDM loopback exerciser, run against the simulated fabric.
//!
//! Assembles the standard four-channel topology, configures every block,
//! drives one timed transmit/receive cycle, and reports per-symbol peaks
//! for the sent and captured data.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ondas_core::{
    ChannelTopology, LatencyTable, RunConfig, SymbolBuffer, TimingPlan, assemble, configure_ofdm,
    configure_radio, find_peaks, generate_symbols, peaks::DEFAULT_PEAK_RATIO, run_cycle,
    samples_per_packet,
};
use ondas_fabric::mock::MockFabric;
use ondas_fabric::{ConverterBlock, DeviceFabric, OfdmBlock, RadioBlock};

#[derive(Parser)]
#[command(name = "ondas")]
#[command(author, version, about = "OFDM loopback test over a simulated block fabric")]
struct Cli {
    /// Channels to use, comma separated
    #[arg(short, long, value_delimiter = ',', default_values_t = [0u32, 1])]
    channels: Vec<u32>,

    /// FFT size
    #[arg(short = 's', long, default_value_t = 4096)]
    fft_size: usize,

    /// Number of symbols to transmit/receive
    #[arg(short, long, default_value_t = 14)]
    num_symbols: usize,

    /// Amplitude of the tone
    #[arg(short = 'y', long, default_value_t = 0.5)]
    amplitude: f64,

    /// Cyclic prefix lengths, comma separated
    #[arg(short = 'p', long = "cp-list", value_delimiter = ',')]
    cp_list: Vec<u32>,

    /// Use internal digital loopback
    #[arg(short, long)]
    loopback: bool,

    /// Cycles to delay RX vs. TX, bypassing the latency table
    #[arg(short, long)]
    delay: Option<u64>,

    /// TX gain in dB
    #[arg(long, default_value_t = 15.0)]
    tx_gain: f64,

    /// RX gain in dB
    #[arg(long, default_value_t = 50.0)]
    rx_gain: f64,

    /// DUC/DDC rate in Hz (default: device master clock rate)
    #[arg(long)]
    rate: Option<f64>,

    /// Tick rate of the simulated device in Hz
    #[arg(long, default_value_t = 125.0e6)]
    tick_rate: f64,

    /// Load the run configuration from a TOML file instead of flags
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_run_config(self) -> anyhow::Result<RunConfig> {
        if let Some(path) = &self.config {
            return RunConfig::load(path).with_context(|| format!("loading {}", path.display()));
        }
        Ok(RunConfig {
            channels: self.channels,
            fft_size: self.fft_size,
            num_symbols: self.num_symbols,
            amplitude: self.amplitude,
            cp_schedule: self.cp_list,
            tx_gain: Some(self.tx_gain),
            rx_gain: Some(self.rx_gain),
            loopback: self.loopback,
            rate: self.rate,
            delay_override: self.delay,
        })
    }
}

/// Builds the simulated device: two radios, four OFDM blocks, and the
/// optional DUC/DDC pairs, with the pipeline latency the latency table
/// expects for this tick rate.
fn simulated_fabric(tick_rate: f64, delay_cycles: u64) -> MockFabric {
    let mut fabric = MockFabric::new(tick_rate).with_loopback_delay(delay_cycles);
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

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let tick_rate = cli.tick_rate;
    let config = cli.into_run_config()?;
    config.validate()?;

    let cp = config.cp();
    let table = LatencyTable::default();
    let delay = table.loopback_delay(tick_rate, config.loopback_mode(), config.delay_override)?;
    let delay_cycles = (delay * tick_rate).round() as u64;

    let mut fabric = simulated_fabric(tick_rate, delay_cycles);
    let mut tx = fabric.tx_stream(config.channels.len());
    let mut rx = fabric.rx_stream(config.channels.len());

    let topology = ChannelTopology::x4_default();
    let graph = assemble(
        &mut fabric,
        &topology,
        &config.channels,
        Some(&tx),
        Some(&rx),
    )?;
    fabric.commit()?;

    let spp = samples_per_packet(config.fft_size);
    info!(spp, "using samples per packet");

    for radio in graph.radios() {
        configure_radio(
            radio.as_ref(),
            spp,
            config.tx_gain,
            config.rx_gain,
            config.loopback,
        )?;
    }

    if let Some(rate) = config.rate {
        for duc in graph.up_converters() {
            for chan in 0..duc.num_channels() {
                let actual = duc.set_input_rate(chan, rate)?;
                info!(chan, rate, actual, "DUC input rate set");
            }
        }
        for ddc in graph.down_converters() {
            for chan in 0..ddc.num_channels() {
                let actual = ddc.set_output_rate(chan, rate)?;
                info!(chan, rate, actual, "DDC output rate set");
            }
        }
    }

    let ofdm_roles = graph.ofdm_roles()?;
    if let Some((ofdm, _)) = ofdm_roles.first() {
        let caps = ofdm.capabilities();
        info!(
            max_fft_size = caps.max_fft_size,
            max_cp_length = caps.max_cp_length,
            max_cp_ins_list_length = caps.max_cp_ins_list_length,
            max_cp_rem_list_length = caps.max_cp_rem_list_length,
            "OFDM block capabilities"
        );
    }
    for (ofdm, role) in &ofdm_roles {
        configure_ofdm(ofdm.as_ref(), *role, config.fft_size, &cp)?;
    }

    let sent = generate_symbols(
        &config.channels,
        config.num_symbols,
        config.fft_size,
        config.amplitude,
    );
    let data: Vec<Vec<u32>> = sent.iter().map(|buffer| buffer.words().to_vec()).collect();

    let radio = graph
        .radios()
        .into_iter()
        .next()
        .context("no radio in the assembled graph")?;
    let plan = TimingPlan::new(
        radio.time_now() + 1.0,
        delay,
        config.fft_size,
        config.num_symbols,
        &cp,
    );
    info!(
        tx_time = plan.transmit_time,
        rx_time = plan.receive_time,
        capture_samples = plan.capture_samples,
        "starting timed cycle"
    );

    let mut out = vec![Vec::new(); config.channels.len()];
    let received = run_cycle(plan, &mut tx, &mut rx, &data, &mut out)?;
    info!(received, "cycle complete");

    let captured: Vec<SymbolBuffer> = out
        .into_iter()
        .map(|words| SymbolBuffer::from_words(words, config.fft_size, config.num_symbols))
        .collect();

    for symbol_index in 0..config.num_symbols {
        let report = find_peaks(
            &sent,
            &captured,
            &config.channels,
            symbol_index,
            DEFAULT_PEAK_RATIO,
        )?;
        for peaks in &report.channels {
            println!(
                "chan {} symbol {symbol_index}: sent peaks {:?}, received peaks {:?}",
                peaks.channel, peaks.sent, peaks.received
            );
        }
    }

    Ok(())
}
