//! Per-block-kind configuration routines.
//!
//! These depend only on the capability traits from `ondas-fabric` plus the
//! chain role assigned at assembly time — never on concrete block identity.
//! Settings are validated against each block's reported capabilities before
//! any register is written, so a bad FFT size or an over-long CP schedule is
//! rejected host-side.
//!
//! Reconfiguration is only safe between transmit/receive cycles: the CP
//! queue clears are race-free only when no symbol is in flight, and the
//! caller is responsible for that serialization.

use ondas_fabric::{FftDirection, OfdmBlock, RadioBlock};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::ChainRole;
use crate::scaling::{CpSchedule, forward_scale_pattern, inverse_scale_pattern};

/// Largest samples-per-packet that still fits the device's 8 KB packet
/// limit once headers are accounted for.
const MAX_SPP: usize = 1996;

/// Chooses a samples-per-packet value that evenly divides the FFT size and
/// respects the packet size limit.
pub fn samples_per_packet(fft_size: usize) -> usize {
    let mut spp = fft_size;
    while spp > MAX_SPP {
        spp /= 2;
    }
    spp
}

/// Configures one radio block for the loopback run.
///
/// For every radio channel: programs the digital-loopback flag and the RX
/// packet size. Analog gains are applied only when loopback is disabled —
/// the internal loopback path bypasses the analog front end, so gains are
/// meaningless there and are skipped. Safe to call repeatedly with the same
/// arguments.
pub fn configure_radio(
    radio: &dyn RadioBlock,
    spp: usize,
    tx_gain: Option<f64>,
    rx_gain: Option<f64>,
    loopback: bool,
) -> Result<()> {
    for chan in 0..radio.num_channels() {
        radio.set_loopback(chan, loopback)?;
        radio.set_samples_per_packet(chan, spp)?;
        if !loopback {
            if let Some(gain) = tx_gain {
                radio.set_tx_gain(chan, gain)?;
            }
            if let Some(gain) = rx_gain {
                radio.set_rx_gain(chan, gain)?;
            }
        }
    }
    Ok(())
}

/// Configures one OFDM block according to its chain role.
///
/// Clears both CP queues, then programs FFT size, transform direction,
/// scaling, and the CP schedule: transmit-side blocks run the reverse
/// transform at unit scale and insert the prefix, receive-side blocks run
/// the forward transform with the default 1/N scaling and remove it.
pub fn configure_ofdm(
    ofdm: &dyn OfdmBlock,
    role: ChainRole,
    fft_size: usize,
    cp_schedule: &CpSchedule,
) -> Result<()> {
    let caps = ofdm.capabilities();
    if fft_size > caps.max_fft_size {
        return Err(Error::invalid_parameter(
            "fft_size",
            format!("{fft_size} exceeds block maximum {}", caps.max_fft_size),
        ));
    }
    let queue_capacity = match role {
        ChainRole::Transmit => caps.max_cp_ins_list_length,
        ChainRole::Receive => caps.max_cp_rem_list_length,
    };
    if cp_schedule.len() > queue_capacity {
        return Err(Error::invalid_parameter(
            "cp_schedule",
            format!(
                "{} entries exceed the block's queue capacity {queue_capacity}",
                cp_schedule.len()
            ),
        ));
    }
    if let Some(&too_long) = cp_schedule
        .lengths()
        .iter()
        .find(|&&len| len as usize > caps.max_cp_length)
    {
        return Err(Error::invalid_parameter(
            "cp_schedule",
            format!("length {too_long} exceeds block maximum {}", caps.max_cp_length),
        ));
    }

    // Residual queue state from a previous run must not leak into this one.
    ofdm.clear_cp_insertion()?;
    ofdm.clear_cp_removal()?;

    ofdm.set_fft_size(fft_size)?;

    match role {
        ChainRole::Transmit => {
            debug!(fft_size, "configuring modulator: reverse transform, unit scale");
            ofdm.set_fft_direction(FftDirection::Reverse)?;
            ofdm.set_fft_scaling(inverse_scale_pattern().bits())?;
            if !cp_schedule.is_empty() {
                ofdm.load_cp_insertion(cp_schedule.lengths())?;
            }
        }
        ChainRole::Receive => {
            let pattern = forward_scale_pattern(fft_size)?;
            debug!(
                fft_size,
                scaling = pattern.bits(),
                "configuring demodulator: forward transform, 1/N scale"
            );
            ofdm.set_fft_direction(FftDirection::Forward)?;
            ofdm.set_fft_scaling(pattern.bits())?;
            if !cp_schedule.is_empty() {
                ofdm.load_cp_removal(cp_schedule.lengths())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondas_fabric::mock::MockFabric;
    use ondas_fabric::OfdmCapabilities;

    #[test]
    fn spp_divides_fft_size_below_the_packet_limit() {
        assert_eq!(samples_per_packet(4096), 1024);
        assert_eq!(samples_per_packet(2048), 1024);
        assert_eq!(samples_per_packet(1024), 1024);
        assert_eq!(samples_per_packet(64), 64);
    }

    #[test]
    fn radio_in_loopback_skips_gains() {
        let mut fabric = MockFabric::new(125.0e6);
        let radio = fabric.add_radio("0/Radio#0", 2);

        configure_radio(radio.as_ref(), 1024, Some(15.0), Some(50.0), true).unwrap();
        for chan in 0..2 {
            assert!(radio.loopback_enabled(chan));
            assert_eq!(radio.samples_per_packet(chan), Some(1024));
            assert_eq!(radio.tx_gain(chan), None);
            assert_eq!(radio.rx_gain(chan), None);
        }
    }

    #[test]
    fn radio_without_loopback_applies_gains() {
        let mut fabric = MockFabric::new(125.0e6);
        let radio = fabric.add_radio("0/Radio#0", 2);

        configure_radio(radio.as_ref(), 512, Some(15.0), None, false).unwrap();
        assert!(!radio.loopback_enabled(0));
        assert_eq!(radio.tx_gain(1), Some(15.0));
        assert_eq!(radio.rx_gain(1), None);
    }

    #[test]
    fn modulator_gets_reverse_transform_and_insertion_schedule() {
        let mut fabric = MockFabric::new(125.0e6);
        let ofdm = fabric.add_ofdm("0/OFDM#0");
        let cp = CpSchedule::new(vec![352, 288]);

        configure_ofdm(ofdm.as_ref(), ChainRole::Transmit, 4096, &cp).unwrap();
        assert_eq!(ofdm.fft_size(), Some(4096));
        assert_eq!(ofdm.direction(), Some(FftDirection::Reverse));
        assert_eq!(ofdm.scaling(), Some(0));
        assert_eq!(ofdm.cp_insertion(), vec![352, 288]);
        assert!(ofdm.cp_removal().is_empty());
        assert_eq!(ofdm.insertion_clears(), 1);
        assert_eq!(ofdm.removal_clears(), 1);
    }

    #[test]
    fn demodulator_gets_forward_transform_and_removal_schedule() {
        let mut fabric = MockFabric::new(125.0e6);
        let ofdm = fabric.add_ofdm("0/OFDM#1");
        let cp = CpSchedule::new(vec![16]);

        configure_ofdm(ofdm.as_ref(), ChainRole::Receive, 2048, &cp).unwrap();
        assert_eq!(ofdm.direction(), Some(FftDirection::Forward));
        assert_eq!(ofdm.scaling(), Some(0b011010101010));
        assert_eq!(ofdm.cp_removal(), vec![16]);
        assert!(ofdm.cp_insertion().is_empty());
    }

    #[test]
    fn empty_schedule_loads_no_queue() {
        let mut fabric = MockFabric::new(125.0e6);
        let ofdm = fabric.add_ofdm("0/OFDM#0");

        configure_ofdm(ofdm.as_ref(), ChainRole::Transmit, 64, &CpSchedule::default()).unwrap();
        assert!(ofdm.cp_insertion().is_empty());
        assert!(ofdm.cp_removal().is_empty());
    }

    #[test]
    fn settings_are_validated_against_capabilities() {
        let mut fabric = MockFabric::new(125.0e6);
        let ofdm = fabric.add_ofdm_with_caps(
            "0/OFDM#0",
            OfdmCapabilities {
                max_fft_size: 1024,
                max_cp_length: 64,
                max_cp_ins_list_length: 2,
                max_cp_rem_list_length: 2,
            },
        );

        let too_big = configure_ofdm(
            ofdm.as_ref(),
            ChainRole::Transmit,
            2048,
            &CpSchedule::default(),
        );
        assert!(matches!(too_big, Err(Error::InvalidParameter { .. })));

        let too_many = configure_ofdm(
            ofdm.as_ref(),
            ChainRole::Transmit,
            1024,
            &CpSchedule::new(vec![8, 8, 8]),
        );
        assert!(matches!(too_many, Err(Error::InvalidParameter { .. })));

        let too_long = configure_ofdm(
            ofdm.as_ref(),
            ChainRole::Receive,
            1024,
            &CpSchedule::new(vec![128]),
        );
        assert!(matches!(too_long, Err(Error::InvalidParameter { .. })));
    }
}
