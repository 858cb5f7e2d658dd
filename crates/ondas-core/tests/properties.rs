//! Property-based tests for the scaling and CP arithmetic.

use ondas_core::{CpSchedule, TimingPlan, forward_scale_pattern, total_cp_overhead};
use proptest::prelude::*;

proptest! {
    /// For every power-of-two size, the pattern has one 2-bit field per
    /// stage pair, each field is a valid shift control, and at most one
    /// field requests scaling (exactly one when log2 is odd).
    #[test]
    fn scale_pattern_shape(log2 in 2u32..=16) {
        let fft_size = 1usize << log2;
        let pattern = forward_scale_pattern(fft_size).unwrap().bits();

        let num_fields = (log2 + 1) / 2;
        prop_assert_eq!(pattern >> (2 * num_fields), 0, "no bits above the top field");

        let mut scale_fields = 0;
        for field_idx in 0..num_fields {
            let field = (pattern >> (2 * field_idx)) & 0b11;
            prop_assert!(field == 0b10 || field == 0b01, "field {} is {:#b}", field_idx, field);
            if field == 0b01 {
                scale_fields += 1;
            }
        }
        let expected = u32::from(log2 % 2 == 1);
        prop_assert_eq!(scale_fields, expected);
    }

    /// The pattern is a pure function of the size.
    #[test]
    fn scale_pattern_is_deterministic(log2 in 2u32..=16) {
        let fft_size = 1usize << log2;
        prop_assert_eq!(
            forward_scale_pattern(fft_size).unwrap(),
            forward_scale_pattern(fft_size).unwrap()
        );
    }

    /// CP overhead equals the naive cyclic sum.
    #[test]
    fn cp_overhead_matches_naive_sum(
        lengths in prop::collection::vec(0u32..512, 0..8),
        num_symbols in 0usize..40,
    ) {
        let schedule = CpSchedule::new(lengths.clone());
        let naive: usize = (0..num_symbols)
            .map(|k| if lengths.is_empty() { 0 } else { lengths[k % lengths.len()] as usize })
            .sum();
        prop_assert_eq!(total_cp_overhead(&schedule, num_symbols), naive);
    }

    /// A capture window is always payload plus prefix overhead.
    #[test]
    fn capture_window_covers_payload_and_prefix(
        log2 in 2u32..=12,
        num_symbols in 1usize..20,
        lengths in prop::collection::vec(0u32..128, 0..4),
    ) {
        let fft_size = 1usize << log2;
        let schedule = CpSchedule::new(lengths);
        let plan = TimingPlan::new(0.5, 1e-6, fft_size, num_symbols, &schedule);
        prop_assert_eq!(
            plan.capture_samples,
            num_symbols * fft_size + total_cp_overhead(&schedule, num_symbols)
        );
        prop_assert!(plan.receive_time > plan.transmit_time);
    }
}
