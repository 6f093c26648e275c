//! Synthetic captures shared by the transform tests.

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;

use crate::frtm::{AxisSpec, CaptureLayout, FrtmWriter, RadarCapture};

pub(crate) fn build_capture(layout: CaptureLayout, channels: &[Array2<Complex64>]) -> RadarCapture {
    let bytes = FrtmWriter::new(layout).encode(channels).unwrap();
    RadarCapture::from_bytes(&bytes).unwrap()
}

/// One transmitter `Tx` and receivers `Rx1..RxN`, one channel per receiver.
pub(crate) fn array_layout(receivers: usize, pulses: usize, bins: usize) -> CaptureLayout {
    let mut antenna_names = vec!["Tx".to_string()];
    antenna_names.extend((1..=receivers).map(|i| format!("Rx{i}")));
    CaptureLayout {
        antenna_names,
        coupling_combos: (1..=receivers).map(|rx| (rx, 0)).collect(),
        time_steps: AxisSpec::new(0.0, 1e-4 * (pulses.max(2) - 1) as f64, pulses),
        freq_sweep: AxisSpec::new(76.0e9, 77.0e9, bins),
        ..CaptureLayout::default()
    }
}

/// Unit point target: `range_cycles` phase turns across the sweep,
/// `doppler_cycles` turns across the pulses, plus a fixed channel phase.
///
/// The range transform puts it in range cell `range_cycles - 1`; the
/// range-Doppler map puts it in column `pulses / 2 + doppler_cycles`.
pub(crate) fn point_target(
    pulses: usize,
    bins: usize,
    range_cycles: usize,
    doppler_cycles: isize,
    channel_phase: f64,
) -> Array2<Complex64> {
    Array2::from_shape_fn((pulses, bins), |(p, k)| {
        let range_phase = 2.0 * PI * (k * range_cycles) as f64 / bins as f64;
        let doppler_phase = 2.0 * PI * (doppler_cycles * p as isize) as f64 / pulses as f64;
        Complex64::from_polar(1.0, range_phase + doppler_phase + channel_phase)
    })
}
