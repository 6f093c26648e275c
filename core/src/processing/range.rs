//! Frequency-to-range transform.
//!
//! Each channel's sweep is tapered, inverse transformed to the requested
//! number of range cells and flipped so range increases with the cell index.

use std::time::Instant;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Ix2};
use num_complex::Complex64;

use crate::frtm::RadarCapture;
use crate::math::convert::Conversion;
use crate::math::fft::ifft_axis;
use crate::math::layout::{apply_window, flip_range_axis};
use crate::math::stats::StatsHelper;
use crate::math::window::{normalized_window, WindowKind};
use crate::plot::PlotFrame;
use crate::prelude::{
    FrtmError, FrtmResult, ProcessingStage, StageConfig, StageInput, StageMetadata, StageOutput,
};
use crate::processing::axis::range_axis;
use crate::processing::SampleArray;
use crate::telemetry::log::LogManager;

/// `(channels, bins)` samples of one pulse, channels in header order.
///
/// Without an index the middle pulse `pulse_count / 2` is used.
pub fn get_pulse(capture: &RadarCapture, pulse_index: Option<usize>) -> FrtmResult<Array2<Complex64>> {
    let pulse_count = capture.pulse_count();
    let index = pulse_index.unwrap_or(pulse_count / 2);
    if index >= pulse_count {
        return Err(FrtmError::PulseOutOfRange { index, pulse_count });
    }
    let mut pulse = Array2::zeros((capture.channel_count(), capture.bin_count()));
    for (mut row, (_, samples)) in pulse.rows_mut().into_iter().zip(capture.all_data().iter()) {
        row.assign(&samples.row(index));
    }
    Ok(pulse)
}

/// Windowed inverse transform of every row of `pulse` to `output_size` cells,
/// before the range flip.
pub(crate) fn transform_range(
    pulse: ArrayView2<'_, Complex64>,
    window: WindowKind,
    output_size: usize,
) -> FrtmResult<Array2<Complex64>> {
    let taper = normalized_window(window, pulse.ncols())?;
    let mut tapered = pulse.to_owned();
    apply_window(&mut tapered, &taper, Axis(1));
    Ok(ifft_axis(tapered.view(), Axis(1), output_size))
}

/// [`transform_range`] followed by the range flip.
pub(crate) fn compress_range(
    pulse: ArrayView2<'_, Complex64>,
    window: WindowKind,
    output_size: usize,
) -> FrtmResult<Array2<Complex64>> {
    let profiles = transform_range(pulse, window, output_size)?;
    Ok(flip_range_axis(profiles.view(), Axis(1)))
}

/// Range profiles `(channels, output_size)` of one pulse.
///
/// `output_size` defaults to the capture's bin count. The capture's display
/// conversion, if any, is applied to the result.
pub fn frequency_to_range(
    capture: &RadarCapture,
    pulse_index: Option<usize>,
    window: WindowKind,
    output_size: Option<usize>,
) -> FrtmResult<SampleArray<Ix2>> {
    let pulse = get_pulse(capture, pulse_index)?;
    let size = output_size.unwrap_or(capture.bin_count());
    if size == 0 {
        return Err(FrtmError::InvalidInput("range output size must be positive".into()));
    }
    let profiles = compress_range(pulse.view(), window, size)?;
    Ok(SampleArray::with_conversion(profiles, capture.conversion()))
}

/// Range profile of a single sweep.
pub fn range_profile(
    samples: ArrayView1<'_, Complex64>,
    window: WindowKind,
    output_size: Option<usize>,
) -> FrtmResult<Array1<Complex64>> {
    let size = output_size.unwrap_or(samples.len());
    if samples.is_empty() || size == 0 {
        return Err(FrtmError::InvalidInput("empty sweep".into()));
    }
    let pulse = samples.insert_axis(Axis(0));
    let profile = compress_range(pulse, window, size)?;
    Ok(profile.row(0).to_owned())
}

struct RangeSettings {
    window: WindowKind,
    output_size: Option<usize>,
    channel: Option<String>,
    conversion: Option<Conversion>,
}

/// Range profiles of one pulse, one plotted trace per channel.
pub struct RangeStage {
    settings: Option<RangeSettings>,
    logger: LogManager,
}

impl RangeStage {
    pub fn new() -> Self {
        Self {
            settings: None,
            logger: LogManager::new("range"),
        }
    }
}

impl Default for RangeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for RangeStage {
    fn initialize(&mut self, config: &StageConfig) -> FrtmResult<()> {
        let conversion = config.conversion.as_deref().map(str::parse::<Conversion>).transpose()?;
        self.settings = Some(RangeSettings {
            window: config.window.parse::<WindowKind>()?,
            output_size: config.range_bins,
            channel: config.channel.clone(),
            conversion,
        });
        self.logger.detail(&format!(
            "window {}, range cells {:?}, channel {:?}",
            config.window, config.range_bins, config.channel
        ));
        Ok(())
    }

    fn execute(&mut self, input: &StageInput<'_>) -> FrtmResult<StageOutput> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| FrtmError::Internal("range stage not initialized".into()))?;
        let started = Instant::now();
        let capture = input.capture;

        let mut pulse = get_pulse(capture, input.pulse_index)?;
        let mut rows: Vec<f64> = (0..capture.channel_count()).map(|i| i as f64).collect();
        if let Some(name) = settings.channel.as_deref() {
            let index = capture
                .all_data()
                .position(name)
                .ok_or_else(|| FrtmError::UnknownChannel(name.to_string()))?;
            pulse = pulse.select(Axis(0), &[index]);
            rows = vec![index as f64];
        }

        let size = settings.output_size.unwrap_or(capture.bin_count());
        let profiles = compress_range(pulse.view(), settings.window, size)?;
        let conversion = settings
            .conversion
            .or(capture.conversion())
            .unwrap_or(Conversion::Db20);
        let display = conversion.apply_array(&profiles);

        let pulse_index = input.pulse_index.unwrap_or(capture.pulse_count() / 2);
        let peak = StatsHelper::peak(&display);
        self.logger.record(&format!(
            "pulse {pulse_index}: {} channel(s) x {size} cells, peak {:?} in {:?}",
            rows.len(),
            peak.map(|(cell, _)| cell),
            started.elapsed()
        ));

        let frame = PlotFrame::from_array(
            format!("range profile, pulse {pulse_index} ({conversion})"),
            &display,
            range_axis(capture, size),
            rows,
        );
        Ok(StageOutput {
            frame,
            metadata: StageMetadata {
                peak: peak.map(|(cell, _)| cell),
                peak_value: peak.map(|(_, value)| value),
                notes: vec![format!("window {}", settings.window)],
            },
        })
    }

    fn cleanup(&mut self) {
        self.settings = None;
    }
}
