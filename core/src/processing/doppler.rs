//! Range-Doppler map of one channel.

use std::time::Instant;

use ndarray::{Array2, Axis, Ix2};
use num_complex::Complex64;

use crate::frtm::RadarCapture;
use crate::math::convert::Conversion;
use crate::math::fft::ifft_axis;
use crate::math::layout::{apply_window, center_doppler_axis, flip_pulse_axis, flip_range_axis};
use crate::math::stats::StatsHelper;
use crate::math::window::{normalized_window, WindowKind};
use crate::plot::PlotFrame;
use crate::prelude::{
    FrtmError, FrtmResult, ProcessingStage, StageConfig, StageInput, StageMetadata, StageOutput,
};
use crate::processing::axis::{range_axis, velocity_axis};
use crate::processing::SampleArray;
use crate::telemetry::log::LogManager;

/// `(range_bins, doppler_bins)` map of `channel`.
///
/// Range increases down the rows; zero Doppler sits in column
/// `doppler_bins / 2`. Both sizes default to the capture's own dimensions.
/// The capture's display conversion, if any, is applied to the result.
pub fn range_doppler(
    capture: &RadarCapture,
    channel: &str,
    window: WindowKind,
    range_bins: Option<usize>,
    doppler_bins: Option<usize>,
) -> FrtmResult<SampleArray<Ix2>> {
    let samples = capture.channel_data(channel)?;
    let map = doppler_map(
        &flip_pulse_axis(samples, Axis(0)),
        window,
        range_bins.unwrap_or(capture.bin_count()),
        doppler_bins.unwrap_or(capture.pulse_count()),
    )?;
    Ok(SampleArray::with_conversion(map, capture.conversion()))
}

/// Slow-time then fast-time inverse transforms of `(pulses, bins)` samples
/// whose pulse axis has already been reversed.
fn doppler_map(
    samples: &Array2<Complex64>,
    window: WindowKind,
    range_bins: usize,
    doppler_bins: usize,
) -> FrtmResult<Array2<Complex64>> {
    if range_bins == 0 || doppler_bins == 0 {
        return Err(FrtmError::InvalidInput(format!(
            "range-Doppler map of {range_bins} x {doppler_bins} cells"
        )));
    }
    let (pulses, bins) = samples.dim();

    let mut tapered = samples.clone();
    apply_window(&mut tapered, &normalized_window(window, pulses)?, Axis(0));
    let mut spectrum = ifft_axis(tapered.view(), Axis(0), doppler_bins);

    apply_window(&mut spectrum, &normalized_window(window, bins)?, Axis(1));
    let map = ifft_axis(spectrum.view(), Axis(1), range_bins);

    let centered = center_doppler_axis(map.view(), Axis(0));
    Ok(flip_range_axis(centered.t(), Axis(0)))
}

struct DopplerSettings {
    window: WindowKind,
    range_bins: Option<usize>,
    doppler_bins: Option<usize>,
    channel: Option<String>,
    conversion: Option<Conversion>,
}

/// Range-Doppler image of one channel, the first one unless configured.
pub struct DopplerStage {
    settings: Option<DopplerSettings>,
    logger: LogManager,
}

impl DopplerStage {
    pub fn new() -> Self {
        Self {
            settings: None,
            logger: LogManager::new("doppler"),
        }
    }
}

impl Default for DopplerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for DopplerStage {
    fn initialize(&mut self, config: &StageConfig) -> FrtmResult<()> {
        let conversion = config
            .conversion
            .as_deref()
            .map(str::parse::<Conversion>)
            .transpose()?;
        self.settings = Some(DopplerSettings {
            window: config.window.parse::<WindowKind>()?,
            range_bins: config.range_bins,
            doppler_bins: config.doppler_bins,
            channel: config.channel.clone(),
            conversion,
        });
        self.logger.detail(&format!(
            "window {}, {:?} range x {:?} Doppler cells",
            config.window, config.range_bins, config.doppler_bins
        ));
        Ok(())
    }

    fn execute(&mut self, input: &StageInput<'_>) -> FrtmResult<StageOutput> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| FrtmError::Internal("doppler stage not initialized".into()))?;
        let started = Instant::now();
        let capture = input.capture;

        let channel = match settings.channel.clone() {
            Some(name) => name,
            None => capture
                .channel_ids()
                .next()
                .map(|id| id.name())
                .ok_or_else(|| FrtmError::InvalidInput("capture has no channels".into()))?,
        };
        let samples = capture.channel_data(&channel)?;
        let range_bins = settings.range_bins.unwrap_or(capture.bin_count());
        let doppler_bins = settings.doppler_bins.unwrap_or(capture.pulse_count());
        let map = doppler_map(
            &flip_pulse_axis(samples, Axis(0)),
            settings.window,
            range_bins,
            doppler_bins,
        )?;

        let conversion = settings
            .conversion
            .or(capture.conversion())
            .unwrap_or(Conversion::Db20);
        let display = conversion.apply_array(&map);
        let peak = StatsHelper::peak(&display);
        self.logger.record(&format!(
            "{channel}: {range_bins} x {doppler_bins} cells, peak {:?}, rms {:.3} in {:?}",
            peak.map(|(cell, _)| cell),
            StatsHelper::rms(&display),
            started.elapsed()
        ));

        let frame = PlotFrame::from_array(
            format!("range-Doppler {channel} ({conversion})"),
            &display,
            velocity_axis(capture, doppler_bins),
            range_axis(capture, range_bins),
        );
        Ok(StageOutput {
            frame,
            metadata: StageMetadata {
                peak: peak.map(|(cell, _)| cell),
                peak_value: peak.map(|(_, value)| value),
                notes: vec![format!("channel {channel}"), format!("window {}", settings.window)],
            },
        })
    }

    fn cleanup(&mut self) {
        self.settings = None;
    }
}
