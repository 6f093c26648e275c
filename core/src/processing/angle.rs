//! Range-angle maps from one pulse of a multi-channel capture.

use std::time::Instant;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::frtm::RadarCapture;
use crate::math::convert::Conversion;
use crate::math::layout::angle_major_map;
use crate::math::stats::StatsHelper;
use crate::math::window::WindowKind;
use crate::plot::PlotFrame;
use crate::prelude::{
    FrtmError, FrtmResult, ProcessingStage, StageConfig, StageInput, StageMetadata, StageOutput,
};
use crate::processing::axis::{angle_axis, range_axis};
use crate::processing::doa::{steering_vectors, DoaEstimator, DoaMethod};
use crate::processing::range::{get_pulse, transform_range};
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeAngleOptions {
    pub range_bins: Option<usize>,
    pub cross_range_bins: usize,
    pub doa_method: DoaMethod,
    /// Scanned azimuth interval in degrees.
    pub field_of_view: [f64; 2],
    pub snapshot_span: usize,
    pub diagonal_loading: f64,
    pub source_count: usize,
}

impl Default for RangeAngleOptions {
    fn default() -> Self {
        Self {
            range_bins: None,
            cross_range_bins: 181,
            doa_method: DoaMethod::Bartlett,
            field_of_view: [-90.0, 90.0],
            snapshot_span: 2,
            diagonal_loading: 1e-3,
            source_count: 1,
        }
    }
}

impl RangeAngleOptions {
    fn estimator(&self) -> DoaEstimator {
        DoaEstimator {
            method: self.doa_method,
            snapshot_span: self.snapshot_span,
            diagonal_loading: self.diagonal_loading,
            source_count: self.source_count,
        }
    }
}

/// Linear power `(cross_range_bins, range_bins)` of one pulse.
///
/// Rows follow [`angle_axis`]`(field_of_view, cross_range_bins)`; columns
/// run from near to far range as in the other transforms. The array
/// geometry is the capture's receiver positions.
pub fn range_angle_map(
    capture: &RadarCapture,
    pulse_index: Option<usize>,
    window: WindowKind,
    options: &RangeAngleOptions,
) -> FrtmResult<Array2<f64>> {
    if options.cross_range_bins == 0 {
        return Err(FrtmError::InvalidInput("cross-range bin count must be positive".into()));
    }
    let pulse = get_pulse(capture, pulse_index)?;
    let range_bins = options.range_bins.unwrap_or(capture.bin_count());
    if range_bins == 0 {
        return Err(FrtmError::InvalidInput("range output size must be positive".into()));
    }
    let profiles = transform_range(pulse.view(), window, range_bins)?;

    let angles = angle_axis(options.field_of_view, options.cross_range_bins);
    let steering = steering_vectors(
        capture.receiver_positions(),
        capture.center_frequency(),
        &angles,
    );
    let spectrum = options.estimator().spectrum(profiles.view(), &steering)?;
    Ok(angle_major_map(spectrum.view()))
}

struct AngleSettings {
    window: WindowKind,
    options: RangeAngleOptions,
    conversion: Option<Conversion>,
}

/// Range-angle image, in dB of power unless another conversion is set.
pub struct AngleStage {
    settings: Option<AngleSettings>,
    logger: LogManager,
}

impl AngleStage {
    pub fn new() -> Self {
        Self {
            settings: None,
            logger: LogManager::new("angle"),
        }
    }
}

impl Default for AngleStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for AngleStage {
    fn initialize(&mut self, config: &StageConfig) -> FrtmResult<()> {
        if let Some(channel) = &config.channel {
            return Err(FrtmError::InvalidInput(format!(
                "range-angle maps use every channel; cannot restrict to {channel:?}"
            )));
        }
        let conversion = config
            .conversion
            .as_deref()
            .map(str::parse::<Conversion>)
            .transpose()?;
        let options = RangeAngleOptions {
            range_bins: config.range_bins,
            cross_range_bins: config.cross_range_bins,
            doa_method: config.doa_method.parse::<DoaMethod>()?,
            field_of_view: config.field_of_view,
            ..RangeAngleOptions::default()
        };
        self.settings = Some(AngleSettings {
            window: config.window.parse::<WindowKind>()?,
            options,
            conversion,
        });
        self.logger.detail(&format!(
            "{} over {:?} with {} angles, span {}",
            options.doa_method,
            options.field_of_view,
            options.cross_range_bins,
            options.snapshot_span
        ));
        Ok(())
    }

    fn execute(&mut self, input: &StageInput<'_>) -> FrtmResult<StageOutput> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| FrtmError::Internal("angle stage not initialized".into()))?;
        let started = Instant::now();
        let capture = input.capture;
        let options = &settings.options;

        let power = range_angle_map(capture, input.pulse_index, settings.window, options)?;
        // Power is real; Db10 of it matches Db20 of the underlying amplitude.
        let conversion = settings
            .conversion
            .or(capture.conversion())
            .unwrap_or(Conversion::Db10);
        let display = power.mapv(|value| conversion.apply(Complex64::new(value, 0.0)));
        let peak = StatsHelper::peak(&display);

        let pulse_index = input.pulse_index.unwrap_or(capture.pulse_count() / 2);
        let (angle_bins, range_bins) = power.dim();
        self.logger.record(&format!(
            "pulse {pulse_index}: {} over {angle_bins} x {range_bins} cells, peak {:?} in {:?}",
            options.doa_method,
            peak.map(|(cell, _)| cell),
            started.elapsed()
        ));

        let frame = PlotFrame::from_array(
            format!("range-angle {}, pulse {pulse_index} ({conversion})", options.doa_method),
            &display,
            range_axis(capture, range_bins),
            angle_axis(options.field_of_view, angle_bins),
        );
        Ok(StageOutput {
            frame,
            metadata: StageMetadata {
                peak: peak.map(|(cell, _)| cell),
                peak_value: peak.map(|(_, value)| value),
                notes: vec![format!("{} channels", capture.channel_count())],
            },
        })
    }

    fn cleanup(&mut self) {
        self.settings = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frtm::SPEED_OF_LIGHT;
    use crate::processing::fixtures::{array_layout, build_capture, point_target};
    use std::f64::consts::PI;

    const ELEMENTS: usize = 8;

    /// Receivers at half-wavelength spacing along y, one target at 20
    /// degrees in range cell 6.
    fn array_capture(elements: usize) -> RadarCapture {
        let layout = array_layout(elements, 4, 64);
        let channels: Vec<_> = (0..elements)
            .map(|i| {
                let phase = PI * i as f64 * 20.0_f64.to_radians().sin();
                point_target(4, 64, 7, 0, phase)
            })
            .collect();
        let mut capture = build_capture(layout, &channels);
        let spacing = SPEED_OF_LIGHT / capture.center_frequency() / 2.0;
        for i in 0..elements {
            capture
                .set_receiver_position(&format!("Rx{}:Tx", i + 1), [0.0, i as f64 * spacing])
                .unwrap();
        }
        capture
    }

    fn best_angle_index(power: &Array2<f64>, range_cell: usize) -> usize {
        power
            .column(range_cell)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap()
    }

    #[test]
    fn bartlett_peaks_at_target_range_and_angle() {
        let capture = array_capture(ELEMENTS);
        let power =
            range_angle_map(&capture, None, WindowKind::Flat, &RangeAngleOptions::default()).unwrap();
        assert_eq!(power.dim(), (181, 64));
        assert_eq!(best_angle_index(&power, 6), 110);
        let strongest_cell = (0..64)
            .max_by(|&a, &b| power[[110, a]].total_cmp(&power[[110, b]]))
            .unwrap();
        assert!((4..=8).contains(&strongest_cell));
    }

    #[test]
    fn target_row_is_angle_and_column_is_range() {
        let capture = array_capture(ELEMENTS);
        let power =
            range_angle_map(&capture, None, WindowKind::Flat, &RangeAngleOptions::default()).unwrap();
        // 20 degrees is row 110 of 181; -20 degrees is row 70.
        assert!(power[[110, 6]] > 10.0 * power[[70, 6]]);
        // Range cell 6 counted from the near end, not from the far end.
        assert!(power[[110, 6]] > 10.0 * power[[110, 57]]);
        let ((row, column), _) = StatsHelper::peak(&power).unwrap();
        assert_eq!(row, 110);
        assert!((5..=7).contains(&column));
    }

    #[test]
    fn adaptive_methods_find_the_same_angle() {
        let capture = array_capture(ELEMENTS);
        for method in [DoaMethod::Capon, DoaMethod::Music] {
            let options = RangeAngleOptions {
                doa_method: method,
                ..RangeAngleOptions::default()
            };
            let power = range_angle_map(&capture, Some(1), WindowKind::Flat, &options).unwrap();
            assert_eq!(best_angle_index(&power, 6), 110, "{method}");
        }
    }

    #[test]
    fn music_rejects_a_single_channel() {
        let capture = array_capture(1);
        let options = RangeAngleOptions {
            doa_method: DoaMethod::Music,
            ..RangeAngleOptions::default()
        };
        assert!(matches!(
            range_angle_map(&capture, None, WindowKind::Flat, &options),
            Err(FrtmError::InvalidInput(_))
        ));
    }

    #[test]
    fn stage_rejects_unknown_method() {
        let mut stage = AngleStage::new();
        let config = StageConfig {
            doa_method: "Unknown".into(),
            ..StageConfig::default()
        };
        assert!(matches!(
            stage.initialize(&config),
            Err(FrtmError::UnknownDoaMethod(_))
        ));
    }

    #[test]
    fn stage_frame_uses_angle_and_range_axes() {
        let capture = array_capture(ELEMENTS);
        let mut stage = AngleStage::new();
        let config = StageConfig {
            cross_range_bins: 61,
            field_of_view: [-30.0, 30.0],
            ..StageConfig::default()
        };
        stage.initialize(&config).unwrap();
        let output = stage
            .execute(&StageInput {
                capture: &capture,
                pulse_index: None,
            })
            .unwrap();
        assert_eq!(output.frame.shape(), (61, 64));
        assert_eq!(output.frame.y_axis[50], 20.0);
        assert_eq!(output.frame.x_axis.len(), 64);
        assert_eq!(output.metadata.peak.map(|(row, _)| row), Some(50));
        assert!(output.frame.label.contains("dB10"));
    }

    #[test]
    fn stage_honors_conversion() {
        let capture = array_capture(ELEMENTS);
        let mut stage = AngleStage::new();
        let config = StageConfig {
            cross_range_bins: 61,
            field_of_view: [-30.0, 30.0],
            conversion: Some("mag".into()),
            ..StageConfig::default()
        };
        stage.initialize(&config).unwrap();
        let output = stage
            .execute(&StageInput {
                capture: &capture,
                pulse_index: None,
            })
            .unwrap();
        let options = RangeAngleOptions {
            cross_range_bins: 61,
            field_of_view: [-30.0, 30.0],
            ..RangeAngleOptions::default()
        };
        let power = range_angle_map(&capture, None, WindowKind::Flat, &options).unwrap();
        assert!((output.frame.data[50][6] - power[[50, 6]]).abs() < 1e-9);
        assert!(output.frame.label.contains("mag"));
    }

    #[test]
    fn stage_rejects_channel_selection() {
        let mut stage = AngleStage::new();
        let config = StageConfig {
            channel: Some("Rx1:Tx".into()),
            ..StageConfig::default()
        };
        assert!(matches!(
            stage.initialize(&config),
            Err(FrtmError::InvalidInput(_))
        ));
    }

    #[test]
    fn maps_can_be_computed_concurrently() {
        let capture = array_capture(4);
        let options = RangeAngleOptions::default();
        let serial = range_angle_map(&capture, None, WindowKind::Hann, &options).unwrap();
        let maps: Vec<Array2<f64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..3)
                .map(|_| scope.spawn(|| range_angle_map(&capture, None, WindowKind::Hann, &options)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap())
                .collect()
        });
        for map in maps {
            assert_eq!(map, serial);
        }
    }
}
