use anyhow::{ensure, Context};
use frtmcore::frtm::{AxisSpec, CaptureLayout, FrtmWriter, SPEED_OF_LIGHT};
use ndarray::Array2;
use num_complex::Complex64;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

/// Point scatterer placed in a synthetic capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Metres.
    pub range: f64,
    /// Metres per second, positive when the range rate moves the echo to
    /// positive Doppler.
    pub velocity: f64,
    /// Azimuth in degrees from the +x axis.
    pub angle: f64,
    pub amplitude: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            range: 10.0,
            velocity: 0.0,
            angle: 0.0,
            amplitude: 1.0,
        }
    }
}

/// Configuration for generating synthetic `.frtm` captures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub pulses: usize,
    pub bins: usize,
    pub receivers: usize,
    pub start_frequency: f64,
    pub stop_frequency: f64,
    pub pulse_interval: f64,
    /// Receiver spacing along y in wavelengths at the center frequency.
    pub element_spacing: f64,
    pub noise: f64,
    pub seed: u64,
    pub targets: Vec<TargetConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            pulses: 64,
            bins: 256,
            receivers: 4,
            start_frequency: 76.0e9,
            stop_frequency: 77.0e9,
            pulse_interval: 1e-4,
            element_spacing: 0.5,
            noise: 0.01,
            seed: 0,
            targets: vec![TargetConfig::default()],
        }
    }
}

impl GeneratorConfig {
    fn center_frequency(&self) -> f64 {
        (self.start_frequency + self.stop_frequency) / 2.0
    }

    pub fn channel_names(&self) -> Vec<String> {
        (1..=self.receivers).map(|i| format!("Rx{i}:Tx")).collect()
    }

    /// Receiver offsets matching the generated channel phases.
    pub fn receiver_positions(&self) -> Vec<(String, [f64; 2])> {
        let spacing = self.element_spacing * SPEED_OF_LIGHT / self.center_frequency();
        self.channel_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, [0.0, i as f64 * spacing]))
            .collect()
    }

    pub fn layout(&self) -> CaptureLayout {
        let mut antenna_names = vec!["Tx".to_string()];
        antenna_names.extend((1..=self.receivers).map(|i| format!("Rx{i}")));
        CaptureLayout {
            antenna_names,
            coupling_combos: (1..=self.receivers).map(|rx| (rx, 0)).collect(),
            time_steps: AxisSpec::new(
                0.0,
                self.pulse_interval * (self.pulses - 1) as f64,
                self.pulses,
            ),
            freq_sweep: AxisSpec::new(self.start_frequency, self.stop_frequency, self.bins),
            ..CaptureLayout::default()
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.pulses >= 2, "generator needs at least 2 pulses");
        ensure!(self.bins >= 2, "generator needs at least 2 frequency bins");
        ensure!(self.receivers >= 1, "generator needs at least one receiver");
        ensure!(
            self.stop_frequency != self.start_frequency,
            "frequency sweep must not be degenerate"
        );
        ensure!(self.pulse_interval > 0.0, "pulse interval must be positive");
        Ok(())
    }
}

/// One `(pulses, bins)` array per receiver holding the configured targets plus noise.
pub fn build_channels(config: &GeneratorConfig) -> anyhow::Result<Vec<Array2<Complex64>>> {
    config.validate()?;
    let bin_spacing = (config.stop_frequency - config.start_frequency) / (config.bins - 1) as f64;
    let wavenumber = 2.0 * PI * config.center_frequency() / SPEED_OF_LIGHT;
    let positions = config.receiver_positions();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let channels = positions
        .iter()
        .map(|(_, [x, y])| {
            let mut samples = Array2::from_shape_fn((config.pulses, config.bins), |(pulse, bin)| {
                let time = pulse as f64 * config.pulse_interval;
                config
                    .targets
                    .iter()
                    .map(|target| {
                        let delay = 2.0 * target.range / SPEED_OF_LIGHT;
                        let (sin, cos) = target.angle.to_radians().sin_cos();
                        let phase = 2.0 * PI * bin as f64 * bin_spacing * delay
                            + 2.0 * wavenumber * target.velocity * time
                            + wavenumber * (x * cos + y * sin);
                        Complex64::from_polar(target.amplitude, phase)
                    })
                    .sum::<Complex64>()
            });
            if config.noise > 0.0 {
                samples.mapv_inplace(|value| {
                    value
                        + Complex64::new(
                            rng.gen_range(-config.noise..config.noise),
                            rng.gen_range(-config.noise..config.noise),
                        )
                });
            }
            samples
        })
        .collect();
    Ok(channels)
}

pub fn write_capture<P: AsRef<Path>>(config: &GeneratorConfig, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let channels = build_channels(config)?;
    FrtmWriter::new(config.layout())
        .write_to(path, &channels)
        .with_context(|| format!("writing synthetic capture {}", path.display()))
}
