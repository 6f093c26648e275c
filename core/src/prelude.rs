use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::frtm::RadarCapture;
use crate::plot::PlotFrame;

/// Shared configuration for each processing stage.
///
/// Names are kept as strings so workflow files can carry them verbatim; each
/// stage validates them in [`ProcessingStage::initialize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub window: String,
    pub range_bins: Option<usize>,
    pub doppler_bins: Option<usize>,
    pub cross_range_bins: usize,
    pub doa_method: String,
    pub field_of_view: [f64; 2],
    pub channel: Option<String>,
    pub conversion: Option<String>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            window: "Flat".into(),
            range_bins: None,
            doppler_bins: None,
            cross_range_bins: 181,
            doa_method: "Bartlett".into(),
            field_of_view: [-90.0, 90.0],
            channel: None,
            conversion: None,
        }
    }
}

/// Input handed to a processing stage.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub capture: &'a RadarCapture,
    pub pulse_index: Option<usize>,
}

/// Output produced by each stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub frame: PlotFrame,
    pub metadata: StageMetadata,
}

/// Metadata used for summaries and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    /// Row/column of the strongest cell in the plotted data.
    pub peak: Option<(usize, usize)>,
    pub peak_value: Option<f64>,
    pub notes: Vec<String>,
}

/// Error type shared by the reader, the transforms and the stages.
#[derive(thiserror::Error, Debug)]
pub enum FrtmError {
    #[error("capture file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("header sentinel \"@ BeginData\" not found")]
    MissingSentinel,
    #[error("header key {0} is missing")]
    MissingHeaderKey(&'static str),
    #[error("malformed header field {key}: {reason}")]
    MalformedHeader { key: String, reason: String },
    #[error("binary payload holds {actual} records, header implies {expected}")]
    PayloadSizeMismatch { expected: usize, actual: usize },
    #[error("unknown window kind {0:?} (expected Flat, Hann or Hamming)")]
    UnknownWindow(String),
    #[error("unknown DoA method {0:?} (expected Bartlett, Capon or MUSIC)")]
    UnknownDoaMethod(String),
    #[error("unknown display conversion {0:?}")]
    UnknownConversion(String),
    #[error("unknown channel {0:?}")]
    UnknownChannel(String),
    #[error("pulse index {index} out of range (capture holds {pulse_count} pulses)")]
    PulseOutOfRange { index: usize, pulse_count: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl FrtmError {
    pub(crate) fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FrtmError::MalformedHeader {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type FrtmResult<T> = Result<T, FrtmError>;

/// Trait describing object-oriented signal-processing stages.
pub trait ProcessingStage {
    fn initialize(&mut self, config: &StageConfig) -> FrtmResult<()>;
    fn execute(&mut self, input: &StageInput<'_>) -> FrtmResult<StageOutput>;
    fn cleanup(&mut self);
}
