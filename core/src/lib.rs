//! Reader and signal-processing core for FRTM radar captures.
//!
//! A capture is parsed once into an immutable [`frtm::RadarCapture`]; the
//! transforms in [`processing`] turn its per-channel frequency-domain cubes
//! into range profiles, range-Doppler maps and range-angle maps, and
//! [`plot`] describes the frames handed to an external plotter.

pub mod frtm;
pub mod math;
pub mod plot;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use frtm::{open_capture, ChannelId, RadarCapture};
pub use prelude::{FrtmError, FrtmResult, ProcessingStage, StageConfig, StageInput, StageOutput};
