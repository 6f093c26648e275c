pub mod capture;
pub mod header;
pub mod writer;

pub use capture::{open_capture, ChannelDataset, ChannelId, DerivedQuantities, RadarCapture};
pub use header::{AxisSpec, CouplingCombo, ElementType, FrtmHeader, BEGIN_DATA};
pub use writer::{CaptureLayout, FrtmWriter};

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
