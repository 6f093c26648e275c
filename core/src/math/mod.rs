pub mod convert;
pub mod fft;
pub mod layout;
pub mod matrix;
pub mod stats;
pub mod window;

pub use convert::Conversion;
pub use fft::{ifft_axis, InverseFft};
pub use layout::{
    angle_major_map, apply_window, center_doppler_axis, flip_pulse_axis, flip_range_axis,
};
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
pub use window::{normalized_window, window_function, WindowKind};
