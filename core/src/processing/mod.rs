pub mod angle;
pub mod axis;
pub mod doa;
pub mod doppler;
pub mod range;

use ndarray::{Array, Dimension};
use num_complex::Complex64;

use crate::math::convert::Conversion;

pub use angle::{range_angle_map, AngleStage, RangeAngleOptions};
pub use doa::{steering_vectors, DoaEstimator, DoaMethod};
pub use doppler::{range_doppler, DopplerStage};
pub use range::{frequency_to_range, get_pulse, range_profile, RangeStage};

/// Transform result: complex samples, or real values once a display
/// conversion has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleArray<D: Dimension> {
    Complex(Array<Complex64, D>),
    Real(Array<f64, D>),
}

impl<D: Dimension> SampleArray<D> {
    pub(crate) fn with_conversion(data: Array<Complex64, D>, conversion: Option<Conversion>) -> Self {
        match conversion {
            Some(conversion) => SampleArray::Real(conversion.apply_array(&data)),
            None => SampleArray::Complex(data),
        }
    }

    pub fn as_complex(&self) -> Option<&Array<Complex64, D>> {
        match self {
            SampleArray::Complex(data) => Some(data),
            SampleArray::Real(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<&Array<f64, D>> {
        match self {
            SampleArray::Complex(_) => None,
            SampleArray::Real(data) => Some(data),
        }
    }

    /// Real values, converting complex samples with `fallback`.
    pub fn into_real(self, fallback: Conversion) -> Array<f64, D> {
        match self {
            SampleArray::Complex(data) => fallback.apply_array(&data),
            SampleArray::Real(data) => data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            SampleArray::Complex(data) => data.shape(),
            SampleArray::Real(data) => data.shape(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures;
