use std::fmt;
use std::str::FromStr;

use ndarray::{Array, Dimension};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::prelude::FrtmError;

/// Presentation conversion applied to complex samples before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conversion {
    Real,
    Imag,
    Magnitude,
    /// `10 * log10(|x|)`
    Db10,
    /// `20 * log10(|x|)`
    Db20,
    /// Phase in radians.
    Phase,
    PhaseDegrees,
}

impl Conversion {
    pub fn apply(self, value: Complex64) -> f64 {
        match self {
            Conversion::Real => value.re,
            Conversion::Imag => value.im,
            Conversion::Magnitude => value.norm(),
            Conversion::Db10 => 10.0 * value.norm().log10(),
            Conversion::Db20 => 20.0 * value.norm().log10(),
            Conversion::Phase => value.arg(),
            Conversion::PhaseDegrees => value.arg().to_degrees(),
        }
    }

    /// Converts every element; zero magnitudes map to `-inf` in dB.
    pub fn apply_array<D: Dimension>(self, data: &Array<Complex64, D>) -> Array<f64, D> {
        data.mapv(|value| self.apply(value))
    }
}

impl FromStr for Conversion {
    type Err = FrtmError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "real" | "re" => Ok(Conversion::Real),
            "imag" | "im" => Ok(Conversion::Imag),
            "mag" | "abs" | "magnitude" => Ok(Conversion::Magnitude),
            "db10" => Ok(Conversion::Db10),
            "db20" | "db" => Ok(Conversion::Db20),
            "phase" | "ang" | "angle" => Ok(Conversion::Phase),
            "phase_deg" | "ang_deg" => Ok(Conversion::PhaseDegrees),
            _ => Err(FrtmError::UnknownConversion(name.to_string())),
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Conversion::Real => "real",
            Conversion::Imag => "imag",
            Conversion::Magnitude => "mag",
            Conversion::Db10 => "dB10",
            Conversion::Db20 => "dB20",
            Conversion::Phase => "phase",
            Conversion::PhaseDegrees => "phase_deg",
        };
        f.write_str(name)
    }
}
