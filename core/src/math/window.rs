//! Taper windows applied before range and Doppler transforms.
//!
//! Windows are symmetric and peak-normalized. The transforms use
//! [`normalized_window`], which rescales a window by `len / sum` so that
//! its coefficients sum to its length and the total signal energy passes
//! through the taper unchanged.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::prelude::{FrtmError, FrtmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowKind {
    /// All ones.
    #[default]
    Flat,
    /// `0.5 - 0.5 cos(2 pi n / (N - 1))`
    Hann,
    /// `0.54 - 0.46 cos(2 pi n / (N - 1))`
    Hamming,
}

impl FromStr for WindowKind {
    type Err = FrtmError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(WindowKind::Flat),
            "hann" | "hanning" => Ok(WindowKind::Hann),
            "hamming" => Ok(WindowKind::Hamming),
            _ => Err(FrtmError::UnknownWindow(name.to_string())),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowKind::Flat => "Flat",
            WindowKind::Hann => "Hann",
            WindowKind::Hamming => "Hamming",
        };
        f.write_str(name)
    }
}

/// Window of `size` coefficients with a peak of 1.0.
pub fn window_function(kind: WindowKind, size: usize) -> Array1<f64> {
    if size <= 1 {
        return Array1::ones(size);
    }
    let span = (size - 1) as f64;
    let raw = match kind {
        WindowKind::Flat => return Array1::ones(size),
        WindowKind::Hann => {
            Array1::from_shape_fn(size, |n| 0.5 - 0.5 * (2.0 * PI * n as f64 / span).cos())
        }
        WindowKind::Hamming => {
            Array1::from_shape_fn(size, |n| 0.54 - 0.46 * (2.0 * PI * n as f64 / span).cos())
        }
    };
    let peak = raw.fold(0.0_f64, |acc, &value| acc.max(value));
    if peak > 0.0 {
        raw / peak
    } else {
        raw
    }
}

/// `len / sum(window)`, the gain that restores the energy a taper removes.
pub fn energy_scale(window: &Array1<f64>) -> FrtmResult<f64> {
    let sum = window.sum();
    if sum <= 0.0 {
        return Err(FrtmError::InvalidInput(format!(
            "window of {} coefficients sums to {sum}",
            window.len()
        )));
    }
    Ok(window.len() as f64 / sum)
}

/// Window rescaled so its coefficients sum to `size`.
pub fn normalized_window(kind: WindowKind, size: usize) -> FrtmResult<Array1<f64>> {
    let window = window_function(kind, size);
    if size == 0 {
        return Ok(window);
    }
    let scale = energy_scale(&window)?;
    Ok(window * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_window_is_all_ones() {
        let window = window_function(WindowKind::Flat, 16);
        assert!(window.iter().all(|&value| value == 1.0));
        assert_eq!(normalized_window(WindowKind::Flat, 16).unwrap(), window);
    }

    #[test]
    fn tapered_windows_peak_at_one() {
        for kind in [WindowKind::Hann, WindowKind::Hamming] {
            for size in [7, 8, 64] {
                let window = window_function(kind, size);
                let peak = window.fold(0.0_f64, |acc, &value| acc.max(value));
                assert!((peak - 1.0).abs() < 1e-12, "{kind} {size}");
            }
        }
    }

    #[test]
    fn normalized_windows_sum_to_their_length() {
        for kind in [WindowKind::Flat, WindowKind::Hann, WindowKind::Hamming] {
            for size in [3, 8, 33, 256] {
                let window = normalized_window(kind, size).unwrap();
                assert!((window.sum() - size as f64).abs() < 1e-9, "{kind} {size}");
            }
        }
    }

    #[test]
    fn hann_endpoints_are_zero() {
        let window = window_function(WindowKind::Hann, 9);
        assert_eq!(window[0], 0.0);
        assert!((window[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_window_name_is_rejected() {
        assert_eq!("hanning".parse::<WindowKind>().unwrap(), WindowKind::Hann);
        assert!(matches!(
            "Kaiser".parse::<WindowKind>(),
            Err(FrtmError::UnknownWindow(name)) if name == "Kaiser"
        ));
    }

    #[test]
    fn degenerate_hann_cannot_be_normalized() {
        assert!(normalized_window(WindowKind::Hann, 2).is_err());
    }
}
