//! Direction-of-arrival spectra over a range profile.
//!
//! Each range cell contributes a snapshot vector across channels. The
//! spatial covariance at a cell averages the snapshots of the cells within
//! `snapshot_span` of it, clipped to the profile.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::frtm::SPEED_OF_LIGHT;
use crate::math::matrix::MatrixHelper;
use crate::prelude::{FrtmError, FrtmResult};

const POWER_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoaMethod {
    /// Conventional beamformer.
    #[default]
    Bartlett,
    /// Minimum-variance distortionless response.
    Capon,
    /// Noise-subspace pseudo-spectrum.
    Music,
}

impl FromStr for DoaMethod {
    type Err = FrtmError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bartlett" => Ok(DoaMethod::Bartlett),
            "capon" | "mvdr" => Ok(DoaMethod::Capon),
            "music" => Ok(DoaMethod::Music),
            _ => Err(FrtmError::UnknownDoaMethod(name.to_string())),
        }
    }
}

impl fmt::Display for DoaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DoaMethod::Bartlett => "Bartlett",
            DoaMethod::Capon => "Capon",
            DoaMethod::Music => "MUSIC",
        };
        f.write_str(name)
    }
}

/// Array response for a plane wave from each azimuth in `angles` (degrees).
///
/// Azimuth is measured from the +x axis towards +y; element `c` at
/// `positions[c] = [x, y]` sees phase `2 pi f / c0 (x cos t + y sin t)`.
pub fn steering_vectors(
    positions: &[[f64; 2]],
    center_frequency: f64,
    angles: &[f64],
) -> Vec<DVector<Complex64>> {
    let wavenumber = 2.0 * PI * center_frequency / SPEED_OF_LIGHT;
    angles
        .iter()
        .map(|angle| {
            let (sin, cos) = angle.to_radians().sin_cos();
            DVector::from_iterator(
                positions.len(),
                positions
                    .iter()
                    .map(|[x, y]| Complex64::from_polar(1.0, wavenumber * (x * cos + y * sin))),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoaEstimator {
    pub method: DoaMethod,
    pub snapshot_span: usize,
    /// Capon loading as a fraction of the mean channel power.
    pub diagonal_loading: f64,
    /// Assumed number of sources, the MUSIC signal-subspace dimension.
    pub source_count: usize,
}

impl Default for DoaEstimator {
    fn default() -> Self {
        Self::new(DoaMethod::default())
    }
}

impl DoaEstimator {
    pub fn new(method: DoaMethod) -> Self {
        Self {
            method,
            snapshot_span: 2,
            diagonal_loading: 1e-3,
            source_count: 1,
        }
    }

    /// Power `(range, angle)` for a `(channels, range)` profile.
    pub fn spectrum(
        &self,
        profiles: ArrayView2<'_, Complex64>,
        steering: &[DVector<Complex64>],
    ) -> FrtmResult<Array2<f64>> {
        let (channels, cells) = profiles.dim();
        if channels == 0 || cells == 0 {
            return Err(FrtmError::InvalidInput("empty range profile".into()));
        }
        if let Some(vector) = steering.iter().find(|vector| vector.len() != channels) {
            return Err(FrtmError::InvalidInput(format!(
                "steering vector of {} elements for {channels} channels",
                vector.len()
            )));
        }
        if self.method == DoaMethod::Music && channels <= self.source_count {
            return Err(FrtmError::InvalidInput(format!(
                "MUSIC needs more than {} channels, capture has {channels}",
                self.source_count
            )));
        }

        let mut power = Array2::zeros((cells, steering.len()));
        for (cell, mut row) in power.rows_mut().into_iter().enumerate() {
            let first = cell.saturating_sub(self.snapshot_span);
            let last = (cell + self.snapshot_span).min(cells - 1);
            let covariance = MatrixHelper::covariance(profiles, first, last);
            let values = self.scan(covariance, steering)?;
            row.iter_mut().zip(values).for_each(|(slot, value)| *slot = value);
        }
        Ok(power)
    }

    fn scan(
        &self,
        covariance: DMatrix<Complex64>,
        steering: &[DVector<Complex64>],
    ) -> FrtmResult<Vec<f64>> {
        match self.method {
            DoaMethod::Bartlett => Ok(steering
                .iter()
                .map(|a| MatrixHelper::quadratic_form(&covariance, a) / a.norm_squared())
                .collect()),
            DoaMethod::Capon => {
                let size = covariance.nrows();
                let loading = self.diagonal_loading * covariance.trace().re / size as f64 + POWER_FLOOR;
                let loaded = covariance + DMatrix::identity(size, size) * Complex64::new(loading, 0.0);
                let inverse = loaded
                    .try_inverse()
                    .ok_or_else(|| FrtmError::Internal("loaded covariance is singular".into()))?;
                Ok(steering
                    .iter()
                    .map(|a| 1.0 / MatrixHelper::quadratic_form(&inverse, a).max(POWER_FLOOR))
                    .collect())
            }
            DoaMethod::Music => {
                let eigenvectors = MatrixHelper::sorted_eigenvectors(covariance);
                let noise_rank = eigenvectors.len() - self.source_count;
                let noise = &eigenvectors[..noise_rank];
                Ok(steering
                    .iter()
                    .map(|a| {
                        let projection: f64 = noise.iter().map(|e| e.dotc(a).norm_sqr()).sum();
                        1.0 / projection.max(POWER_FLOOR)
                    })
                    .collect())
            }
        }
    }
}
