use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::ArrayView2;
use num_complex::Complex64;

pub struct MatrixHelper;

impl MatrixHelper {
    /// Sample covariance of the snapshot columns `first..=last` of
    /// `snapshots` (channels x snapshots): the mean of `x x^H`.
    pub fn covariance(snapshots: ArrayView2<'_, Complex64>, first: usize, last: usize) -> DMatrix<Complex64> {
        let channels = snapshots.nrows();
        let count = (last + 1 - first) as f64;
        DMatrix::from_fn(channels, channels, |i, j| {
            let sum: Complex64 = (first..=last)
                .map(|column| snapshots[[i, column]] * snapshots[[j, column]].conj())
                .sum();
            sum / count
        })
    }

    /// `a^H M a`, real for Hermitian `M`.
    pub fn quadratic_form(matrix: &DMatrix<Complex64>, vector: &DVector<Complex64>) -> f64 {
        vector.dotc(&(matrix * vector)).re
    }

    /// Eigenvectors of a Hermitian matrix ordered by ascending eigenvalue.
    pub fn sorted_eigenvectors(matrix: DMatrix<Complex64>) -> Vec<DVector<Complex64>> {
        let eigen = SymmetricEigen::new(matrix);
        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
        order
            .into_iter()
            .map(|index| eigen.eigenvectors.column(index).into_owned())
            .collect()
    }
}
