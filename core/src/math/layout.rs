//! Axis conventions of the radar maps.
//!
//! Range profiles come out of the inverse FFT with range decreasing along
//! the bin index; [`flip_range_axis`] restores increasing range. Doppler
//! spectra come out with zero Doppler at index 0; [`center_doppler_axis`]
//! moves it to index `len / 2`. Range-angle maps are laid out angle by
//! range with [`angle_major_map`].

use ndarray::{Array1, Array2, ArrayView2, Axis};
use num_complex::Complex64;

/// Reverses `axis`; bin `i` moves to `len - 1 - i`.
pub fn flip_range_axis<A: Clone>(data: ArrayView2<'_, A>, axis: Axis) -> Array2<A> {
    reversed(data, axis)
}

/// Reverses the slow-time (pulse) axis so positive Doppler maps to
/// closing targets after the inverse transform.
pub fn flip_pulse_axis<A: Clone>(data: ArrayView2<'_, A>, axis: Axis) -> Array2<A> {
    reversed(data, axis)
}

fn reversed<A: Clone>(data: ArrayView2<'_, A>, axis: Axis) -> Array2<A> {
    let mut view = data;
    view.invert_axis(axis);
    view.as_standard_layout().into_owned()
}

/// Circularly shifts `axis` by `len / 2`; bin 0 lands on `len / 2`.
pub fn center_doppler_axis<A: Clone>(data: ArrayView2<'_, A>, axis: Axis) -> Array2<A> {
    let len = data.len_of(axis);
    let half = len / 2;
    let indices: Vec<usize> = (0..len).map(|bin| (bin + len - half) % len).collect();
    data.select(axis, &indices)
}

/// Range-angle layout: a `(range, angle)` spectrum over unflipped range
/// cells becomes an `(angle, range)` map whose columns run from near to far
/// range, as in the other transforms.
pub fn angle_major_map<A: Clone>(spectrum: ArrayView2<'_, A>) -> Array2<A> {
    flip_range_axis(spectrum.t(), Axis(1))
}

/// Multiplies every lane along `axis` by `window`.
pub fn apply_window(data: &mut Array2<Complex64>, window: &Array1<f64>, axis: Axis) {
    for mut lane in data.lanes_mut(axis) {
        lane.zip_mut_with(window, |value, &weight| *value *= weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn flip_range_axis_reverses_columns() {
        let data = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(
            flip_range_axis(data.view(), Axis(1)),
            array![[3, 2, 1], [6, 5, 4]]
        );
        assert_eq!(
            flip_pulse_axis(data.view(), Axis(0)),
            array![[4, 5, 6], [1, 2, 3]]
        );
    }

    #[test]
    fn center_doppler_axis_moves_zero_bin_to_middle() {
        let even = array![[0, 1, 2, 3]];
        assert_eq!(
            center_doppler_axis(even.view(), Axis(1)),
            array![[2, 3, 0, 1]]
        );
        let odd = array![[0], [1], [2], [3], [4]];
        let shifted = center_doppler_axis(odd.view(), Axis(0));
        assert_eq!(shifted.column(0).to_vec(), vec![3, 4, 0, 1, 2]);
        assert_eq!(shifted[[5 / 2, 0]], 0);
    }

    #[test]
    fn angle_major_map_puts_angles_on_rows_and_flips_range() {
        // rows: range cells 0..3 before the flip, columns: two angles
        let spectrum = array![[1, 2], [3, 4], [5, 6]];
        assert_eq!(
            angle_major_map(spectrum.view()),
            array![[5, 3, 1], [6, 4, 2]]
        );
    }

    #[test]
    fn apply_window_scales_along_axis() {
        let mut data = Array2::from_elem((2, 3), Complex64::new(1.0, 1.0));
        apply_window(&mut data, &array![1.0, 2.0], Axis(0));
        assert_eq!(data[[1, 2]], Complex64::new(2.0, 2.0));
        assert_eq!(data[[0, 1]], Complex64::new(1.0, 1.0));
    }
}
