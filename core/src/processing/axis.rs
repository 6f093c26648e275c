//! Physical axes of the transform outputs.

use crate::frtm::RadarCapture;

/// Range of each of `bins` range cells, ending at the maximum range.
///
/// After the range flip, cell `i` holds the echo delayed by `i + 1`
/// resolution cells; the zero-delay cell wraps to the far end.
pub fn range_axis(capture: &RadarCapture, bins: usize) -> Vec<f64> {
    let spacing = capture.range_maximum() / bins.max(1) as f64;
    (0..bins).map(|i| (i + 1) as f64 * spacing).collect()
}

/// Radial velocity of each Doppler column; zero sits at `bins / 2`.
pub fn velocity_axis(capture: &RadarCapture, bins: usize) -> Vec<f64> {
    let spacing = 2.0 * capture.velocity_maximum() / bins.max(1) as f64;
    let center = (bins / 2) as f64;
    (0..bins).map(|i| (i as f64 - center) * spacing).collect()
}

/// `bins` evenly spaced azimuth angles in degrees, both ends included.
pub fn angle_axis(field_of_view: [f64; 2], bins: usize) -> Vec<f64> {
    let [start, stop] = field_of_view;
    match bins {
        0 => Vec::new(),
        1 => vec![(start + stop) / 2.0],
        _ => {
            let step = (stop - start) / (bins - 1) as f64;
            (0..bins).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_angle_grid_has_one_degree_steps() {
        let angles = angle_axis([-90.0, 90.0], 181);
        assert_eq!(angles.len(), 181);
        assert_eq!(angles[0], -90.0);
        assert_eq!(angles[90], 0.0);
        assert_eq!(angles[180], 90.0);
    }

    #[test]
    fn single_angle_sits_mid_field() {
        assert_eq!(angle_axis([-30.0, 10.0], 1), vec![-10.0]);
    }
}
