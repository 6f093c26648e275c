use ndarray::Array2;

pub struct StatsHelper;

impl StatsHelper {
    /// Root mean square over the finite values of `data`.
    pub fn rms(data: &Array2<f64>) -> f64 {
        let (sum_sq, count) = data
            .iter()
            .filter(|value| value.is_finite())
            .fold((0.0, 0usize), |(sum, count), &value| (sum + value * value, count + 1));
        if count == 0 {
            return 0.0;
        }
        (sum_sq / count as f64).sqrt()
    }

    /// Position and value of the largest finite element.
    pub fn peak(data: &Array2<f64>) -> Option<((usize, usize), f64)> {
        data.indexed_iter()
            .filter(|(_, value)| value.is_finite())
            .fold(None, |best: Option<((usize, usize), f64)>, (index, &value)| match best {
                Some((_, current)) if current >= value => best,
                _ => Some((index, value)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&Array2::zeros((0, 0))), 0.0);
        assert_eq!(StatsHelper::rms(&Array2::zeros((2, 2))), 0.0);
    }

    #[test]
    fn rms_skips_infinite_decibels() {
        let data = array![[4.0, f64::NEG_INFINITY]];
        assert_eq!(StatsHelper::rms(&data), 4.0);
    }

    #[test]
    fn peak_reports_first_maximum() {
        let data = array![[1.0, 7.0], [7.0, f64::NAN]];
        assert_eq!(StatsHelper::peak(&data), Some(((0, 1), 7.0)));
        assert_eq!(StatsHelper::peak(&array![[f64::NAN]]), None);
    }
}
