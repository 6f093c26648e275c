use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis, Zip};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};

/// Inverse FFT planned for one output length.
///
/// [`InverseFft::resample`] zero-pads or truncates its input to the planned
/// length and scales by `1 / input_len`, i.e. the `1 / n` inverse
/// normalization times the `n / input_len` resampling gain, so a tone keeps
/// its amplitude whatever the output length.
pub struct InverseFft {
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl InverseFft {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_inverse(size);
        let scratch = vec![Complex64::zero(); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex64::zero(); size],
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn resample(&mut self, input: &[Complex64]) -> Vec<Complex64> {
        let size = self.size();
        let kept = input.len().min(size);
        self.buffer[..kept].copy_from_slice(&input[..kept]);
        self.buffer[kept..].fill(Complex64::zero());

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = if input.is_empty() {
            0.0
        } else {
            1.0 / input.len() as f64
        };
        self.buffer.iter().map(|value| *value * scale).collect()
    }
}

/// Applies [`InverseFft::resample`] to every lane of `data` along `axis`.
pub fn ifft_axis(data: ArrayView2<'_, Complex64>, axis: Axis, size: usize) -> Array2<Complex64> {
    let mut shape = [data.nrows(), data.ncols()];
    shape[axis.index()] = size;
    let mut output = Array2::zeros(shape);

    let mut fft = InverseFft::new(size);
    let mut lane_buffer = Vec::with_capacity(data.len_of(axis));
    Zip::from(data.lanes(axis))
        .and(output.lanes_mut(axis))
        .for_each(|source, mut target| {
            lane_buffer.clear();
            lane_buffer.extend(source.iter().copied());
            let transformed = fft.resample(&lane_buffer);
            target
                .iter_mut()
                .zip(transformed)
                .for_each(|(slot, value)| *slot = value);
        });
    output
}
