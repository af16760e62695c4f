//! FFT resampling of epoch rows.
//!
//! Each row is treated as one period of a band-limited signal: its one-sided
//! spectrum is truncated (downsampling) or zero-extended (upsampling) to the
//! target length and transformed back.
//!
//! ```text
//! X     = FFT(x)                          n samples
//! Y[k]  = X[k]         0 <= k <= min(n, m)/2
//! Y[h] *= 2 (down) or 0.5 (up)            h = min(n, m)/2, min(n, m) even
//! y     = Re(IFFT(hermitian(Y))) / n      m samples
//! ```

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

const ZERO: Complex<f64> = Complex { re: 0.0, im: 0.0 };

/// Resample every row of `(epochs, samples)` to `num` samples.
pub fn resample_rows(input: &Array2<f64>, num: usize) -> Array2<f64> {
    let (n_rows, n_in) = input.dim();
    if n_in == num {
        return input.clone();
    }
    let mut out = Array2::<f64>::zeros((n_rows, num));
    if n_in == 0 || num == 0 {
        return out;
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n_in);
    let inverse = planner.plan_fft_inverse(num);

    let mut spectrum = vec![ZERO; n_in];
    let mut resized = vec![ZERO; num];
    let scale = 1.0 / n_in as f64;

    for (row, mut dest) in input.outer_iter().zip(out.outer_iter_mut()) {
        for (slot, &x) in spectrum.iter_mut().zip(row.iter()) {
            *slot = Complex::new(x, 0.0);
        }
        forward.process(&mut spectrum);

        resize_spectrum(&spectrum, &mut resized);
        inverse.process(&mut resized);

        for (d, c) in dest.iter_mut().zip(resized.iter()) {
            *d = c.re * scale;
        }
    }
    out
}

/// Build the length-`dst.len()` spectrum of the resampled row from `src`.
fn resize_spectrum(src: &[Complex<f64>], dst: &mut [Complex<f64>]) {
    let n = src.len();
    let m = dst.len();
    let shorter = n.min(m);

    let mut half = vec![ZERO; m / 2 + 1];
    let keep = shorter / 2 + 1;
    half[..keep].copy_from_slice(&src[..keep]);

    if shorter % 2 == 0 {
        let h = shorter / 2;
        if m < n {
            half[h] = half[h] * 2.0;
        } else {
            half[h] = half[h] * 0.5;
        }
    }

    dst.fill(ZERO);
    dst[0] = Complex::new(half[0].re, 0.0);
    for k in 1..(m + 1) / 2 {
        dst[k] = half[k];
        dst[m - k] = half[k].conj();
    }
    if m % 2 == 0 {
        dst[m / 2] = Complex::new(half[m / 2].re, 0.0);
    }
}

/// Samples per epoch after resampling `epoch_length` seconds to `target_hz`.
#[inline]
pub fn resampled_epoch_len(epoch_length: u32, target_hz: u32) -> usize {
    epoch_length as usize * target_hz as usize
}
