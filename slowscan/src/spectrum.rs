//! Dominant-frequency estimation for short sample windows.

use std::{
    f32::consts::TAU,
    sync::Arc,
};

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::GetSampleRate;

/// Transform size used for the sample rates we usually see. Windows are
/// zero-padded to this size, which gives about 11.7 Hz bins at 48 kHz.
pub const DEFAULT_FFT_SIZE: usize = 4096;

/// Estimates the dominant frequency of sample windows.
///
/// Each window is Hann-tapered, zero-padded into a fixed-size FFT, and the
/// peak magnitude bin is refined with barycentric interpolation over its
/// neighbours. The scratch buffers are reused between calls.
#[derive(derive_more::Debug)]
pub struct SpectralAnalyzer {
    sample_rate: f32,
    size: usize,
    #[debug(skip)]
    fft: Arc<dyn rustfft::Fft<f32>>,
    #[debug(skip)]
    buffer: Vec<Complex<f32>>,
    #[debug(skip)]
    scratch: Vec<Complex<f32>>,
    #[debug(skip)]
    magnitudes: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(sample_rate: f32, size: usize) -> Self {
        assert!(size > 0, "FFT size must be greater than 0: {size}");
        assert!(size & 1 == 0, "FFT size must be divisible by 2: {size}");

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        Self {
            sample_rate,
            size,
            buffer: vec![Complex::default(); size],
            scratch: vec![Complex::default(); fft.get_inplace_scratch_len()],
            magnitudes: vec![0.0; size / 2 + 1],
            fft,
        }
    }

    /// Creates an analyzer whose transform fits windows of up to
    /// `max_window_time` seconds.
    pub fn for_window_time(sample_rate: f32, max_window_time: f64) -> Self {
        let max_window = (max_window_time * f64::from(sample_rate)).ceil() as usize;
        let size = DEFAULT_FFT_SIZE.max(max_window.next_power_of_two());
        Self::new(sample_rate, size)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the dominant frequency of `window` in Hz.
    ///
    /// Samples beyond the transform size are ignored.
    pub fn peak_frequency(&mut self, window: &[f32]) -> f32 {
        let window = &window[..window.len().min(self.size)];

        self.buffer.fill(Complex::default());
        for ((output, sample), taper) in self
            .buffer
            .iter_mut()
            .zip(window)
            .zip(hann_window(window.len()))
        {
            output.re = sample * taper;
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let mut peak_index = 0;
        let mut peak_magnitude = -1.0;
        for (index, (magnitude, bin)) in self.magnitudes.iter_mut().zip(&self.buffer).enumerate() {
            *magnitude = bin.norm();
            if *magnitude > peak_magnitude {
                peak_magnitude = *magnitude;
                peak_index = index;
            }
        }

        let peak = barycentric_peak(&self.magnitudes, peak_index);
        peak * self.sample_rate / self.size as f32
    }
}

impl GetSampleRate for SpectralAnalyzer {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

/// Hann window with its end points at zero, matched to `n` samples.
pub fn hann_window(n: usize) -> impl Iterator<Item = f32> {
    let denominator = n.saturating_sub(1) as f32;
    (0..n).map(move |i| {
        if denominator == 0.0 {
            1.0
        }
        else {
            0.5 * (1.0 - (TAU * i as f32 / denominator).cos())
        }
    })
}

/// Refines the peak at `index` to a fractional bin using the centre of mass
/// of the bin and its two neighbours. Missing neighbours are replaced by the
/// centre bin.
pub fn barycentric_peak(bins: &[f32], index: usize) -> f32 {
    let center = bins[index];
    let left = index.checked_sub(1).map_or(center, |i| bins[i]);
    let right = bins.get(index + 1).copied().unwrap_or(center);

    let sum = left + center + right;
    if sum == 0.0 {
        index as f32
    }
    else {
        (right - left) / sum + index as f32
    }
}
