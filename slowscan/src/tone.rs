use std::f32::consts::TAU;

use crate::GetSampleRate;

/// Output amplitude of generated tones.
pub const AMPLITUDE: f32 = 0.5;

/// Phase-continuous sine oscillator.
///
/// The phase carries over when the frequency changes, so consecutive tones
/// join without discontinuities.
#[derive(Clone, Copy, Debug)]
pub struct ToneGenerator {
    sample_rate: f32,
    phase: f32,
}

impl ToneGenerator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
        }
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Advances the phase by one sample of `frequency` and returns the sample.
    #[inline]
    pub fn next(&mut self, frequency: f32) -> f32 {
        self.phase += TAU * frequency / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        AMPLITUDE * self.phase.sin()
    }

    /// Appends `num_samples` samples of `frequency` to `output`.
    pub fn fill(&mut self, frequency: f32, num_samples: usize, output: &mut Vec<f32>) {
        output.reserve(num_samples);
        output.extend((0..num_samples).map(|_| self.next(frequency)));
    }
}

impl GetSampleRate for ToneGenerator {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use approx::assert_abs_diff_eq;

    use crate::tone::{
        AMPLITUDE,
        ToneGenerator,
    };

    #[test]
    fn first_sample_is_one_step_in() {
        let mut tone = ToneGenerator::new(8000.0);
        let sample = tone.next(1000.0);
        assert_abs_diff_eq!(sample, AMPLITUDE * (TAU / 8.0).sin(), epsilon = 1e-6);
    }

    #[test]
    fn phase_is_continuous_across_frequency_changes() {
        let sample_rate = 48000.0;
        let mut tone = ToneGenerator::new(sample_rate);
        let mut samples = vec![];
        tone.fill(1200.0, 100, &mut samples);
        tone.fill(2300.0, 100, &mut samples);

        // no jump larger than what the higher frequency can do in one sample
        let max_step = AMPLITUDE * TAU * 2300.0 / sample_rate;
        for pair in samples.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= max_step + 1e-4);
        }
    }

    #[test]
    fn phase_stays_wrapped() {
        let mut tone = ToneGenerator::new(11025.0);
        let mut samples = vec![];
        tone.fill(1900.0, 100_000, &mut samples);
        assert!(tone.phase() >= 0.0 && tone.phase() < TAU);
        assert!(samples.iter().all(|sample| sample.abs() <= AMPLITUDE));
        assert_eq!(samples.len(), 100_000);
    }
}
