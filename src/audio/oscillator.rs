//! Tone oscillator - phase-accurate waveform generation for the demo
//! source
//!
//! Generates the classic analog shapes at audio rate. Phase is tracked
//! in `[0, 1)` and advanced per sample, so frequency changes never
//! cause a discontinuity larger than one sample.

use serde::{Deserialize, Serialize};

/// Waveform shape for the tone generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Evaluate the shape at a normalized phase in `[0, 1)`.
    /// Output is in `[-1, 1]`.
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }

    /// All waveforms, for UI pickers.
    pub fn all() -> Vec<Waveform> {
        vec![
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Sawtooth,
        ]
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Triangle => "Triangle",
            Waveform::Square => "Square",
            Waveform::Sawtooth => "Sawtooth",
        }
    }
}

/// Free-running tone generator.
pub struct Oscillator {
    pub waveform: Waveform,
    /// Frequency in Hz.
    pub frequency: f32,
    /// Peak amplitude in `[0, 1]`.
    pub amplitude: f32,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32, amplitude: f32) -> Self {
        Self {
            waveform,
            frequency,
            amplitude,
            phase: 0.0,
        }
    }

    /// Produce the next sample and advance the phase by one step at
    /// `sample_rate`.
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let value = self.waveform.sample(self.phase) * self.amplitude;
        self.phase += self.frequency / sample_rate;
        self.phase -= self.phase.floor();
        value
    }

    /// Fill a mono buffer with consecutive samples.
    pub fn fill(&mut self, out: &mut [f32], sample_rate: f32) {
        for slot in out.iter_mut() {
            *slot = self.next_sample(sample_rate);
        }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(Waveform::Sine, 220.0, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_waveform() {
        let wf = Waveform::Sine;
        assert!((wf.sample(0.0) - 0.0).abs() < 0.001);
        assert!((wf.sample(0.25) - 1.0).abs() < 0.001);
        assert!((wf.sample(0.5) - 0.0).abs() < 0.001);
        assert!((wf.sample(0.75) - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_triangle_waveform() {
        let wf = Waveform::Triangle;
        assert!((wf.sample(0.0) - 0.0).abs() < 0.001);
        assert!((wf.sample(0.25) - 1.0).abs() < 0.001);
        assert!((wf.sample(0.5) - 0.0).abs() < 0.001);
        assert!((wf.sample(0.75) - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_square_waveform() {
        let wf = Waveform::Square;
        assert_eq!(wf.sample(0.1), 1.0);
        assert_eq!(wf.sample(0.4), 1.0);
        assert_eq!(wf.sample(0.6), -1.0);
        assert_eq!(wf.sample(0.9), -1.0);
    }

    #[test]
    fn test_sawtooth_waveform() {
        let wf = Waveform::Sawtooth;
        assert!((wf.sample(0.0) - (-1.0)).abs() < 0.001);
        assert!((wf.sample(0.5) - 0.0).abs() < 0.001);
        assert!((wf.sample(0.999) - 0.998).abs() < 0.01);
    }

    #[test]
    fn test_oscillator_phase_wraps() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, 1.0);
        for _ in 0..10_000 {
            osc.next_sample(48000.0);
        }
        assert!(osc.phase >= 0.0 && osc.phase < 1.0);
    }

    #[test]
    fn test_oscillator_amplitude_scales_output() {
        let mut osc = Oscillator::new(Waveform::Square, 100.0, 0.25);
        let first = osc.next_sample(48000.0);
        assert!((first - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_oscillator_period_matches_frequency() {
        // 1 kHz at 48 kHz: one full cycle every 48 samples.
        let mut osc = Oscillator::new(Waveform::Sawtooth, 1000.0, 1.0);
        let start = osc.next_sample(48000.0);
        for _ in 0..47 {
            osc.next_sample(48000.0);
        }
        let wrapped = osc.next_sample(48000.0);
        assert!((start - wrapped).abs() < 0.001);
    }

    #[test]
    fn test_fill_matches_next_sample() {
        let mut a = Oscillator::new(Waveform::Triangle, 330.0, 0.8);
        let mut b = Oscillator::new(Waveform::Triangle, 330.0, 0.8);
        let mut buf = [0.0f32; 64];
        a.fill(&mut buf, 44100.0);
        for &sample in &buf {
            assert_eq!(sample, b.next_sample(44100.0));
        }
    }
}
