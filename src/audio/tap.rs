//! Analysis tap - passive sample capture for visualization
//!
//! A tap sits beside an audio source's output without altering it. The
//! source pushes every sample it emits into the tap's ring window from
//! the audio callback; the render thread snapshots the window whenever
//! it wants to draw. The two sides never wait on each other:
//! - the audio side uses `try_lock` and drops the batch on contention
//! - the render side copies out under a short lock
//!
//! The tap is split in two halves. [`AnalysisTap`] is the reader, owned
//! by whoever visualizes. [`TapPort`] is the writer handed to the
//! source; it holds only a weak reference, so dropping the reader
//! severs the connection and the source can prune the dead port.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Smallest accepted analysis window.
const MIN_WINDOW: usize = 32;
/// Largest accepted analysis window.
const MAX_WINDOW: usize = 32768;

/// Analysis parameters for a tap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapConfig {
    /// Ring window length in samples. Rounded up to a power of two and
    /// clamped to `[32, 32768]`.
    pub window_size: usize,
    /// Exponential smoothing factor for frequency-domain reads, in
    /// `[0, 1)`. Higher values favor the previous estimate. Does not
    /// affect time-domain reads.
    pub smoothing_time_constant: f32,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            smoothing_time_constant: 0.8,
        }
    }
}

impl TapConfig {
    /// Clamp both fields into their documented ranges.
    pub fn sanitized(self) -> Self {
        let window_size = self
            .window_size
            .clamp(MIN_WINDOW, MAX_WINDOW)
            .next_power_of_two();
        let smoothing_time_constant = if self.smoothing_time_constant.is_finite() {
            self.smoothing_time_constant.clamp(0.0, 0.999)
        } else {
            Self::default().smoothing_time_constant
        };
        Self {
            window_size,
            smoothing_time_constant,
        }
    }
}

/// Ring window of the most recent samples.
struct SampleRing {
    samples: Vec<f32>,
    write_pos: usize,
}

impl SampleRing {
    fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
            write_pos: 0,
        }
    }

    fn push_slice(&mut self, incoming: &[f32]) {
        for &sample in incoming {
            self.samples[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.samples.len();
        }
    }

    /// Copy the most recent `out.len()` samples in chronological order.
    fn copy_recent(&self, out: &mut [f32]) {
        let len = self.samples.len();
        let count = out.len().min(len);
        let start = (self.write_pos + len - count) % len;
        for (i, slot) in out[..count].iter_mut().enumerate() {
            *slot = self.samples[(start + i) % len];
        }
        for slot in out[count..].iter_mut() {
            *slot = 0.0;
        }
    }
}

struct TapState {
    ring: Mutex<SampleRing>,
}

/// Writer half of a tap: pushed into the audio source, fed from the
/// audio callback.
pub struct TapPort {
    state: Weak<TapState>,
}

impl TapPort {
    /// Push a batch of mono samples into the tap window.
    ///
    /// Returns `false` once the reader half has been dropped, which is
    /// the source's cue to discard this port. A contended lock skips
    /// the batch without blocking and still returns `true`.
    pub fn ingest(&self, samples: &[f32]) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        if let Ok(mut ring) = state.ring.try_lock() {
            ring.push_slice(samples);
        }
        true
    }

    /// Whether the reader half still exists.
    pub fn is_live(&self) -> bool {
        self.state.strong_count() > 0
    }
}

/// Reader half of a tap: snapshots the window as bytes or as a
/// smoothed magnitude spectrum.
pub struct AnalysisTap {
    config: TapConfig,
    state: Arc<TapState>,
    fft: Arc<dyn Fft<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    window_scratch: Vec<f32>,
    smoothed: Vec<f32>,
}

impl AnalysisTap {
    pub fn new(config: TapConfig) -> Self {
        let config = config.sanitized();
        let state = Arc::new(TapState {
            ring: Mutex::new(SampleRing::new(config.window_size)),
        });
        let fft = FftPlanner::new().plan_fft_forward(config.window_size);
        Self {
            config,
            state,
            fft,
            fft_scratch: vec![Complex::new(0.0, 0.0); config.window_size],
            window_scratch: vec![0.0; config.window_size],
            smoothed: vec![0.0; config.window_size / 2],
        }
    }

    /// Sanitized parameters this tap runs with.
    pub fn config(&self) -> TapConfig {
        self.config
    }

    /// Analysis window length in samples.
    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Number of frequency bins, `window_size / 2`. Also the natural
    /// length for time-domain reads.
    pub fn bin_count(&self) -> usize {
        self.config.window_size / 2
    }

    /// Create a writer port for this tap. Every port feeds the same
    /// window; all of them die when this reader is dropped.
    pub fn port(&self) -> TapPort {
        TapPort {
            state: Arc::downgrade(&self.state),
        }
    }

    /// Snapshot the most recent samples as unsigned bytes.
    ///
    /// Each sample in `[-1, 1]` maps to `round(128 * (1 + s))` clamped
    /// to `[0, 255]`, so silence reads as a flat run of 128s. A window
    /// that has never been fed reads entirely as 128.
    pub fn read_waveform(&self, out: &mut [u8]) {
        let count = out.len().min(self.config.window_size);
        let mut recent = vec![0.0f32; count];
        {
            let ring = self
                .state
                .ring
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            ring.copy_recent(&mut recent);
        }
        for (byte, &sample) in out[..count].iter_mut().zip(recent.iter()) {
            *byte = byte_amplitude(sample);
        }
        for byte in out[count..].iter_mut() {
            *byte = 128;
        }
    }

    /// Snapshot a smoothed magnitude spectrum over the window.
    ///
    /// The window is Hann-weighted, transformed, and each bin magnitude
    /// is blended with the previous read:
    /// `s[i] = tau * s_prev[i] + (1 - tau) * |X[i]| / N`.
    /// Fills at most [`Self::bin_count`] values of `out`.
    pub fn read_spectrum(&mut self, out: &mut [f32]) {
        let n = self.config.window_size;
        {
            let ring = self
                .state
                .ring
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            ring.copy_recent(&mut self.window_scratch);
        }
        for (i, slot) in self.fft_scratch.iter_mut().enumerate() {
            let hann = 0.5
                * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos());
            *slot = Complex::new(self.window_scratch[i] * hann, 0.0);
        }
        self.fft.process(&mut self.fft_scratch);

        let tau = self.config.smoothing_time_constant;
        for (i, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft_scratch[i].norm() / n as f32;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }

        let count = out.len().min(self.smoothed.len());
        out[..count].copy_from_slice(&self.smoothed[..count]);
        for slot in out[count..].iter_mut() {
            *slot = 0.0;
        }
    }
}

/// Map one sample to the unsigned byte scale: -1.0 -> 0, 0.0 -> 128,
/// 1.0 -> 255 (clamped).
fn byte_amplitude(sample: f32) -> u8 {
    (128.0 * (1.0 + sample)).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfed_tap_reads_flat_silence() {
        let tap = AnalysisTap::new(TapConfig::default());
        let mut out = vec![0u8; tap.bin_count()];
        tap.read_waveform(&mut out);
        assert_eq!(out.len(), 1024);
        assert!(out.iter().all(|&b| b == 128));
    }

    #[test]
    fn byte_mapping_matches_contract() {
        assert_eq!(byte_amplitude(-1.0), 0);
        assert_eq!(byte_amplitude(0.0), 128);
        assert_eq!(byte_amplitude(1.0), 255);
        assert_eq!(byte_amplitude(0.5), 192);
        assert_eq!(byte_amplitude(-2.0), 0);
        assert_eq!(byte_amplitude(2.0), 255);
    }

    #[test]
    fn read_returns_most_recent_samples_in_order() {
        let tap = AnalysisTap::new(TapConfig {
            window_size: 32,
            ..TapConfig::default()
        });
        let port = tap.port();
        assert!(port.ingest(&[-0.5, 0.0, 0.5]));

        let mut out = [0u8; 3];
        tap.read_waveform(&mut out);
        assert_eq!(out, [64, 128, 192]);
    }

    #[test]
    fn window_wraps_and_keeps_latest() {
        let tap = AnalysisTap::new(TapConfig {
            window_size: 32,
            ..TapConfig::default()
        });
        let port = tap.port();
        // Two windows of silence, then a marker at the very end.
        port.ingest(&vec![0.0; 63]);
        port.ingest(&[1.0]);

        let mut out = [0u8; 2];
        tap.read_waveform(&mut out);
        assert_eq!(out, [128, 255]);
    }

    #[test]
    fn dropping_reader_severs_ports() {
        let tap = AnalysisTap::new(TapConfig::default());
        let port = tap.port();
        assert!(port.is_live());
        assert!(port.ingest(&[0.1]));

        drop(tap);
        assert!(!port.is_live());
        assert!(!port.ingest(&[0.1]));
    }

    #[test]
    fn config_sanitizes_window_and_smoothing() {
        let config = TapConfig {
            window_size: 1000,
            smoothing_time_constant: 1.5,
        }
        .sanitized();
        assert_eq!(config.window_size, 1024);
        assert_eq!(config.smoothing_time_constant, 0.999);

        let config = TapConfig {
            window_size: 0,
            smoothing_time_constant: f32::NAN,
        }
        .sanitized();
        assert_eq!(config.window_size, MIN_WINDOW);
        assert_eq!(config.smoothing_time_constant, 0.8);
    }

    #[test]
    fn bin_count_is_half_the_window() {
        let tap = AnalysisTap::new(TapConfig {
            window_size: 2048,
            ..TapConfig::default()
        });
        assert_eq!(tap.bin_count(), 1024);
    }

    #[test]
    fn spectrum_smoothing_converges_toward_steady_state() {
        let mut tap = AnalysisTap::new(TapConfig {
            window_size: 64,
            smoothing_time_constant: 0.5,
        });
        let port = tap.port();
        port.ingest(&vec![1.0; 64]);

        // DC input concentrates energy in bin 0.
        let mut spectrum = vec![0.0f32; tap.bin_count()];
        tap.read_spectrum(&mut spectrum);
        let first = spectrum[0];
        assert!(first > 0.0);

        tap.read_spectrum(&mut spectrum);
        let second = spectrum[0];
        assert!(second > first);

        let mut last = second;
        for _ in 0..50 {
            tap.read_spectrum(&mut spectrum);
            last = spectrum[0];
        }
        // Steady state: one more read barely moves the estimate.
        tap.read_spectrum(&mut spectrum);
        assert!((spectrum[0] - last).abs() < 1e-3);
    }

    #[test]
    fn smoothing_does_not_touch_waveform_reads() {
        let tap = AnalysisTap::new(TapConfig {
            window_size: 32,
            smoothing_time_constant: 0.999,
        });
        let port = tap.port();
        port.ingest(&[1.0; 32]);

        let mut out = [0u8; 4];
        tap.read_waveform(&mut out);
        // Full amplitude immediately, no exponential ramp.
        assert_eq!(out, [255, 255, 255, 255]);
    }
}
