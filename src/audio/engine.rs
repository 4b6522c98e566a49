//! Tone engine - cpal-backed demo source for the visualizer
//!
//! Owns the output stream and generates a test tone from an
//! [`Oscillator`]. The engine is also an [`AudioSource`]: every block
//! it writes to the device is fanned out to the attached tap ports, so
//! visualizers observe exactly what is being played. Dead ports (reader
//! dropped) are pruned on the next block.
//!
//! The audio callback never blocks: parameters are read with
//! `try_read` and tap fan-out uses `try_lock`, falling back to the
//! previous values or skipping one batch under contention.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::oscillator::{Oscillator, Waveform};
use super::source::{AttachError, AudioSource};
use super::tap::TapPort;

/// Live tone parameters, updated from the UI thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneParams {
    pub waveform: Waveform,
    /// Frequency in Hz.
    pub frequency: f32,
    /// Output volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: 220.0,
            volume: 0.5,
        }
    }
}

/// State shared with the audio thread.
struct EngineShared {
    /// Whether the tone is audible (the stream itself stays warm).
    playing: AtomicBool,
    /// Tone parameters. RwLock for better concurrency - the audio
    /// thread only reads, the main thread writes on UI changes.
    params: RwLock<ToneParams>,
    /// Attached tap ports, fed a copy of every output block.
    taps: Mutex<Vec<TapPort>>,
}

/// Write one output block for any sample format and fan the mono
/// signal out to the taps.
fn write_audio_samples<T: Sample + FromSample<f32>>(
    data: &mut [T],
    channels: usize,
    shared: &EngineShared,
    oscillator: &mut Oscillator,
    mono: &mut Vec<f32>,
    sample_rate: f32,
) {
    let channels = channels.max(1);
    let num_frames = data.len() / channels;
    mono.clear();
    mono.resize(num_frames, 0.0);

    if shared.playing.load(Ordering::Relaxed) {
        // Pick up parameter changes without blocking the callback
        if let Ok(params) = shared.params.try_read() {
            oscillator.waveform = params.waveform;
            oscillator.frequency = params.frequency;
            oscillator.amplitude = params.volume;
        }
        oscillator.fill(mono, sample_rate);
    }

    // Same signal on every channel
    for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
        let value = T::from_sample(sample);
        for ch in frame.iter_mut() {
            *ch = value;
        }
    }

    // Feed the taps what we just played, silence included, and drop
    // ports whose reader went away
    if let Ok(mut taps) = shared.taps.try_lock() {
        taps.retain(|port| port.is_live());
        for port in taps.iter() {
            port.ingest(mono);
        }
    }
}

/// Demo audio source: a test tone through the default output device.
///
/// Manages the cpal audio stream and provides methods for
/// controlling playback.
pub struct ToneEngine {
    /// State shared with the audio callback
    shared: Arc<EngineShared>,

    /// The audio output stream (kept alive to continue playback)
    stream: Option<cpal::Stream>,

    /// Sample rate of the output device
    sample_rate: f32,

    /// Status message
    pub status: String,
}

impl ToneEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(EngineShared {
                playing: AtomicBool::new(false),
                params: RwLock::new(ToneParams::default()),
                taps: Mutex::new(Vec::new()),
            }),
            stream: None,
            sample_rate: 48000.0,
            status: "Ready".to_string(),
        }
    }

    /// Check if the tone is currently audible
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Relaxed)
    }

    /// Sample rate of the output device (default until started)
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn params(&self) -> ToneParams {
        *self
            .shared
            .params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Update tone parameters; the audio thread picks them up on the
    /// next block.
    pub fn set_params(&self, params: ToneParams) {
        *self
            .shared
            .params
            .write()
            .unwrap_or_else(PoisonError::into_inner) = params;
    }

    /// Number of attached taps whose reader is still alive. Prunes
    /// dead ports as a side effect.
    pub fn live_tap_count(&self) -> usize {
        let mut taps = self
            .shared
            .taps
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        taps.retain(|port| port.is_live());
        taps.len()
    }

    /// Start (or unmute) the tone. Builds the output stream on first
    /// use; failures land in `status` and the log.
    pub fn start(&mut self) {
        if self.stream.is_some() {
            self.shared.playing.store(true, Ordering::Relaxed);
            self.status = "Playing".to_string();
            return;
        }

        log::info!("Starting tone engine...");

        let host = cpal::default_host();

        let device = match host.default_output_device() {
            Some(d) => d,
            None => {
                self.status = "Error: No output device found".to_string();
                log::error!("No output device found");
                return;
            }
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using output device: {}", device_name);

        let config = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => {
                self.status = format!("Error getting config: {}", e);
                log::error!("Failed to get default output config: {}", e);
                return;
            }
        };

        self.sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let sample_rate = self.sample_rate;

        let sample_format = config.sample_format();
        log::info!("Audio config: {} Hz, {} ch, {:?}", self.sample_rate, channels, sample_format);

        let stream_result = match sample_format {
            cpal::SampleFormat::F32 => {
                let shared = Arc::clone(&self.shared);
                let mut oscillator = Oscillator::default();
                let mut mono: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        write_audio_samples(
                            data, channels, &shared, &mut oscillator, &mut mono, sample_rate,
                        );
                    },
                    |err| log::error!("Audio stream error: {}", err),
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let shared = Arc::clone(&self.shared);
                let mut oscillator = Oscillator::default();
                let mut mono: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        write_audio_samples(
                            data, channels, &shared, &mut oscillator, &mut mono, sample_rate,
                        );
                    },
                    |err| log::error!("Audio stream error: {}", err),
                    None,
                )
            }
            cpal::SampleFormat::U16 => {
                let shared = Arc::clone(&self.shared);
                let mut oscillator = Oscillator::default();
                let mut mono: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                        write_audio_samples(
                            data, channels, &shared, &mut oscillator, &mut mono, sample_rate,
                        );
                    },
                    |err| log::error!("Audio stream error: {}", err),
                    None,
                )
            }
            format => {
                self.status = format!("Unsupported sample format: {:?}", format);
                log::error!("Unsupported sample format: {:?}", format);
                return;
            }
        };

        match stream_result {
            Ok(s) => {
                if let Err(e) = s.play() {
                    self.status = format!("Error starting stream: {}", e);
                    log::error!("Failed to start stream: {}", e);
                    return;
                }

                self.stream = Some(s);
                self.shared.playing.store(true, Ordering::Relaxed);
                self.status = format!("Playing at {} Hz", self.sample_rate);
                log::info!("Tone started successfully");
            }
            Err(e) => {
                self.status = format!("Error building stream: {}", e);
                log::error!("Failed to build stream: {}", e);
            }
        }
    }

    /// Mute the tone. The stream stays warm and keeps feeding silence
    /// to the taps, so a connected scope flatlines instead of freezing.
    pub fn stop(&mut self) {
        self.shared.playing.store(false, Ordering::Relaxed);
        self.status = "Stopped".to_string();
        log::info!("Tone stopped");
    }

    /// Toggle playback state
    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.start();
        }
    }
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for ToneEngine {
    /// Accepts taps at any time; ports attached before the stream
    /// starts simply read as silence until it runs.
    fn attach_tap(&mut self, port: TapPort) -> Result<(), AttachError> {
        let mut taps = self
            .shared
            .taps
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        taps.retain(|existing| existing.is_live());
        taps.push(port);
        log::info!("Tap attached ({} live)", taps.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tap::{AnalysisTap, TapConfig};

    fn test_shared(playing: bool) -> Arc<EngineShared> {
        Arc::new(EngineShared {
            playing: AtomicBool::new(playing),
            params: RwLock::new(ToneParams {
                waveform: Waveform::Square,
                frequency: 1000.0,
                volume: 1.0,
            }),
            taps: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_block_feeds_attached_taps() {
        let shared = test_shared(true);
        let tap = AnalysisTap::new(TapConfig {
            window_size: 256,
            ..TapConfig::default()
        });
        shared.taps.lock().unwrap().push(tap.port());

        let mut data = vec![0.0f32; 512];
        let mut osc = Oscillator::default();
        let mut mono = Vec::new();
        write_audio_samples(&mut data, 2, &shared, &mut osc, &mut mono, 48000.0);

        let mut out = vec![0u8; 64];
        tap.read_waveform(&mut out);
        // A full-volume square wave pins the bytes away from center.
        assert!(out.iter().any(|&b| b != 128));
    }

    #[test]
    fn test_block_is_silent_when_stopped() {
        let shared = test_shared(false);
        let tap = AnalysisTap::new(TapConfig {
            window_size: 256,
            ..TapConfig::default()
        });
        shared.taps.lock().unwrap().push(tap.port());

        let mut data = vec![1.0f32; 512];
        let mut osc = Oscillator::default();
        let mut mono = Vec::new();
        write_audio_samples(&mut data, 2, &shared, &mut osc, &mut mono, 48000.0);

        assert!(data.iter().all(|&s| s == 0.0));
        let mut out = vec![0u8; 64];
        tap.read_waveform(&mut out);
        assert!(out.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_block_duplicates_mono_across_channels() {
        let shared = test_shared(true);
        let mut data = vec![0.0f32; 128];
        let mut osc = Oscillator::default();
        let mut mono = Vec::new();
        write_audio_samples(&mut data, 2, &shared, &mut osc, &mut mono, 48000.0);

        for frame in data.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn test_block_prunes_dead_ports() {
        let shared = test_shared(true);
        let tap = AnalysisTap::new(TapConfig::default());
        shared.taps.lock().unwrap().push(tap.port());
        drop(tap);

        let mut data = vec![0.0f32; 64];
        let mut osc = Oscillator::default();
        let mut mono = Vec::new();
        write_audio_samples(&mut data, 2, &shared, &mut osc, &mut mono, 48000.0);

        assert_eq!(shared.taps.lock().unwrap().len(), 0);
    }

    #[test]
    fn test_attach_tap_prunes_dead_readers() {
        let mut engine = ToneEngine::new();
        let first = AnalysisTap::new(TapConfig::default());
        engine.attach_tap(first.port()).unwrap();
        assert_eq!(engine.live_tap_count(), 1);

        drop(first);
        let second = AnalysisTap::new(TapConfig::default());
        engine.attach_tap(second.port()).unwrap();
        assert_eq!(engine.live_tap_count(), 1);
    }

    #[test]
    fn test_params_round_trip() {
        let engine = ToneEngine::new();
        let params = ToneParams {
            waveform: Waveform::Triangle,
            frequency: 880.0,
            volume: 0.3,
        };
        engine.set_params(params);
        assert_eq!(engine.params(), params);
    }
}
