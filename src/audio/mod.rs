//! Audio module - analysis taps and the demo tone source
//!
//! This module provides:
//! - Passive analysis tap (time-domain bytes, smoothed spectrum)
//! - The `AudioSource` capability for graph nodes that host taps
//! - Tone oscillator and a cpal-backed demo engine

pub mod engine;
pub mod oscillator;
pub mod source;
pub mod tap;

// Re-export public types
pub use engine::{ToneEngine, ToneParams};
pub use oscillator::{Oscillator, Waveform};
pub use source::{AttachError, AudioSource};
pub use tap::{AnalysisTap, TapConfig, TapPort};
