//! Render module - surface rasterization and the waveform scope
//!
//! This module provides:
//! - RGBA raster surface with a logical/physical pixel split
//! - Frame scheduling contract between renderer and host
//! - The waveform scope renderer itself

pub mod scheduler;
pub mod surface;
pub mod waveform;

// Re-export public types
pub use scheduler::{FrameHandle, FrameScheduler, StepScheduler};
pub use surface::{normalized_scale, Color, SharedSurface, Surface};
pub use waveform::{ScopeError, ScopeEvent, ScopeStyle, WaveformRenderer};
