//! wavescope - oscilloscope-style waveform visualization over passive
//! audio taps
//!
//! The crate splits the problem in three:
//!
//! - [`audio`]: an [`audio::AnalysisTap`] captures the samples a source
//!   emits without altering its signal path, and exposes them as the
//!   byte waveform the scope draws (plus a smoothed spectrum).
//! - [`render`]: a [`render::WaveformRenderer`] redraws a shared
//!   [`render::Surface`] once per display frame, pacing itself through
//!   the [`render::FrameScheduler`] its host provides.
//! - [`host`]: a [`host::SurfaceHost`] names surfaces, carries the
//!   device pixel ratio, and broadcasts ratio changes.
//!
//! Rendering never panics into the audio path: every failure is logged,
//! optionally reported through an event sink, and turns the operation
//! into a no-op.
//!
//! ```
//! use wavescope::audio::{AttachError, AudioSource, TapPort};
//! use wavescope::host::SurfaceHost;
//! use wavescope::render::{StepScheduler, WaveformRenderer};
//!
//! // Any graph node that accepts tap ports can be visualized.
//! struct Silence(Vec<TapPort>);
//!
//! impl AudioSource for Silence {
//!     fn attach_tap(&mut self, port: TapPort) -> Result<(), AttachError> {
//!         self.0.push(port);
//!         Ok(())
//!     }
//! }
//!
//! let mut host = SurfaceHost::new();
//! host.insert_surface("scope", 320.0, 180.0);
//!
//! let mut scheduler = StepScheduler::new();
//! let mut renderer = WaveformRenderer::new();
//! renderer.initialize(&mut host, "scope");
//!
//! let mut source = Silence(Vec::new());
//! renderer.connect(&mut source, &mut scheduler);
//! assert!(renderer.is_active());
//!
//! // The host pump fires whatever frame the renderer asked for.
//! let frame = scheduler.take_due().unwrap();
//! renderer.on_frame(frame, &mut scheduler);
//! assert!(scheduler.has_due());
//! ```

pub mod audio;
pub mod host;
pub mod render;
pub mod settings;

pub use audio::{AnalysisTap, AttachError, AudioSource, TapConfig, TapPort, ToneEngine, ToneParams};
pub use host::{ListenerId, ResizeEvent, SurfaceHost};
pub use render::{
    Color, FrameHandle, FrameScheduler, ScopeError, ScopeEvent, ScopeStyle, SharedSurface,
    StepScheduler, Surface, WaveformRenderer,
};
pub use settings::AppSettings;
