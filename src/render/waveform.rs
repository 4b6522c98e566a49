//! Waveform scope - time-domain trace of a live audio tap
//!
//! The renderer owns an [`AnalysisTap`] attached to a caller-owned
//! audio source and redraws a named surface once per display frame:
//!
//! - background (full overwrite, so the previous frame never ghosts)
//! - graticule: 5 horizontal and 10 vertical low-opacity lines
//! - the waveform polyline, one vertex per tap bin plus a closing
//!   vertex at the horizontal center of the right edge
//! - a center reference line on top
//!
//! ## Failure policy
//!
//! Drawing sits next to the audio path, so nothing here panics or
//! returns errors to the caller: failures are logged and reported to
//! the optional event sink, and the operation becomes a no-op.
//!
//! ## Lifecycle
//!
//! Uninitialized -> `initialize` -> Initialized -> `connect` ->
//! Connected (active). `stop`/`resume` toggle the render loop without
//! touching the tap; `disconnect` severs the tap and returns to
//! Initialized; `dispose` releases the surface binding and the resize
//! listener as well.

use std::sync::{Arc, PoisonError};

use thiserror::Error;

use crate::audio::source::{AttachError, AudioSource};
use crate::audio::tap::{AnalysisTap, TapConfig};
use crate::host::{ListenerId, SurfaceHost};

use super::scheduler::{FrameHandle, FrameScheduler};
use super::surface::{Color, SharedSurface, Surface};

/// Horizontal graticule line count.
const GRID_ROWS: usize = 5;
/// Vertical graticule line count.
const GRID_COLS: usize = 10;
/// Alpha for graticule lines.
const GRID_ALPHA: u8 = 60;
/// Alpha for the center reference line.
const AXIS_ALPHA: u8 = 150;
/// Logical width of graticule lines.
const GRID_LINE_WIDTH: f32 = 0.5;
/// Logical width of the center reference line.
const AXIS_LINE_WIDTH: f32 = 1.0;

/// Display settings for the scope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScopeStyle {
    /// Waveform color (graticule and center line derive from it at
    /// lower alpha)
    pub stroke: Color,

    /// Background color
    pub background: Color,

    /// Waveform line thickness in logical pixels
    pub stroke_width: f32,

    /// Whether to draw the graticule
    pub show_grid: bool,
}

impl Default for ScopeStyle {
    fn default() -> Self {
        Self {
            stroke: Color::rgb(100, 255, 100), // Phosphor green
            background: Color::rgb(10, 20, 10),
            stroke_width: 2.0,
            show_grid: true,
        }
    }
}

/// Why a renderer operation turned into a no-op.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("surface '{id}' not found in host registry")]
    SurfaceNotFound { id: String },

    #[error("renderer is not initialized")]
    NotInitialized,

    #[error("audio source rejected the tap: {0}")]
    SourceUnavailable(#[from] AttachError),
}

/// Lifecycle notifications for an optional observer.
///
/// Everything here is also logged; the sink exists so embedding code
/// can surface faults in its own UI without parsing logs.
#[derive(Debug)]
pub enum ScopeEvent {
    Initialized,
    Connected,
    Stopped,
    Resumed,
    Disconnected,
    Disposed,
    /// A frame fired while the surface had no drawable area. The loop
    /// keeps running and retries next frame.
    FrameSkipped { width: f32, height: f32 },
    Fault(ScopeError),
}

type EventSink = Box<dyn FnMut(&ScopeEvent) + Send>;

/// Oscilloscope-style waveform visualizer over a passive audio tap.
pub struct WaveformRenderer {
    tap_config: TapConfig,
    style: ScopeStyle,

    /// Bound drawing surface, shared with the presenting shell
    surface: Option<SharedSurface>,
    surface_id: Option<String>,
    resize_listener: Option<ListenerId>,

    /// Analysis tap; `Some` while connected. Dropping it severs every
    /// port the source holds.
    tap: Option<AnalysisTap>,

    /// Whether the render loop is running
    active: bool,
    /// Handle of the frame we are waiting for
    pending: Option<FrameHandle>,

    /// Byte snapshot reused every frame
    frame: Vec<u8>,

    sink: Option<EventSink>,
}

impl WaveformRenderer {
    /// Renderer with the default analysis window (2048 samples) and
    /// style.
    pub fn new() -> Self {
        Self::with_tap_config(TapConfig::default())
    }

    pub fn with_tap_config(tap_config: TapConfig) -> Self {
        Self {
            tap_config: tap_config.sanitized(),
            style: ScopeStyle::default(),
            surface: None,
            surface_id: None,
            resize_listener: None,
            tap: None,
            active: false,
            pending: None,
            frame: Vec::new(),
            sink: None,
        }
    }

    /// Install an observer for lifecycle events and faults.
    pub fn set_event_sink(&mut self, sink: impl FnMut(&ScopeEvent) + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.tap.is_some()
    }

    /// Whether the render loop is currently scheduled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Handle of the frame request we are waiting for, if any.
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn style(&self) -> &ScopeStyle {
        &self.style
    }

    /// Replace the whole style. Applies from the next rendered frame.
    pub fn set_style(&mut self, style: ScopeStyle) {
        self.style = style;
    }

    /// Change waveform and background colors. Applies from the next
    /// rendered frame; an inactive scope keeps its last pixels until
    /// resumed.
    pub fn set_colors(&mut self, stroke: Color, background: Color) {
        self.style.stroke = stroke;
        self.style.background = background;
        log::debug!("scope colors changed");
    }

    /// Analysis parameters used for the next `connect`.
    pub fn tap_config(&self) -> TapConfig {
        self.tap_config
    }

    /// Change analysis parameters for future connects. A live tap
    /// keeps the window it was created with until reconnected.
    pub fn set_tap_config(&mut self, tap_config: TapConfig) {
        self.tap_config = tap_config.sanitized();
    }

    /// The analysis tap, for direct reads (e.g. spectrum data) while
    /// connected.
    pub fn analysis(&self) -> Option<&AnalysisTap> {
        self.tap.as_ref()
    }

    pub fn analysis_mut(&mut self) -> Option<&mut AnalysisTap> {
        self.tap.as_mut()
    }

    /// Bind the renderer to a surface registered in `host` and start
    /// tracking the host's device pixel ratio.
    ///
    /// Fails (logged, no panic) when the id is unknown; the renderer
    /// then stays unusable until a later `initialize` succeeds. Calling
    /// this while a source is connected is refused; disconnect first.
    pub fn initialize(&mut self, host: &mut SurfaceHost, surface_id: &str) {
        if self.tap.is_some() {
            log::warn!("initialize ignored while a source is connected");
            return;
        }
        if let Some(listener) = self.resize_listener.take() {
            host.unsubscribe_resize(listener);
        }
        self.surface = None;
        self.surface_id = None;

        let Some(surface) = host.surface(surface_id) else {
            self.fail(ScopeError::SurfaceNotFound {
                id: surface_id.to_string(),
            });
            return;
        };

        // Bring the surface onto the host's ratio immediately, then
        // follow changes through the resize bus.
        if let Ok(mut canvas) = surface.lock() {
            canvas.rescale(host.scale_factor());
        }
        let weak = Arc::downgrade(&surface);
        let listener = host.subscribe_resize(move |event| {
            if let Some(surface) = weak.upgrade() {
                if let Ok(mut canvas) = surface.lock() {
                    canvas.rescale(event.scale_factor);
                }
            }
        });

        self.surface = Some(surface);
        self.surface_id = Some(surface_id.to_string());
        self.resize_listener = Some(listener);
        log::info!("scope bound to surface '{}'", surface_id);
        self.emit(ScopeEvent::Initialized);
    }

    /// Attach a tap to `source` and start the render loop.
    ///
    /// The source keeps all of its existing outputs; the tap only
    /// observes. Connecting while already connected severs the old tap
    /// first. On failure (not initialized, source refused) the call is
    /// a logged no-op and the previous state is kept.
    pub fn connect(&mut self, source: &mut dyn AudioSource, scheduler: &mut dyn FrameScheduler) {
        if self.surface.is_none() {
            self.fail(ScopeError::NotInitialized);
            return;
        }
        if self.tap.is_some() {
            log::info!("scope reconnecting; dropping previous tap");
            self.disconnect(scheduler);
        }

        let tap = AnalysisTap::new(self.tap_config);
        match source.attach_tap(tap.port()) {
            Ok(()) => {
                self.frame.clear();
                self.frame.resize(tap.bin_count(), 128);
                self.tap = Some(tap);
                self.active = true;
                self.pending = Some(scheduler.request_frame());
                log::info!(
                    "scope connected ({} bins per frame)",
                    self.frame.len()
                );
                self.emit(ScopeEvent::Connected);
            }
            Err(e) => {
                self.fail(ScopeError::SourceUnavailable(e));
            }
        }
    }

    /// Render one frame and request the next.
    ///
    /// Drives the loop: the host pump calls this with the handle its
    /// scheduler reported due. Handles that are not the one we are
    /// waiting for (already cancelled, superseded) are ignored.
    pub fn on_frame(&mut self, fired: FrameHandle, scheduler: &mut dyn FrameScheduler) {
        if self.pending != Some(fired) {
            log::trace!("ignoring stale frame {fired:?}");
            return;
        }
        self.pending = None;

        let Some(tap) = self.tap.as_ref() else {
            return;
        };
        tap.read_waveform(&mut self.frame);

        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let mut canvas = surface.lock().unwrap_or_else(PoisonError::into_inner);
        let (width, height) = canvas.logical_size();
        if width <= 0.0 || height <= 0.0 {
            drop(canvas);
            log::debug!("skipping frame: surface is {width}x{height}");
            self.emit(ScopeEvent::FrameSkipped { width, height });
            // Keep the loop alive so a later resize picks back up.
            self.pending = Some(scheduler.request_frame());
            return;
        }

        self.draw_frame(&mut canvas, width, height);
        drop(canvas);

        self.pending = Some(scheduler.request_frame());
    }

    /// Stop the render loop, cancel the outstanding frame request, and
    /// clear the surface to the background color. The tap stays
    /// attached. Idempotent.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if !self.active {
            log::debug!("stop: render loop already inactive");
            return;
        }
        self.active = false;
        if let Some(handle) = self.pending.take() {
            if !scheduler.cancel_frame(handle) {
                log::debug!("frame {handle:?} already fired before cancel");
            }
        }
        if let Some(surface) = self.surface.as_ref() {
            let mut canvas = surface.lock().unwrap_or_else(PoisonError::into_inner);
            canvas.fill(self.style.background);
        }
        log::info!("scope stopped");
        self.emit(ScopeEvent::Stopped);
    }

    /// Restart the render loop after `stop`. No-op unless a source is
    /// connected and the loop is inactive.
    pub fn resume(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.tap.is_none() {
            log::warn!("resume ignored: no source connected");
            return;
        }
        if self.active {
            log::debug!("resume: render loop already active");
            return;
        }
        self.active = true;
        self.pending = Some(scheduler.request_frame());
        log::info!("scope resumed");
        self.emit(ScopeEvent::Resumed);
    }

    /// Stop the loop and sever the tap. The source notices the dead
    /// port and prunes it; the surface binding stays for a later
    /// `connect`.
    pub fn disconnect(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.tap.is_none() {
            log::debug!("disconnect: no source attached");
            return;
        }
        self.stop(scheduler);
        self.tap = None;
        log::info!("scope disconnected");
        self.emit(ScopeEvent::Disconnected);
    }

    /// Fully release the renderer: disconnect, drop the resize
    /// listener, and unbind the surface. The renderer returns to the
    /// uninitialized state and can be re-initialized later.
    pub fn dispose(&mut self, host: &mut SurfaceHost, scheduler: &mut dyn FrameScheduler) {
        self.disconnect(scheduler);
        if let Some(listener) = self.resize_listener.take() {
            if !host.unsubscribe_resize(listener) {
                log::debug!("resize listener was already gone");
            }
        }
        self.surface = None;
        self.surface_id = None;
        log::info!("scope disposed");
        self.emit(ScopeEvent::Disposed);
    }

    /// Paint one complete frame: background, graticule, waveform
    /// polyline, center reference line.
    fn draw_frame(&self, canvas: &mut Surface, width: f32, height: f32) {
        canvas.fill(self.style.background);

        if self.style.show_grid {
            let grid = self.style.stroke.with_alpha(GRID_ALPHA);
            let (columns, rows) = grid_positions(width, height);
            for x in columns {
                canvas.stroke_line((x, 0.0), (x, height), grid, GRID_LINE_WIDTH);
            }
            for y in rows {
                canvas.stroke_line((0.0, y), (width, y), grid, GRID_LINE_WIDTH);
            }
        }

        let points = trace_points(&self.frame, width, height);
        for segment in points.windows(2) {
            canvas.stroke_line(segment[0], segment[1], self.style.stroke, self.style.stroke_width);
        }

        let axis = self.style.stroke.with_alpha(AXIS_ALPHA);
        let mid = height / 2.0;
        canvas.stroke_line((0.0, mid), (width, mid), axis, AXIS_LINE_WIDTH);
    }

    fn fail(&mut self, error: ScopeError) {
        log::error!("{error}");
        self.emit(ScopeEvent::Fault(error));
    }

    fn emit(&mut self, event: ScopeEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink(&event);
        }
    }
}

impl Default for WaveformRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a byte snapshot to polyline vertices.
///
/// Sample `i` lands at `x = i * width / n`; its byte value `v` maps to
/// `y = (v / 128) * height / 2`, so 128 (silence) sits on the vertical
/// center. One closing vertex at `(width, height / 2)` brings the trace
/// home to the right edge.
pub(crate) fn trace_points(samples: &[u8], width: f32, height: f32) -> Vec<(f32, f32)> {
    let mut points = Vec::with_capacity(samples.len() + 1);
    if !samples.is_empty() {
        let slice_width = width / samples.len() as f32;
        for (i, &value) in samples.iter().enumerate() {
            let x = i as f32 * slice_width;
            let y = (f32::from(value) / 128.0) * height / 2.0;
            points.push((x, y));
        }
    }
    points.push((width, height / 2.0));
    points
}

/// Graticule line positions: 10 vertical columns and 5 horizontal
/// rows, edges included.
pub(crate) fn grid_positions(width: f32, height: f32) -> (Vec<f32>, Vec<f32>) {
    let columns = (0..GRID_COLS)
        .map(|k| k as f32 * width / (GRID_COLS - 1) as f32)
        .collect();
    let rows = (0..GRID_ROWS)
        .map(|k| k as f32 * height / (GRID_ROWS - 1) as f32)
        .collect();
    (columns, rows)
}
