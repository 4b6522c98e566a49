//! Frame scheduling - the contract between the renderer and its host
//!
//! The renderer never spins its own loop. It asks a [`FrameScheduler`]
//! for the next frame callback and the host decides when that frame
//! actually fires (on vsync, on a timer, or immediately in tests).
//!
//! Contract:
//! - `request_frame` returns an opaque handle; handles are unique for
//!   the lifetime of the scheduler and never reused.
//! - `cancel_frame` revokes a not-yet-fired request and reports whether
//!   anything was actually cancelled.
//! - A fired handle is dead: cancelling it returns `false`.

/// Opaque identifier for one scheduled frame callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameHandle(u64);

/// Frame callback scheduling, in the style of a display-synced
/// animation loop.
pub trait FrameScheduler {
    /// Schedule one frame callback and return its handle.
    fn request_frame(&mut self) -> FrameHandle;

    /// Revoke a pending request. Returns `true` if the handle was still
    /// outstanding, `false` if it already fired or was never scheduled.
    fn cancel_frame(&mut self, handle: FrameHandle) -> bool;
}

/// Host-pumped scheduler: the host calls [`StepScheduler::take_due`]
/// once per display frame and feeds the handle back into the renderer.
///
/// Holds at most one outstanding request, which matches a renderer that
/// requests the next frame only from within the current one.
#[derive(Default)]
pub struct StepScheduler {
    next_id: u64,
    due: Option<FrameHandle>,
    requested: u64,
    cancelled: u64,
}

impl StepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the outstanding request, if any. The caller is expected to
    /// fire the frame callback with the returned handle.
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.due.take()
    }

    /// Whether a request is waiting to fire.
    pub fn has_due(&self) -> bool {
        self.due.is_some()
    }

    /// Total requests issued since construction.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Total requests revoked before firing.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for StepScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.requested += 1;
        if let Some(prev) = self.due.replace(handle) {
            // A single-client pump should never stack requests.
            log::warn!("frame request {prev:?} superseded before it fired");
        }
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) -> bool {
        if self.due == Some(handle) {
            self.due = None;
            self.cancelled += 1;
            true
        } else {
            false
        }
    }
}
