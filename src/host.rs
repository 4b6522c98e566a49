//! Host environment - surface registry and resize notifications
//!
//! The shell (windowing layer, test harness) owns a [`SurfaceHost`]. It
//! registers drawing surfaces under string ids, tracks the current
//! device pixel ratio, and broadcasts ratio changes to subscribers.
//!
//! Listeners are explicit resources: [`SurfaceHost::subscribe_resize`]
//! returns a [`ListenerId`] and the subscriber is expected to
//! unsubscribe when it goes away, otherwise the callback (and whatever
//! it captures) lives as long as the host.

use std::collections::HashMap;

use crate::render::surface::{normalized_scale, SharedSurface, Surface};

/// Identifies one resize subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

/// Payload delivered to resize listeners.
#[derive(Clone, Copy, Debug)]
pub struct ResizeEvent {
    /// The host's device pixel ratio after the change.
    pub scale_factor: f32,
}

type ResizeListener = Box<dyn FnMut(&ResizeEvent) + Send>;

/// Registry of named surfaces plus a resize notification bus.
pub struct SurfaceHost {
    surfaces: HashMap<String, SharedSurface>,
    scale_factor: f32,
    listeners: Vec<(ListenerId, ResizeListener)>,
    next_listener: u64,
}

impl SurfaceHost {
    /// Host with a device pixel ratio of 1.0.
    pub fn new() -> Self {
        Self::with_scale_factor(1.0)
    }

    /// Host with an explicit device pixel ratio (clamped like every
    /// other ratio in the crate).
    pub fn with_scale_factor(scale_factor: f32) -> Self {
        Self {
            surfaces: HashMap::new(),
            scale_factor: normalized_scale(scale_factor),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Create and register a surface under `id`, sized with the host's
    /// current ratio. Replaces any surface previously under that id.
    pub fn insert_surface(
        &mut self,
        id: impl Into<String>,
        logical_w: f32,
        logical_h: f32,
    ) -> SharedSurface {
        let id = id.into();
        let surface = Surface::shared(logical_w, logical_h, self.scale_factor);
        if self
            .surfaces
            .insert(id.clone(), SharedSurface::clone(&surface))
            .is_some()
        {
            log::warn!("surface '{}' replaced in host registry", id);
        }
        surface
    }

    /// Look up a surface by id.
    pub fn surface(&self, id: &str) -> Option<SharedSurface> {
        self.surfaces.get(id).cloned()
    }

    /// Resize a registered surface, keeping it on the host's current
    /// ratio. Returns `false` for unknown ids.
    pub fn set_logical_size(&mut self, id: &str, logical_w: f32, logical_h: f32) -> bool {
        let Some(surface) = self.surfaces.get(id) else {
            return false;
        };
        if let Ok(mut surface) = surface.lock() {
            surface.rescale(self.scale_factor);
            surface.set_logical_size(logical_w, logical_h);
        }
        true
    }

    /// Change the device pixel ratio and notify every listener.
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        let scale_factor = normalized_scale(scale_factor);
        if scale_factor == self.scale_factor {
            return;
        }
        self.scale_factor = scale_factor;
        log::info!("device pixel ratio changed to {scale_factor}");
        self.notify_resize();
    }

    /// Subscribe to ratio changes. Keep the returned id; it is the only
    /// way to remove the listener again.
    pub fn subscribe_resize(
        &mut self,
        listener: impl FnMut(&ResizeEvent) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` when the id was already gone.
    pub fn unsubscribe_resize(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify_resize(&mut self) {
        let event = ResizeEvent {
            scale_factor: self.scale_factor,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl Default for SurfaceHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn registry_inserts_and_finds_surfaces() {
        let mut host = SurfaceHost::new();
        host.insert_surface("scope", 100.0, 50.0);
        assert!(host.surface("scope").is_some());
        assert!(host.surface("missing").is_none());
    }

    #[test]
    fn inserted_surface_uses_host_ratio() {
        let mut host = SurfaceHost::with_scale_factor(2.0);
        let surface = host.insert_surface("scope", 100.0, 50.0);
        assert_eq!(surface.lock().unwrap().physical_size(), (200, 100));
    }

    #[test]
    fn set_logical_size_keeps_host_ratio() {
        let mut host = SurfaceHost::with_scale_factor(2.0);
        let surface = host.insert_surface("scope", 10.0, 10.0);
        assert!(host.set_logical_size("scope", 30.0, 20.0));
        assert_eq!(surface.lock().unwrap().physical_size(), (60, 40));
        assert!(!host.set_logical_size("missing", 1.0, 1.0));
    }

    #[test]
    fn scale_change_notifies_listeners() {
        let mut host = SurfaceHost::new();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);
        host.subscribe_resize(move |event| {
            assert_eq!(event.scale_factor, 2.0);
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        host.set_scale_factor(2.0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // Same ratio again: no notification.
        host.set_scale_factor(2.0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_listener() {
        let mut host = SurfaceHost::new();
        let a = host.subscribe_resize(|_| {});
        let b = host.subscribe_resize(|_| {});
        assert_eq!(host.listener_count(), 2);

        assert!(host.unsubscribe_resize(a));
        assert_eq!(host.listener_count(), 1);
        assert!(!host.unsubscribe_resize(a));
        assert!(host.unsubscribe_resize(b));
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn garbage_ratio_is_normalized() {
        let mut host = SurfaceHost::with_scale_factor(f32::NAN);
        assert_eq!(host.scale_factor(), 1.0);
        host.set_scale_factor(-3.0);
        assert_eq!(host.scale_factor(), 1.0);
    }
}
