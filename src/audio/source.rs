//! Audio source capability - what a source must offer to be visualized

use thiserror::Error;

use super::tap::TapPort;

/// Why a source refused a tap.
#[derive(Error, Debug)]
pub enum AttachError {
    /// The source has no audio path to observe (device gone, stream
    /// failed, context torn down).
    #[error("audio source unavailable: {0}")]
    Unavailable(String),
}

/// A node in a caller-owned audio graph that can host passive taps.
///
/// Attaching a tap must not alter the source's signal or its existing
/// downstream connections; the source simply feeds every live port a
/// copy of the samples it emits. Sources are expected to prune ports
/// whose reader half has been dropped (see [`TapPort::is_live`]) the
/// next time they touch their port list.
pub trait AudioSource {
    /// Register a tap port so it receives the source's output.
    fn attach_tap(&mut self, port: TapPort) -> Result<(), AttachError>;
}
