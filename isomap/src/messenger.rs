//! Redraw notifications from the map to its front-end.

use maybe_sync::{MaybeSend, MaybeSync};

/// Notifies the front-end that the map changed and must be drawn again.
pub trait Messenger: MaybeSend + MaybeSync {
    /// Asks for a new frame.
    fn request_redraw(&self);
}
