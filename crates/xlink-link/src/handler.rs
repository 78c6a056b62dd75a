use std::sync::Arc;

use xlink_frame::Frame;

/// Receives validated frames for the (component, message) pairs it is registered under.
///
/// Whatever context a handler needs is captured by the implementing value
/// itself. Handlers run on the dispatching thread with no link lock held,
/// so they may send frames or change registrations.
pub trait Handler: Send + Sync + 'static {
    /// Handle one frame.
    fn handle(&self, frame: &Frame);
}

impl<F> Handler for F
where
    F: Fn(&Frame) + Send + Sync + 'static,
{
    fn handle(&self, frame: &Frame) {
        self(frame)
    }
}

/// Shared handle to a registered handler.
///
/// Registration identity is the allocation: two clones of the same
/// `HandlerRef` are the same registration, two separately created handlers
/// never are, even if they wrap identical code.
pub type HandlerRef = Arc<dyn Handler>;

/// Wrap a closure as a [`HandlerRef`].
pub fn handler<F>(f: F) -> HandlerRef
where
    F: Fn(&Frame) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
