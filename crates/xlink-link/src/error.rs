/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The exact (component, message, handler) registration already exists.
    #[error("handler already registered for component {component:#04x} message {message:#04x}")]
    DuplicateRegistration { component: u8, message: u8 },

    /// No handler bucket exists for the component.
    #[error("no handlers registered for component {0:#04x}")]
    ComponentNotFound(u8),

    /// The component exists but the exact registration does not.
    #[error("handler not registered for component {component:#04x} message {message:#04x}")]
    HandlerNotFound { component: u8, message: u8 },

    /// A registry bound was reached or an allocation failed.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No transmit buffer could be obtained from the transport.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[source] xlink_transport::TransportError),

    /// The transport refused a populated frame.
    #[error("transport error: {0}")]
    Transport(#[source] xlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xlink_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, LinkError>;
