/// Errors raised by transport capabilities.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No transmit buffer could be obtained (pool exhausted or link offline).
    #[error("no transmit buffer available for {len} bytes")]
    Unavailable { len: usize },

    /// The requested buffer is larger than a pool slot.
    #[error("transmit buffer too large ({len} bytes, max {max})")]
    BufferTooLarge { len: usize, max: usize },

    /// The send-queue capability refused the buffer.
    #[error("send queue rejected buffer: {0}")]
    Rejected(String),

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
