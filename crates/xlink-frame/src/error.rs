/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The destination buffer cannot hold the encoded frame.
    #[error("buffer too small for frame ({needed} bytes needed, {available} available)")]
    BufferTooSmall { needed: usize, available: usize },

    /// A received frame failed CRC verification.
    #[error("checksum mismatch (computed {computed:#06x}, received {received:#06x})")]
    ChecksumMismatch { computed: u16, received: u16 },

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
