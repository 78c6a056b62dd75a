use std::sync::Arc;

use crate::error::Result;
use crate::pool::TxBuffer;

/// The capabilities a link needs from the physical layer beneath it.
///
/// Implementations must be callable from several threads at once: a link
/// may transmit from a dispatch thread while another thread registers
/// handlers or feeds received bytes.
pub trait Transport: Send + Sync {
    /// Obtain a zero-filled buffer of exactly `len` bytes.
    ///
    /// Fails with [`TransportError::Unavailable`](crate::TransportError::Unavailable)
    /// when no buffer can be handed out right now.
    fn alloc(&self, len: usize) -> Result<TxBuffer>;

    /// Queue a populated buffer for transmission.
    ///
    /// Must not wait for the bytes to leave the wire.
    fn enqueue(&self, buf: TxBuffer) -> Result<()>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn alloc(&self, len: usize) -> Result<TxBuffer> {
        (**self).alloc(len)
    }

    fn enqueue(&self, buf: TxBuffer) -> Result<()> {
        (**self).enqueue(buf)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn alloc(&self, len: usize) -> Result<TxBuffer> {
        (**self).alloc(len)
    }

    fn enqueue(&self, buf: TxBuffer) -> Result<()> {
        (**self).enqueue(buf)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
