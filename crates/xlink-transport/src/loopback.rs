use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::pool::{BufferPool, PoolConfig, TxBuffer};
use crate::traits::Transport;

/// In-memory transport that records every queued frame.
///
/// Useful for wiring two links back to back and for driving a link without
/// hardware. The link can be taken offline to simulate a transport with no
/// buffers to give.
#[derive(Debug)]
pub struct LoopbackTransport {
    pool: BufferPool,
    sent: Mutex<VecDeque<Bytes>>,
    online: AtomicBool,
}

impl LoopbackTransport {
    /// Create a loopback transport with the default buffer pool.
    pub fn new() -> Self {
        Self::with_pool(PoolConfig::default())
    }

    /// Create a loopback transport with explicit pool sizing.
    pub fn with_pool(config: PoolConfig) -> Self {
        Self {
            pool: BufferPool::new(config),
            sent: Mutex::new(VecDeque::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Bring the transport on or offline. Offline transports hand out no buffers.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Remove and return every recorded frame, oldest first.
    pub fn take_sent(&self) -> Vec<Bytes> {
        self.lock().drain(..).collect()
    }

    /// Remove every recorded frame and return them as one byte stream.
    pub fn take_wire(&self) -> Vec<u8> {
        self.lock().drain(..).flat_map(|frame| frame.to_vec()).collect()
    }

    /// Number of frames recorded and not yet taken.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn alloc(&self, len: usize) -> Result<TxBuffer> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable { len });
        }
        self.pool.alloc(len)
    }

    fn enqueue(&self, buf: TxBuffer) -> Result<()> {
        trace!(len = buf.len(), "loopback frame queued");
        self.lock().push_back(Bytes::copy_from_slice(&buf));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_frames_in_order() {
        let transport = LoopbackTransport::new();
        for byte in [7u8, 8] {
            let mut buf = transport.alloc(1).unwrap();
            buf[0] = byte;
            transport.enqueue(buf).unwrap();
        }

        assert_eq!(transport.pending(), 2);
        let sent = transport.take_sent();
        assert_eq!(sent[0].as_ref(), &[7]);
        assert_eq!(sent[1].as_ref(), &[8]);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn take_wire_concatenates() {
        let transport = LoopbackTransport::new();
        let mut a = transport.alloc(2).unwrap();
        a.copy_from_slice(&[1, 2]);
        transport.enqueue(a).unwrap();
        let mut b = transport.alloc(1).unwrap();
        b[0] = 3;
        transport.enqueue(b).unwrap();

        assert_eq!(transport.take_wire(), vec![1, 2, 3]);
    }

    #[test]
    fn offline_transport_has_no_buffers() {
        let transport = LoopbackTransport::new();
        transport.set_online(false);
        assert!(matches!(
            transport.alloc(4),
            Err(TransportError::Unavailable { len: 4 })
        ));

        transport.set_online(true);
        assert!(transport.alloc(4).is_ok());
    }

    #[test]
    fn queued_buffer_is_released_to_pool() {
        let transport = LoopbackTransport::with_pool(PoolConfig {
            slots: 1,
            slot_capacity: 16,
        });
        let buf = transport.alloc(16).unwrap();
        transport.enqueue(buf).unwrap();

        assert!(transport.alloc(16).is_ok());
    }
}
