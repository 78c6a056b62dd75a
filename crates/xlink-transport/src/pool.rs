use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;

use crate::error::{Result, TransportError};

/// Largest frame the protocol can produce: 4 header bytes, 250 payload bytes, 2 CRC bytes.
pub const DEFAULT_SLOT_CAPACITY: usize = 256;

/// Default number of transmit buffers in flight.
pub const DEFAULT_SLOTS: usize = 8;

/// Sizing of a [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of buffers handed out at the same time.
    pub slots: usize,
    /// Capacity of each buffer in bytes.
    pub slot_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            slot_capacity: DEFAULT_SLOT_CAPACITY,
        }
    }
}

/// Bounded pool of reusable transmit buffers.
///
/// Memory is allocated lazily, at most `slots` times; after that every
/// buffer is recycled. A [`TxBuffer`] goes back to its pool when dropped,
/// which for a queued buffer means once the bytes have been written out.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

struct PoolState {
    free: Vec<BytesMut>,
    outstanding: usize,
}

impl BufferPool {
    /// Create a pool with explicit sizing.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    free: Vec::with_capacity(config.slots),
                    outstanding: 0,
                }),
            }),
        }
    }

    /// Hand out a zero-filled buffer of exactly `len` bytes.
    pub fn alloc(&self, len: usize) -> Result<TxBuffer> {
        let config = self.inner.config;
        if len > config.slot_capacity {
            return Err(TransportError::BufferTooLarge {
                len,
                max: config.slot_capacity,
            });
        }

        let mut storage = {
            let mut state = self.inner.lock();
            let storage = match state.free.pop() {
                Some(storage) => storage,
                None if state.outstanding < config.slots => {
                    BytesMut::with_capacity(config.slot_capacity)
                }
                None => return Err(TransportError::Unavailable { len }),
            };
            state.outstanding += 1;
            storage
        };

        storage.clear();
        storage.resize(len, 0);

        Ok(TxBuffer {
            storage,
            pool: Some(Arc::clone(&self.inner)),
        })
    }

    /// Number of buffers that can be handed out right now.
    pub fn available(&self) -> usize {
        let state = self.inner.lock();
        self.inner.config.slots.saturating_sub(state.outstanding)
    }

    /// Pool sizing.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.inner.config)
            .field("available", &self.available())
            .finish()
    }
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, storage: BytesMut) {
        let mut state = self.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        state.free.push(storage);
    }
}

/// A writable transmit buffer.
///
/// Dereferences to `[u8]` of the length it was allocated with.
pub struct TxBuffer {
    storage: BytesMut,
    pool: Option<Arc<PoolInner>>,
}

impl TxBuffer {
    /// Allocate a buffer that does not belong to any pool.
    pub fn unpooled(len: usize) -> Self {
        let mut storage = BytesMut::with_capacity(len);
        storage.resize(len, 0);
        Self {
            storage,
            pool: None,
        }
    }

    /// Whether the buffer will be recycled into a pool on drop.
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }
}

impl Deref for TxBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.storage
    }
}

impl DerefMut for TxBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.storage
    }
}

impl Drop for TxBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.storage));
        }
    }
}

impl std::fmt::Debug for TxBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxBuffer")
            .field("len", &self.storage.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}
