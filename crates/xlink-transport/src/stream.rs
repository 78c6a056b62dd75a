use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::pool::{BufferPool, PoolConfig, TxBuffer};
use crate::traits::Transport;

/// Transport over any blocking `Write` stream (serial port handle, pipe, socket).
///
/// Queued buffers are written by a dedicated writer thread, so
/// [`Transport::enqueue`] returns as soon as the buffer is queued. Dropping
/// the transport closes the queue, lets the writer drain what is already
/// queued, and joins it.
pub struct StreamTransport {
    pool: BufferPool,
    queue: Option<Sender<TxBuffer>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<WriterCounters>,
}

#[derive(Default)]
struct WriterCounters {
    bytes_written: AtomicU64,
    write_errors: AtomicU64,
}

impl StreamTransport {
    /// Start a writer thread for `writer` with the default buffer pool.
    pub fn spawn<W>(writer: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        Self::spawn_with_pool(writer, PoolConfig::default())
    }

    /// Start a writer thread for `writer` with explicit pool sizing.
    pub fn spawn_with_pool<W>(writer: W, config: PoolConfig) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (queue, rx) = mpsc::channel();
        let counters = Arc::new(WriterCounters::default());

        let worker = std::thread::Builder::new()
            .name("xlink-tx".to_string())
            .spawn({
                let counters = Arc::clone(&counters);
                move || drain_queue(writer, rx, &counters)
            })?;

        debug!(slots = config.slots, "stream transport writer started");

        Ok(Self {
            pool: BufferPool::new(config),
            queue: Some(queue),
            worker: Some(worker),
            counters,
        })
    }

    /// Total bytes successfully written to the stream.
    pub fn bytes_written(&self) -> u64 {
        self.counters.bytes_written.load(Ordering::Relaxed)
    }

    /// Number of buffers whose write failed.
    pub fn write_errors(&self) -> u64 {
        self.counters.write_errors.load(Ordering::Relaxed)
    }

    /// Buffer pool backing this transport.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Stop accepting buffers, flush the queue and wait for the writer thread.
    pub fn close(&mut self) {
        self.queue = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("stream transport writer panicked");
            }
        }
    }
}

impl Transport for StreamTransport {
    fn alloc(&self, len: usize) -> Result<TxBuffer> {
        self.pool.alloc(len)
    }

    fn enqueue(&self, buf: TxBuffer) -> Result<()> {
        let queue = self.queue.as_ref().ok_or(TransportError::Shutdown)?;
        queue.send(buf).map_err(|_| TransportError::Shutdown)
    }

    fn name(&self) -> &'static str {
        "stream"
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("pool", &self.pool)
            .field("open", &self.queue.is_some())
            .finish()
    }
}

fn drain_queue<W: Write>(mut writer: W, rx: Receiver<TxBuffer>, counters: &WriterCounters) {
    for buf in rx {
        let result = writer.write_all(&buf).and_then(|()| writer.flush());
        match result {
            Ok(()) => {
                counters
                    .bytes_written
                    .fetch_add(buf.len() as u64, Ordering::Relaxed);
            }
            Err(err) => {
                counters.write_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, len = buf.len(), "failed writing frame to stream");
            }
        }
    }
    debug!("stream transport writer stopped");
}
