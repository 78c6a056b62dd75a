use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::codec::{Frame, MAX_FRAME_SIZE};
use crate::decoder::{FrameDecoder, Outcome};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 64;

/// Configuration for [`FrameReader`].
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// Give up with [`FrameError::ChecksumMismatch`] after this many corrupted
    /// frames in a row. `None` skips corrupted frames indefinitely.
    pub max_consecutive_mismatches: Option<usize>,
}

/// Reads validated frames from any blocking `Read` stream.
///
/// Handles partial reads and line noise internally; corrupted frames are
/// counted and skipped.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    pending: BytesMut,
    config: ReaderConfig,
    mismatches: u64,
    consecutive_mismatches: usize,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ReaderConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: ReaderConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            pending: BytesMut::with_capacity(MAX_FRAME_SIZE),
            config,
            mismatches: 0,
            consecutive_mismatches: 0,
        }
    }

    /// Read the next valid frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.drain_pending()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    fn drain_pending(&mut self) -> Result<Option<Frame>> {
        while !self.pending.is_empty() {
            let (used, outcome) = self.decoder.feed_slice(&self.pending);
            self.pending.advance(used);

            match outcome {
                Outcome::Incomplete => {}
                Outcome::FrameReady => {
                    self.consecutive_mismatches = 0;
                    return Ok(self.decoder.frame().map(|view| view.to_frame()));
                }
                Outcome::ChecksumMismatch { computed, received } => {
                    self.mismatches += 1;
                    self.consecutive_mismatches += 1;
                    warn!(computed, received, "dropping frame with bad checksum");
                    if let Some(limit) = self.config.max_consecutive_mismatches {
                        if self.consecutive_mismatches >= limit {
                            return Err(FrameError::ChecksumMismatch { computed, received });
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Total frames dropped for a bad checksum.
    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}
