use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{encode_frame, Frame};
use crate::decoder::{FrameDecoder, Outcome};
use crate::error::FrameError;

/// `tokio_util` codec over the xlink frame format.
///
/// Decoding runs the same byte-at-a-time state machine as
/// [`FrameDecoder`]; frames with a bad checksum are dropped and counted
/// rather than ending the stream.
#[derive(Debug, Default)]
pub struct XlinkCodec {
    decoder: FrameDecoder,
    mismatches: u64,
}

impl XlinkCodec {
    /// Create a codec waiting for a start marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames dropped for a bad checksum.
    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }
}

impl Decoder for XlinkCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        while !src.is_empty() {
            let (used, outcome) = self.decoder.feed_slice(src);
            src.advance(used);

            match outcome {
                Outcome::Incomplete => {}
                Outcome::FrameReady => {
                    return Ok(self.decoder.frame().map(|view| view.to_frame()));
                }
                Outcome::ChecksumMismatch { computed, received } => {
                    self.mismatches += 1;
                    warn!(computed, received, "dropping frame with bad checksum");
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for XlinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.component, item.message, &item.payload, dst)
    }
}
