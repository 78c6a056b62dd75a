use bytes::{Bytes, BytesMut};

use crate::crc::{crc16_byte, CRC16_INIT};
use crate::error::{FrameError, Result};

/// Start-of-frame marker.
pub const START_MARKER: u8 = 0xA5;

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD: usize = 250;

/// Frame header: start marker (1) + length (1) + component (1) + message (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Header bytes covered by the checksum (everything but the start marker).
pub const CHECKSUMMED_HEADER_SIZE: usize = 3;

/// Trailing checksum size.
pub const CHECKSUM_SIZE: usize = 2;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + CHECKSUM_SIZE;

/// A validated message, copied out of the receive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Logical subsystem the message addresses.
    pub component: u8,
    /// Message type within the component's namespace.
    pub message: u8,
    /// The message payload (at most [`MAX_PAYLOAD`] bytes).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(component: u8, message: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            component,
            message,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        frame_size(self.payload.len())
    }

    /// Append this frame's wire encoding to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(self.component, self.message, &self.payload, dst)
    }
}

/// Wire size of a frame carrying `payload_len` bytes.
pub const fn frame_size(payload_len: usize) -> usize {
    HEADER_SIZE + payload_len + CHECKSUM_SIZE
}

/// Encode a frame into a caller-provided buffer, returning the bytes written.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬───────────┬─────────┬──────────────┬──────────────┐
/// │ Start  │ Length │ Component │ Message │ Payload      │ CRC16        │
/// │ 0xA5   │ (1B)   │ (1B)      │ (1B)    │ (Length B)   │ (2B LE)      │
/// └────────┴────────┴───────────┴─────────┴──────────────┴──────────────┘
///            └────────────── checksummed ──────────────┘
/// ```
///
/// The payload is copied and hashed in the same pass. There is no escaping:
/// `0xA5` may appear anywhere after the start marker.
pub fn encode_into(component: u8, message: u8, payload: &[u8], dst: &mut [u8]) -> Result<usize> {
    let len = checked_len(payload)?;
    let total = frame_size(payload.len());
    if dst.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            available: dst.len(),
        });
    }

    dst[0] = START_MARKER;
    let mut crc = CRC16_INIT;
    for (slot, byte) in dst[1..HEADER_SIZE].iter_mut().zip([len, component, message]) {
        *slot = byte;
        crc = crc16_byte(crc, byte);
    }

    let body_end = HEADER_SIZE + payload.len();
    for (slot, byte) in dst[HEADER_SIZE..body_end].iter_mut().zip(payload) {
        *slot = *byte;
        crc = crc16_byte(crc, *byte);
    }

    dst[body_end..total].copy_from_slice(&crc.to_le_bytes());
    Ok(total)
}

/// Append an encoded frame to `dst`.
pub fn encode_frame(component: u8, message: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    checked_len(payload)?;
    let start = dst.len();
    dst.resize(start + frame_size(payload.len()), 0);
    encode_into(component, message, payload, &mut dst[start..])?;
    Ok(())
}

fn checked_len(payload: &[u8]) -> Result<u8> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    Ok(payload.len() as u8)
}
