//! CRC16-checked framing for point-to-point serial links.
//!
//! Every message is framed with:
//! - A 1-byte start marker (`0xA5`) for stream synchronization
//! - A 1-byte payload length (0..=250)
//! - A 1-byte component ID and a 1-byte message ID
//! - The payload
//! - A 2-byte little-endian CRC16 over length, IDs and payload
//!
//! [`FrameDecoder`] rebuilds frames one byte at a time with fixed-size
//! buffers, so it can sit directly behind an interrupt or DMA completion.

pub mod codec;
pub mod crc;
pub mod decoder;
pub mod error;
pub mod reader;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::XlinkCodec;
pub use codec::{
    encode_frame, encode_into, frame_size, Frame, CHECKSUMMED_HEADER_SIZE, CHECKSUM_SIZE,
    HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD, START_MARKER,
};
pub use crc::{crc16, crc16_update, CRC16_INIT};
pub use decoder::{FrameDecoder, FrameView, Outcome, RxState};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, ReaderConfig};
