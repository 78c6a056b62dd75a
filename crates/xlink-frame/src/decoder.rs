use bytes::Bytes;
use tracing::trace;

use crate::codec::{
    Frame, CHECKSUMMED_HEADER_SIZE, CHECKSUM_SIZE, HEADER_SIZE, MAX_PAYLOAD, START_MARKER,
};
use crate::crc::{crc16_byte, CRC16_INIT};

/// Position of the receive state machine within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Scanning for the start marker; every other byte is inter-frame noise.
    AwaitingStart,
    /// Collecting length, component ID and message ID.
    AwaitingHeader,
    /// Collecting payload and the trailing checksum.
    AwaitingBody,
}

/// Result of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// More bytes are needed.
    Incomplete,
    /// A frame passed CRC verification; read it with [`FrameDecoder::frame`].
    FrameReady,
    /// A frame was fully received but its checksum did not match. It has been discarded.
    ChecksumMismatch { computed: u16, received: u16 },
}

/// Byte-at-a-time frame decoder.
///
/// All storage is inline and sized for the largest legal frame; feeding
/// never allocates and never blocks. Synchronization relies on the start
/// marker only between frames: inside a frame the decoder counts bytes, so
/// a marker value in the payload is plain data. After a corrupted frame the
/// next `0xA5` is taken as a new start even if it was payload, which is an
/// accepted limitation of unescaped fixed-length framing.
pub struct FrameDecoder {
    state: RxState,
    running_crc: u16,
    /// Bytes seen since the start marker.
    consumed: usize,
    /// Bytes expected after the start marker: header, payload and checksum.
    expected_total: usize,
    header: [u8; HEADER_SIZE],
    body: [u8; MAX_PAYLOAD + CHECKSUM_SIZE],
    ready: bool,
}

/// Borrowed view of the most recently validated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub component: u8,
    pub message: u8,
    pub payload: &'a [u8],
}

impl FrameView<'_> {
    /// Copy the frame out of the decoder.
    pub fn to_frame(&self) -> Frame {
        Frame {
            component: self.component,
            message: self.message,
            payload: Bytes::copy_from_slice(self.payload),
        }
    }
}

impl FrameDecoder {
    /// Create a decoder waiting for a start marker.
    pub fn new() -> Self {
        Self {
            state: RxState::AwaitingStart,
            running_crc: CRC16_INIT,
            consumed: 0,
            expected_total: 0,
            header: [0; HEADER_SIZE],
            body: [0; MAX_PAYLOAD + CHECKSUM_SIZE],
            ready: false,
        }
    }

    /// Advance the state machine by one byte.
    pub fn feed(&mut self, byte: u8) -> Outcome {
        self.ready = false;

        match self.state {
            RxState::AwaitingStart => {
                if byte == START_MARKER {
                    self.header[0] = byte;
                    self.running_crc = CRC16_INIT;
                    self.consumed = 0;
                    self.expected_total = CHECKSUMMED_HEADER_SIZE;
                    self.state = RxState::AwaitingHeader;
                }
                Outcome::Incomplete
            }
            RxState::AwaitingHeader => {
                self.header[1 + self.consumed] = byte;
                self.running_crc = crc16_byte(self.running_crc, byte);
                self.consumed += 1;

                if self.consumed == CHECKSUMMED_HEADER_SIZE {
                    let payload_len = self.payload_len();
                    if payload_len > MAX_PAYLOAD {
                        trace!(payload_len, "length out of range, resynchronizing");
                        self.state = RxState::AwaitingStart;
                        return Outcome::Incomplete;
                    }
                    self.expected_total = CHECKSUMMED_HEADER_SIZE + payload_len + CHECKSUM_SIZE;
                    self.state = RxState::AwaitingBody;
                }
                Outcome::Incomplete
            }
            RxState::AwaitingBody => {
                let pos = self.consumed - CHECKSUMMED_HEADER_SIZE;
                let payload_len = self.payload_len();
                self.body[pos] = byte;
                self.consumed += 1;

                if pos < payload_len {
                    self.running_crc = crc16_byte(self.running_crc, byte);
                }

                if self.consumed < self.expected_total {
                    return Outcome::Incomplete;
                }

                self.state = RxState::AwaitingStart;
                let received =
                    u16::from_le_bytes([self.body[payload_len], self.body[payload_len + 1]]);
                if received == self.running_crc {
                    self.ready = true;
                    Outcome::FrameReady
                } else {
                    Outcome::ChecksumMismatch {
                        computed: self.running_crc,
                        received,
                    }
                }
            }
        }
    }

    /// Feed bytes until one completes a frame (valid or not).
    ///
    /// Returns how many bytes were consumed together with the outcome of
    /// the last one. Bytes after a completed frame are left to the caller,
    /// so the frame can be read before the decoder moves on.
    pub fn feed_slice(&mut self, data: &[u8]) -> (usize, Outcome) {
        for (idx, byte) in data.iter().enumerate() {
            match self.feed(*byte) {
                Outcome::Incomplete => continue,
                outcome => return (idx + 1, outcome),
            }
        }
        (data.len(), Outcome::Incomplete)
    }

    /// The frame validated by the most recent `feed`, if it returned
    /// [`Outcome::FrameReady`]. Cleared by the next `feed`.
    pub fn frame(&self) -> Option<FrameView<'_>> {
        if !self.ready {
            return None;
        }
        Some(FrameView {
            component: self.header[2],
            message: self.header[3],
            payload: &self.body[..self.payload_len()],
        })
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Drop any partial frame and wait for the next start marker.
    pub fn reset(&mut self) {
        self.state = RxState::AwaitingStart;
        self.consumed = 0;
        self.expected_total = 0;
        self.ready = false;
    }

    fn payload_len(&self) -> usize {
        usize::from(self.header[1])
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("state", &self.state)
            .field("consumed", &self.consumed)
            .field("expected_total", &self.expected_total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, frame_size, MAX_FRAME_SIZE};

    const REFERENCE: [u8; 9] = [0xA5, 0x03, 0x01, 0x10, 0x11, 0x22, 0x33, 0x3A, 0x00];

    fn encoded(component: u8, message: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(component, message, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn feed_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Outcome> {
        bytes.iter().map(|b| decoder.feed(*b)).collect()
    }

    #[test]
    fn reference_frame_ready_on_ninth_byte() {
        let mut decoder = FrameDecoder::new();
        let outcomes = feed_all(&mut decoder, &REFERENCE);

        assert!(outcomes[..8].iter().all(|o| *o == Outcome::Incomplete));
        assert_eq!(outcomes[8], Outcome::FrameReady);

        let frame = decoder.frame().unwrap();
        assert_eq!(frame.component, 0x01);
        assert_eq!(frame.message, 0x10);
        assert_eq!(frame.payload, &[0x11, 0x22, 0x33]);
        assert_eq!(decoder.state(), RxState::AwaitingStart);
    }

    #[test]
    fn state_transitions_follow_frame_layout() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.state(), RxState::AwaitingStart);

        decoder.feed(0xA5);
        assert_eq!(decoder.state(), RxState::AwaitingHeader);
        decoder.feed(0x03);
        decoder.feed(0x01);
        assert_eq!(decoder.state(), RxState::AwaitingHeader);
        decoder.feed(0x10);
        assert_eq!(decoder.state(), RxState::AwaitingBody);
    }

    #[test]
    fn encoder_output_roundtrips() {
        let wire = encoded(42, 7, b"roundtrip payload");
        let mut decoder = FrameDecoder::new();
        let (used, outcome) = decoder.feed_slice(&wire);

        assert_eq!(used, wire.len());
        assert_eq!(outcome, Outcome::FrameReady);
        let frame = decoder.frame().unwrap().to_frame();
        assert_eq!(frame, Frame::new(42, 7, &b"roundtrip payload"[..]));
    }

    #[test]
    fn zero_length_payload() {
        let wire = encoded(9, 9, b"");
        assert_eq!(wire.len(), 6);

        let mut decoder = FrameDecoder::new();
        let outcomes = feed_all(&mut decoder, &wire);
        assert_eq!(outcomes.last(), Some(&Outcome::FrameReady));
        assert!(decoder.frame().unwrap().payload.is_empty());
    }

    #[test]
    fn max_payload_frame() {
        let payload: Vec<u8> = (0..MAX_PAYLOAD).map(|i| i as u8).collect();
        let wire = encoded(1, 2, &payload);
        assert_eq!(wire.len(), MAX_FRAME_SIZE);

        let mut decoder = FrameDecoder::new();
        let outcomes = feed_all(&mut decoder, &wire);
        assert_eq!(outcomes.iter().filter(|o| **o != Outcome::Incomplete).count(), 1);
        assert_eq!(outcomes.last(), Some(&Outcome::FrameReady));
        assert_eq!(decoder.frame().unwrap().payload, payload.as_slice());
    }

    #[test]
    fn garbage_never_completes() {
        let mut decoder = FrameDecoder::new();
        for i in 0..10_000u32 {
            let byte = (i % 251) as u8;
            let byte = if byte == START_MARKER { 0 } else { byte };
            assert_eq!(decoder.feed(byte), Outcome::Incomplete);
        }
        assert_eq!(decoder.state(), RxState::AwaitingStart);
        assert!(decoder.frame().is_none());
    }

    #[test]
    fn leading_noise_is_skipped() {
        let mut wire = vec![0x00, 0xFF, 0x13, 0x37];
        wire.extend_from_slice(&REFERENCE);

        let mut decoder = FrameDecoder::new();
        let (used, outcome) = decoder.feed_slice(&wire);
        assert_eq!(used, wire.len());
        assert_eq!(outcome, Outcome::FrameReady);
    }

    #[test]
    fn checksum_mismatch_resets_to_start() {
        let mut wire = REFERENCE;
        wire[7] ^= 0xFF;

        let mut decoder = FrameDecoder::new();
        let outcomes = feed_all(&mut decoder, &wire);
        assert_eq!(
            outcomes[8],
            Outcome::ChecksumMismatch {
                computed: 0x003A,
                received: 0x00C5
            }
        );
        assert_eq!(decoder.state(), RxState::AwaitingStart);
        assert!(decoder.frame().is_none());

        let outcomes = feed_all(&mut decoder, &REFERENCE);
        assert_eq!(outcomes[8], Outcome::FrameReady);
    }

    #[test]
    fn single_bit_flips_are_detected() {
        for idx in 1..REFERENCE.len() {
            for bit in 0..8 {
                let mut wire = REFERENCE;
                wire[idx] ^= 1 << bit;

                let mut decoder = FrameDecoder::new();
                let outcomes = feed_all(&mut decoder, &wire);
                assert!(
                    !outcomes.contains(&Outcome::FrameReady),
                    "flip at byte {idx} bit {bit} produced a frame"
                );
                if idx > 1 {
                    assert!(
                        matches!(outcomes[8], Outcome::ChecksumMismatch { .. }),
                        "flip at byte {idx} bit {bit} not reported"
                    );
                }
            }
        }
    }

    #[test]
    fn start_marker_inside_payload_is_data() {
        let payload = [START_MARKER, 0x03, START_MARKER, START_MARKER];
        let wire = encoded(START_MARKER, START_MARKER, &payload);

        let mut decoder = FrameDecoder::new();
        let outcomes = feed_all(&mut decoder, &wire);
        assert_eq!(outcomes.last(), Some(&Outcome::FrameReady));
        let frame = decoder.frame().unwrap();
        assert_eq!(frame.component, START_MARKER);
        assert_eq!(frame.payload, &payload);
    }

    #[test]
    fn out_of_range_length_resynchronizes() {
        let mut wire = vec![0xA5, 251, 0x01, 0x02];
        wire.extend_from_slice(&REFERENCE);

        let mut decoder = FrameDecoder::new();
        let outcomes = feed_all(&mut decoder, &wire);
        assert!(outcomes[..4].iter().all(|o| *o == Outcome::Incomplete));
        assert_eq!(outcomes.last(), Some(&Outcome::FrameReady));
    }

    #[test]
    fn back_to_back_frames() {
        let mut wire = encoded(1, 1, b"one");
        wire.extend(encoded(2, 2, b"two"));
        wire.extend(encoded(3, 3, b""));

        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        let mut rest = wire.as_slice();
        while !rest.is_empty() {
            let (used, outcome) = decoder.feed_slice(rest);
            if outcome == Outcome::FrameReady {
                frames.push(decoder.frame().unwrap().to_frame());
            }
            rest = &rest[used..];
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload.as_ref(), b"one");
        assert_eq!(frames[1].component, 2);
        assert_eq!(frames[2].wire_size(), frame_size(0));
    }

    #[test]
    fn frame_view_cleared_by_next_byte() {
        let mut decoder = FrameDecoder::new();
        feed_all(&mut decoder, &REFERENCE);
        assert!(decoder.frame().is_some());

        decoder.feed(0x00);
        assert!(decoder.frame().is_none());
    }

    #[test]
    fn stalled_frame_stays_parked_until_reset() {
        let mut decoder = FrameDecoder::new();
        feed_all(&mut decoder, &REFERENCE[..5]);
        assert_eq!(decoder.state(), RxState::AwaitingBody);

        decoder.reset();
        assert_eq!(decoder.state(), RxState::AwaitingStart);
        let outcomes = feed_all(&mut decoder, &REFERENCE);
        assert_eq!(outcomes[8], Outcome::FrameReady);
    }
}
