//! Table-driven CRC16 with the reflected CCITT polynomial.
//!
//! Right-shifting, initial value `0xFFFF`, no final XOR (the parameter set
//! catalogued as CRC-16/MCRF4XX). Feeding a sequence in any number of
//! chunks through [`crc16_update`] yields the same value as [`crc16`] over
//! the whole sequence, which is what lets the decoder hash one byte at a time.

/// Accumulator value at the start of every frame.
pub const CRC16_INIT: u16 = 0xFFFF;

/// Bit-reversed form of the CCITT polynomial 0x1021.
const POLY_REFLECTED: u16 = 0x8408;

static CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC16 of `bytes`, starting from [`CRC16_INIT`].
pub fn crc16(bytes: &[u8]) -> u16 {
    crc16_update(CRC16_INIT, bytes)
}

/// Continue a CRC16 computation from a partial value.
pub fn crc16_update(crc: u16, bytes: &[u8]) -> u16 {
    bytes.iter().fold(crc, |crc, byte| crc16_byte(crc, *byte))
}

/// Fold a single byte into the accumulator.
#[inline]
pub fn crc16_byte(crc: u16, byte: u8) -> u16 {
    (crc >> 8) ^ CRC16_TABLE[usize::from((crc ^ u16::from(byte)) as u8)]
}
