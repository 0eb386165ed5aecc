//! Nonet sample unpacking
//!
//! A nonet is 9 bytes holding two samples of three 12-bit axis values each.
//! On the wire the axes are ordered Y, X, Z:
//!
//! ```text
//! byte:  0        1        2        3        4        5        6        7        8
//!        yyyyyyyy yyyyxxxx xxxxxxxx zzzzzzzz zzzzyyyy yyyyyyyy xxxxxxxx xxxxzzzz zzzzzzzz
//!        |------- sample 1 --------------------||------- sample 2 ---------------------|
//! ```

use crate::types::{Sample, SamplePair};

/// Bytes per nonet
pub const NONET_LEN: usize = 9;

/// Smallest value that is negative once sign-extended from 12 bits
const SIGN_THRESHOLD: u16 = 2048;

/// Adding this to a 12-bit field reinterprets it as a 16-bit negative value
const SIGN_EXTENSION: u16 = 0xF000;

/// Unpack two samples from a 9-byte slice. Any other length yields `None`.
pub fn unpack(bytes: &[u8]) -> Option<SamplePair> {
    let nonet: &[u8; NONET_LEN] = bytes.try_into().ok()?;
    Some(unpack_nonet(nonet))
}

pub fn unpack_nonet(b: &[u8; NONET_LEN]) -> SamplePair {
    let y1 = high_field(b[0], b[1]);
    let x1 = low_field(b[1], b[2]);
    let z1 = high_field(b[3], b[4]);
    let y2 = low_field(b[4], b[5]);
    let x2 = high_field(b[6], b[7]);
    let z2 = low_field(b[7], b[8]);

    SamplePair::new(Sample::new(x1, y1, z1), Sample::new(x2, y2, z2))
}

/// Field made of a whole byte followed by the high nibble of the next
fn high_field(whole: u8, nibble: u8) -> i16 {
    sign_extend((u16::from(whole) << 4) | (u16::from(nibble) >> 4))
}

/// Field made of the low nibble of a byte followed by the next whole byte
fn low_field(nibble: u8, whole: u8) -> i16 {
    sign_extend((u16::from(nibble & 0x0F) << 8) | u16::from(whole))
}

fn sign_extend(field: u16) -> i16 {
    let value = if field >= SIGN_THRESHOLD {
        field.wrapping_add(SIGN_EXTENSION)
    } else {
        field
    };
    value as i16
}

/// Pack two samples back into a nonet.
///
/// Axis values outside `-2048..=2047` are truncated to their low 12 bits.
pub fn pack(pair: &SamplePair) -> [u8; NONET_LEN] {
    let f = |v: i16| (v as u16) & 0x0FFF;
    let (x1, y1, z1) = (f(pair.first.x), f(pair.first.y), f(pair.first.z));
    let (x2, y2, z2) = (f(pair.second.x), f(pair.second.y), f(pair.second.z));

    [
        (y1 >> 4) as u8,
        (((y1 & 0x0F) << 4) | (x1 >> 8)) as u8,
        (x1 & 0xFF) as u8,
        (z1 >> 4) as u8,
        (((z1 & 0x0F) << 4) | (y2 >> 8)) as u8,
        (y2 & 0xFF) as u8,
        (x2 >> 4) as u8,
        (((x2 & 0x0F) << 4) | (z2 >> 8)) as u8,
        (z2 & 0xFF) as u8,
    ]
}

/// Accumulates bytes until a full nonet is available
#[derive(Debug, Default)]
pub struct NonetBuffer {
    bytes: [u8; NONET_LEN],
    len: usize,
}

impl NonetBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one byte, returning the decoded pair when the nonet completes
    pub fn push(&mut self, byte: u8) -> Option<SamplePair> {
        self.bytes[self.len] = byte;
        self.len += 1;
        if self.len == NONET_LEN {
            self.len = 0;
            Some(unpack_nonet(&self.bytes))
        } else {
            None
        }
    }

    /// Bytes waiting for the rest of their nonet
    pub fn pending(&self) -> usize {
        self.len
    }

    /// Drop any partial nonet, returning how many bytes were discarded
    pub fn clear(&mut self) -> usize {
        std::mem::take(&mut self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_order_is_yxz() {
        // y1=0x123 x1=0x456 z1=0x989 y2=0x0AB x2=0x0CD z2=0x0EF
        let bytes = [0x12, 0x34, 0x56, 0x98, 0x90, 0xAB, 0x0C, 0xD0, 0xEF];
        let pair = unpack(&bytes).unwrap();
        assert_eq!(pair.first, Sample::new(0x456, 0x123, 0x989 - 4096));
        assert_eq!(pair.second, Sample::new(0x0CD, 0x0AB, 0x0EF));
    }

    #[test]
    fn test_sign_extension() {
        let pair = SamplePair::new(Sample::new(-1, -2048, 2047), Sample::new(0, 1, -2));
        let bytes = pack(&pair);
        assert_eq!(unpack_nonet(&bytes), pair);
        assert_eq!(bytes[0], 0x80);
        // 0xFFF sign-extends to -1
        assert_eq!(unpack(&[0x00, 0x0F, 0xFF, 0, 0, 0, 0, 0, 0]).unwrap().first.x, -1);
    }

    #[test]
    fn test_round_trip_boundaries() {
        let values: [i16; 7] = [-2048, -2047, -1, 0, 1, 2046, 2047];
        for &a in &values {
            for &b in &values {
                let pair = SamplePair::new(Sample::new(a, b, -a - 1), Sample::new(b, a, a));
                let nonet = pack(&pair);
                assert_eq!(unpack_nonet(&nonet), pair);
                assert_eq!(pack(&unpack_nonet(&nonet)), nonet);
            }
        }
    }

    #[test]
    fn test_wrong_length_is_noop() {
        assert!(unpack(&[0u8; 8]).is_none());
        assert!(unpack(&[]).is_none());
        assert!(unpack(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_nonet_buffer() {
        let pair = SamplePair::new(Sample::new(10, 20, 30), Sample::new(-10, -20, -30));
        let nonet = pack(&pair);
        let mut buffer = NonetBuffer::new();

        for &byte in &nonet[..8] {
            assert!(buffer.push(byte).is_none());
        }
        assert_eq!(buffer.pending(), 8);
        assert_eq!(buffer.push(nonet[8]), Some(pair));
        assert_eq!(buffer.pending(), 0);

        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.clear(), 2);
        assert_eq!(buffer.pending(), 0);
    }
}
