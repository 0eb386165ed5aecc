//! Log record framing
//!
//! Framed devices write `log.bin` as a sequence of self-describing records:
//!
//! ```text
//! ┌───────────┬──────┬──────────────────┬────────────────┬─────────────┬──────────┐
//! │ Separator │ Type │ Timestamp (s)    │ Payload length │ Payload     │ Checksum │
//! │ 1 byte    │ 1    │ 4 bytes, LE      │ 2 bytes, LE    │ length bytes│ 1 byte   │
//! └───────────┴──────┴──────────────────┴────────────────┴─────────────┴──────────┘
//! ```
//!
//! [`RecordFramer`] consumes the stream one byte at a time and yields each
//! completed record together with the outcome of its checksum verification.

use std::fmt;

use crate::types::Truncation;

/// Header length in bytes
pub const HEADER_LEN: usize = 8;

/// Separator byte that opens every record
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// Record type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Activity,
    Battery,
    Event,
    HeartRateBpm,
    Lux,
    Metadata,
    Tag,
    Epoch,
    HeartRateAnt,
    Epoch2,
    Capsense,
    HeartRateBle,
    Epoch3,
    Epoch4,
    Parameters,
    SensorSchema,
    SensorData,
    Activity2,
    /// Code not in the documented table
    Other(u8),
}

impl RecordType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => RecordType::Activity,
            2 => RecordType::Battery,
            3 => RecordType::Event,
            4 => RecordType::HeartRateBpm,
            5 => RecordType::Lux,
            6 => RecordType::Metadata,
            7 => RecordType::Tag,
            9 => RecordType::Epoch,
            11 => RecordType::HeartRateAnt,
            12 => RecordType::Epoch2,
            13 => RecordType::Capsense,
            14 => RecordType::HeartRateBle,
            15 => RecordType::Epoch3,
            16 => RecordType::Epoch4,
            21 => RecordType::Parameters,
            24 => RecordType::SensorSchema,
            25 => RecordType::SensorData,
            26 => RecordType::Activity2,
            other => RecordType::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            RecordType::Activity => 0,
            RecordType::Battery => 2,
            RecordType::Event => 3,
            RecordType::HeartRateBpm => 4,
            RecordType::Lux => 5,
            RecordType::Metadata => 6,
            RecordType::Tag => 7,
            RecordType::Epoch => 9,
            RecordType::HeartRateAnt => 11,
            RecordType::Epoch2 => 12,
            RecordType::Capsense => 13,
            RecordType::HeartRateBle => 14,
            RecordType::Epoch3 => 15,
            RecordType::Epoch4 => 16,
            RecordType::Parameters => 21,
            RecordType::SensorSchema => 24,
            RecordType::SensorData => 25,
            RecordType::Activity2 => 26,
            RecordType::Other(code) => *code,
        }
    }
}

/// Decoded record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub separator: u8,
    pub record_type: RecordType,
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    pub payload_len: u16,
}

impl RecordHeader {
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            separator: bytes[0],
            record_type: RecordType::from_code(bytes[1]),
            timestamp: u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
            payload_len: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let ts = self.timestamp.to_le_bytes();
        let len = self.payload_len.to_le_bytes();
        [
            self.separator,
            self.record_type.code(),
            ts[0],
            ts[1],
            ts[2],
            ts[3],
            len[0],
            len[1],
        ]
    }

    /// Record timestamp in milliseconds
    pub fn timestamp_ms(&self) -> i64 {
        i64::from(self.timestamp) * 1000
    }
}

/// A complete record as read from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub header: RecordHeader,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl LogRecord {
    pub fn is_valid(&self) -> bool {
        checksum(&self.header, &self.payload) == self.checksum
    }
}

/// Expected checksum of a record.
///
/// One's complement of the XOR of the separator, the type, the timestamp
/// bytes, the length bytes and every payload byte. The separator is taken as
/// [`RECORD_SEPARATOR`] whatever the stream carries.
pub fn checksum(header: &RecordHeader, payload: &[u8]) -> u8 {
    let ts = header.timestamp.to_le_bytes();
    let len = header.payload_len.to_le_bytes();
    let folded = [header.record_type.code(), ts[0], ts[1], ts[2], ts[3], len[0], len[1]]
        .iter()
        .chain(payload)
        .fold(RECORD_SEPARATOR, |acc, byte| acc ^ byte);
    !folded
}

/// Serialize a record with a valid checksum
pub fn encode_record(record_type: RecordType, timestamp: u32, payload: &[u8]) -> Vec<u8> {
    let header = RecordHeader {
        separator: RECORD_SEPARATOR,
        record_type,
        timestamp,
        payload_len: payload.len() as u16,
    };
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + 1);
    bytes.extend_from_slice(&header.encode());
    bytes.extend_from_slice(payload);
    bytes.push(checksum(&header, payload));
    bytes
}

/// What the framer produced after a byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// Record whose checksum matched
    Record(LogRecord),
    /// Record whose checksum did not match; it must be dropped
    Corrupt(LogRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FramerState {
    AwaitingHeader,
    AwaitingPayload(RecordHeader),
    AwaitingChecksum(RecordHeader, Vec<u8>),
}

impl fmt::Display for FramerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramerState::AwaitingHeader => f.write_str("awaiting_header"),
            FramerState::AwaitingPayload(_) => f.write_str("awaiting_payload"),
            FramerState::AwaitingChecksum(..) => f.write_str("awaiting_checksum"),
        }
    }
}

/// Byte-at-a-time record framer.
///
/// Returns to `AwaitingHeader` after every checksum byte whatever its outcome,
/// so a corrupt record costs exactly one record.
#[derive(Debug)]
pub struct RecordFramer {
    state: FramerState,
    buffer: Vec<u8>,
}

impl Default for RecordFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFramer {
    pub fn new() -> Self {
        Self {
            state: FramerState::AwaitingHeader,
            buffer: Vec::with_capacity(HEADER_LEN),
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        match std::mem::replace(&mut self.state, FramerState::AwaitingHeader) {
            FramerState::AwaitingHeader => {
                self.buffer.push(byte);
                if self.buffer.len() == HEADER_LEN {
                    let mut raw = [0u8; HEADER_LEN];
                    raw.copy_from_slice(&self.buffer);
                    self.buffer.clear();
                    let header = RecordHeader::decode(&raw);
                    self.state = if header.payload_len == 0 {
                        FramerState::AwaitingChecksum(header, Vec::new())
                    } else {
                        self.buffer.reserve(usize::from(header.payload_len));
                        FramerState::AwaitingPayload(header)
                    };
                }
                None
            }
            FramerState::AwaitingPayload(header) => {
                self.buffer.push(byte);
                self.state = if self.buffer.len() == usize::from(header.payload_len) {
                    FramerState::AwaitingChecksum(header, std::mem::take(&mut self.buffer))
                } else {
                    FramerState::AwaitingPayload(header)
                };
                None
            }
            FramerState::AwaitingChecksum(header, payload) => {
                let record = LogRecord {
                    header,
                    payload,
                    checksum: byte,
                };
                if record.is_valid() {
                    Some(FrameEvent::Record(record))
                } else {
                    Some(FrameEvent::Corrupt(record))
                }
            }
        }
    }

    /// Check the stream ended on a record boundary
    pub fn finish(&self) -> Result<(), Truncation> {
        let pending_bytes = match &self.state {
            FramerState::AwaitingHeader if self.buffer.is_empty() => return Ok(()),
            FramerState::AwaitingHeader => self.buffer.len(),
            FramerState::AwaitingPayload(_) => HEADER_LEN + self.buffer.len(),
            FramerState::AwaitingChecksum(_, payload) => HEADER_LEN + payload.len(),
        };
        Err(Truncation {
            state: self.state.to_string(),
            pending_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_all(bytes: &[u8]) -> (RecordFramer, Vec<FrameEvent>) {
        let mut framer = RecordFramer::new();
        let events = bytes.iter().filter_map(|&b| framer.push(b)).collect();
        (framer, events)
    }

    #[test]
    fn test_known_good_capture() {
        // Battery record: type 2, t=0x5A0B7C10, payload 0x0E10
        let capture = [
            0x1E, 0x02, 0x10, 0x7C, 0x0B, 0x5A, 0x02, 0x00, 0x10, 0x0E, 0xC2,
        ];
        let (framer, events) = frame_all(&capture);
        assert!(framer.finish().is_ok());
        assert_eq!(events.len(), 1);
        match &events[0] {
            FrameEvent::Record(record) => {
                assert_eq!(record.header.record_type, RecordType::Battery);
                assert_eq!(record.header.timestamp, 0x5A0B7C10);
                assert_eq!(record.payload, vec![0x10, 0x0E]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_checksum_algebra() {
        let payload = [0x01, 0x02, 0x03];
        let header = RecordHeader {
            separator: RECORD_SEPARATOR,
            record_type: RecordType::Activity,
            timestamp: 1_500_000_000,
            payload_len: 3,
        };
        let sum = checksum(&header, &payload);
        let mut folded = 0u8;
        for byte in header.encode()[1..].iter().chain(payload.iter()) {
            folded ^= byte;
        }
        // complement of (declared ^ everything) is the separator
        assert_eq!(!(sum ^ folded), RECORD_SEPARATOR);
    }

    #[test]
    fn test_single_bit_corruption_rejected() {
        let payload: Vec<u8> = (0u8..27).collect();
        let good = encode_record(RecordType::Activity, 1_600_000_000, &payload);
        for byte in HEADER_LEN..HEADER_LEN + payload.len() {
            for bit in 0..8 {
                let mut bad = good.clone();
                bad[byte] ^= 1 << bit;
                let (_, events) = frame_all(&bad);
                assert!(
                    matches!(events.as_slice(), [FrameEvent::Corrupt(_)]),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn test_corrupt_record_does_not_desync() {
        let mut stream = encode_record(RecordType::Activity, 10, &[1, 2, 3]);
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;
        stream.extend(encode_record(RecordType::Lux, 11, &[4, 5]));

        let (framer, events) = frame_all(&stream);
        assert!(framer.finish().is_ok());
        assert!(matches!(events[0], FrameEvent::Corrupt(_)));
        match &events[1] {
            FrameEvent::Record(record) => assert_eq!(record.header.record_type, RecordType::Lux),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_empty_payload() {
        let stream = encode_record(RecordType::Tag, 42, &[]);
        assert_eq!(stream.len(), HEADER_LEN + 1);
        let (_, events) = frame_all(&stream);
        match &events[..] {
            [FrameEvent::Record(record)] => {
                assert!(record.payload.is_empty());
                assert_eq!(record.header.timestamp_ms(), 42_000);
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_payload_not_multiple_of_nine() {
        let payload = vec![0xAA; 1000];
        let stream = encode_record(RecordType::Activity, 7, &payload);
        let (_, events) = frame_all(&stream);
        match &events[..] {
            [FrameEvent::Record(record)] => assert_eq!(record.payload.len(), 1000),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_truncation_reported() {
        let stream = encode_record(RecordType::Activity, 7, &[0u8; 18]);

        let (framer, _) = frame_all(&stream[..5]);
        let truncated = framer.finish().unwrap_err();
        assert_eq!(truncated.state, "awaiting_header");
        assert_eq!(truncated.pending_bytes, 5);

        let (framer, _) = frame_all(&stream[..HEADER_LEN + 4]);
        let truncated = framer.finish().unwrap_err();
        assert_eq!(truncated.state, "awaiting_payload");
        assert_eq!(truncated.pending_bytes, HEADER_LEN + 4);

        let (framer, events) = frame_all(&stream[..stream.len() - 1]);
        assert!(events.is_empty());
        assert_eq!(framer.finish().unwrap_err().state, "awaiting_checksum");
    }

    #[test]
    fn test_record_type_codes() {
        for code in 0..=u8::MAX {
            assert_eq!(RecordType::from_code(code).code(), code);
        }
        assert_eq!(RecordType::from_code(26), RecordType::Activity2);
        assert_eq!(RecordType::from_code(1), RecordType::Other(1));
    }
}
