use bytes::{Bytes, BytesMut};

use crate::codec::{DecodedRecord, RECORD_SIZE};

/// Output record: same length and field order as the input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodedRecord {
    bytes: Bytes,
}

impl TranscodedRecord {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Negate an int16, saturating at `i16::MAX` instead of wrapping.
///
/// `-32768` has no positive counterpart in 16 bits and maps to `32767`.
pub fn negate_saturating(x: i16) -> i16 {
    x.saturating_neg()
}

/// Reinterpret an 8-byte big-endian value as little-endian, preserving its value.
pub fn swap_timestamp(bytes: [u8; 8]) -> [u8; 8] {
    u64::from_be_bytes(bytes).to_le_bytes()
}

/// Transcode a decoded record into the output byte layout.
///
/// Acceleration and magnetic field pass through untouched. The configured angular-rate
/// axis is negated with saturation and the timestamp is flipped to little-endian.
pub fn transcode(record: &DecodedRecord) -> TranscodedRecord {
    let layout = record.layout();
    let mut out = BytesMut::from(&record.as_bytes()[..]);

    let offset = layout.negated_offset();
    let negated = negate_saturating(record.i16_at(offset));
    out[offset..offset + 2].copy_from_slice(&negated.to_be_bytes());

    let ts = layout.timestamp;
    out[ts..ts + 8].copy_from_slice(&swap_timestamp(record.timestamp_bytes()));

    debug_assert_eq!(out.len(), RECORD_SIZE);
    TranscodedRecord {
        bytes: out.freeze(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_hex, Axis, RecordLayout};

    const SAMPLE: &[u8] = b"0000000040000000000000640000000000000000000000000001";

    #[test]
    fn end_to_end_sample() {
        let record = decode_hex(SAMPLE, &RecordLayout::default()).unwrap();
        let out = transcode(&record);

        assert_eq!(out.len(), RECORD_SIZE);
        let bytes = out.as_bytes();
        // acceleration unchanged
        assert_eq!(&bytes[0..6], &[0x00, 0x00, 0x00, 0x00, 0x40, 0x00]);
        // angular rate x, y unchanged, z = -100
        assert_eq!(&bytes[6..10], &[0, 0, 0, 0]);
        assert_eq!(i16::from_be_bytes([bytes[10], bytes[11]]), -100);
        // magnetic field unchanged
        assert_eq!(&bytes[12..18], &[0u8; 6]);
        // timestamp little-endian
        assert_eq!(&bytes[18..26], &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn negation_saturates() {
        assert_eq!(negate_saturating(i16::MIN), i16::MAX);
        assert_eq!(negate_saturating(100), -100);
        assert_eq!(negate_saturating(-100), 100);
        assert_eq!(negate_saturating(0), 0);
        assert_eq!(negate_saturating(i16::MAX), -i16::MAX);
    }

    #[test]
    fn negation_matches_clamped_integer_negation() {
        for x in (i16::MIN..=i16::MAX).step_by(97).chain([i16::MIN, -1, 0, 1, i16::MAX]) {
            let expected = (-(x as i32)).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            assert_eq!(negate_saturating(x), expected, "x = {x}");
        }
    }

    #[test]
    fn timestamp_swap_is_an_involution() {
        let original = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        let swapped = swap_timestamp(original);
        assert_eq!(swapped, [0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01]);
        assert_eq!(swap_timestamp(swapped), original);
    }

    #[test]
    fn most_negative_rate_becomes_most_positive() {
        let line = b"000000000000000000008000000000000000000000000000002A";
        let record = decode_hex(line, &RecordLayout::default()).unwrap();
        let out = transcode(&record);
        assert_eq!(out.as_bytes()[10..12], [0x7F, 0xFF]);
    }

    #[test]
    fn negated_axis_follows_layout() {
        let line = b"000000000000006400C8012C0000000000000000000000000000";
        let layout = RecordLayout::default().with_negated_axis(Axis::X);
        let record = decode_hex(line, &layout).unwrap();
        assert_eq!(record.angular_rate(), [100, 200, 300]);

        let out = transcode(&record);
        let bytes = out.as_bytes();
        assert_eq!(i16::from_be_bytes([bytes[6], bytes[7]]), -100);
        assert_eq!(i16::from_be_bytes([bytes[8], bytes[9]]), 200);
        assert_eq!(i16::from_be_bytes([bytes[10], bytes[11]]), 300);
    }

    #[test]
    fn other_fields_pass_through() {
        let line = b"7FFF8000123400000000000001020304050600000000DEADBEEF";
        let record = decode_hex(line, &RecordLayout::default()).unwrap();
        let out = transcode(&record);

        assert_eq!(&out.as_bytes()[0..6], &record.as_bytes()[0..6]);
        assert_eq!(&out.as_bytes()[12..18], &record.as_bytes()[12..18]);
        assert_eq!(
            u64::from_le_bytes(out.as_bytes()[18..26].try_into().unwrap()),
            0xDEAD_BEEF
        );
    }
}
