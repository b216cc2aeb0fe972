use std::fmt;
use std::str::FromStr;

use fifobridge_transport::RawFrame;

use crate::error::{FrameError, Result};

/// Decoded record size in bytes.
pub const RECORD_SIZE: usize = 26;

/// Device frame length in hex characters.
pub const HEX_FRAME_LEN: usize = RECORD_SIZE * 2;

const TRIPLET_SIZE: usize = 6;
const TIMESTAMP_SIZE: usize = 8;

/// One axis of a three-axis sensor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index of the axis within its triplet.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

impl FromStr for Axis {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(FrameError::InvalidLayout(format!(
                "unknown axis {other:?} (expected x, y or z)"
            ))),
        }
    }
}

/// Where each field block sits inside the 26-byte record, and which angular-rate
/// axis is negated during transcoding.
///
/// Field boundaries differ between firmware revisions, so they are data rather than
/// constants. [`RecordLayout::validate`] checks that the blocks tile the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Offset of the acceleration triplet.
    pub acceleration: usize,
    /// Offset of the angular-rate triplet.
    pub angular_rate: usize,
    /// Offset of the magnetic-field triplet.
    pub magnetic_field: usize,
    /// Offset of the 8-byte timestamp.
    pub timestamp: usize,
    /// Angular-rate axis negated on output.
    pub negated_axis: Axis,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            acceleration: 0,
            angular_rate: 6,
            magnetic_field: 12,
            timestamp: 18,
            negated_axis: Axis::Z,
        }
    }
}

impl RecordLayout {
    /// Default layout with a different negated axis.
    pub fn with_negated_axis(mut self, axis: Axis) -> Self {
        self.negated_axis = axis;
        self
    }

    /// Check that the blocks cover every byte of the record exactly once.
    pub fn validate(&self) -> Result<()> {
        let mut blocks = [
            ("acceleration", self.acceleration, TRIPLET_SIZE),
            ("angular_rate", self.angular_rate, TRIPLET_SIZE),
            ("magnetic_field", self.magnetic_field, TRIPLET_SIZE),
            ("timestamp", self.timestamp, TIMESTAMP_SIZE),
        ];
        blocks.sort_by_key(|&(_, offset, _)| offset);

        let mut expected = 0usize;
        for (name, offset, size) in blocks {
            if offset != expected {
                return Err(FrameError::InvalidLayout(format!(
                    "{name} starts at byte {offset}, expected {expected}"
                )));
            }
            expected = offset + size;
        }
        if expected != RECORD_SIZE {
            return Err(FrameError::InvalidLayout(format!(
                "blocks cover {expected} bytes, expected {RECORD_SIZE}"
            )));
        }
        Ok(())
    }

    /// Byte offset of the negated angular-rate component.
    pub fn negated_offset(&self) -> usize {
        self.angular_rate + 2 * self.negated_axis.index()
    }
}

/// A structurally valid 26-byte record with named field accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    raw: [u8; RECORD_SIZE],
    layout: RecordLayout,
}

impl DecodedRecord {
    /// Wrap raw record bytes, rejecting a layout that does not tile the record.
    pub fn from_bytes(raw: [u8; RECORD_SIZE], layout: RecordLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { raw, layout })
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        &self.raw
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn acceleration(&self) -> [i16; 3] {
        self.triplet(self.layout.acceleration)
    }

    pub fn angular_rate(&self) -> [i16; 3] {
        self.triplet(self.layout.angular_rate)
    }

    pub fn magnetic_field(&self) -> [i16; 3] {
        self.triplet(self.layout.magnetic_field)
    }

    /// Device timestamp in nanoseconds (big-endian on the wire).
    pub fn timestamp(&self) -> u64 {
        u64::from_be_bytes(self.timestamp_bytes())
    }

    /// The eight timestamp bytes as they appear in the record.
    pub fn timestamp_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; TIMESTAMP_SIZE];
        bytes.copy_from_slice(&self.raw[self.layout.timestamp..self.layout.timestamp + 8]);
        bytes
    }

    /// Read a big-endian int16 at `offset`.
    pub fn i16_at(&self, offset: usize) -> i16 {
        i16::from_be_bytes([self.raw[offset], self.raw[offset + 1]])
    }

    fn triplet(&self, offset: usize) -> [i16; 3] {
        [
            self.i16_at(offset),
            self.i16_at(offset + 2),
            self.i16_at(offset + 4),
        ]
    }
}

/// Validate and decode one device line.
///
/// The line must be exactly [`HEX_FRAME_LEN`] hex characters (either case). Any other
/// length or a non-hex character rejects the whole frame, and so does a layout that
/// fails [`RecordLayout::validate`].
pub fn decode_hex(line: &[u8], layout: &RecordLayout) -> Result<DecodedRecord> {
    layout.validate()?;
    if line.len() != HEX_FRAME_LEN {
        return Err(FrameError::InvalidLength {
            len: line.len(),
            expected: HEX_FRAME_LEN,
        });
    }

    let mut raw = [0u8; RECORD_SIZE];
    hex::decode_to_slice(line, &mut raw)?;
    Ok(DecodedRecord {
        raw,
        layout: *layout,
    })
}

/// Validate and decode a frame received from a transport.
pub fn decode_frame(frame: &RawFrame, layout: &RecordLayout) -> Result<DecodedRecord> {
    decode_hex(frame.as_bytes(), layout)
}
