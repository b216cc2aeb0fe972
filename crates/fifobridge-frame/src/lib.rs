//! IMU frame validation, decoding and transcoding.
//!
//! A device frame is one line of 52 ASCII hex characters that decodes to a 26-byte
//! big-endian record:
//! - 3 x int16 acceleration
//! - 3 x int16 angular rate
//! - 3 x int16 magnetic field
//! - 1 x uint64 timestamp (nanoseconds)
//!
//! Transcoding negates one angular-rate axis with saturation and flips the timestamp
//! to little-endian. Anything that is not a well-formed frame is rejected whole.

pub mod codec;
pub mod error;
pub mod transcode;
pub mod writer;

pub use codec::{
    decode_frame, decode_hex, Axis, DecodedRecord, RecordLayout, HEX_FRAME_LEN, RECORD_SIZE,
};
pub use error::{FrameError, Result};
pub use transcode::{negate_saturating, swap_timestamp, transcode, TranscodedRecord};
pub use writer::RecordWriter;
