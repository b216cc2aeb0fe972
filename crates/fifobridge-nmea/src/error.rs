use crate::sentence::SentenceKind;

/// Errors that can occur while building or verifying sentences.
#[derive(Debug, thiserror::Error)]
pub enum NmeaError {
    /// The sentence kind needs a waypoint and none was given.
    #[error("{0} sentence requires a waypoint")]
    MissingWaypoint(SentenceKind),

    /// Waypoint names must be printable ASCII without NMEA delimiters.
    #[error("invalid waypoint name {0:?}")]
    InvalidWaypointName(String),

    /// The sentence does not start with `$`.
    #[error("sentence does not start with '$'")]
    MissingDelimiter,

    /// The sentence has no `*` checksum separator.
    #[error("sentence has no checksum")]
    MissingChecksum,

    /// The checksum field is not two hex digits.
    #[error("malformed checksum field {0:?}")]
    MalformedChecksum(String),

    /// The checksum does not match the payload.
    #[error("checksum mismatch (computed {computed:02X}, sentence carries {carried:02X})")]
    ChecksumMismatch { computed: u8, carried: u8 },
}

pub type Result<T> = std::result::Result<T, NmeaError>;
