//! NMEA-0183 sentence construction and dead-reckoning state.
//!
//! Builds the four sentences the GPS path emits (`$GPGGA`, `$GPRMC`, `$GPRMB`,
//! `$GPWPL`) from a [`KinematicState`] and an optional [`Waypoint`]. Every sentence
//! ends in `*HH`, the XOR of all bytes between `$` and `*`.

pub mod checksum;
pub mod coord;
pub mod error;
pub mod kinematics;
pub mod sentence;

pub use checksum::{checksum, verify};
pub use coord::{format_latitude, format_longitude};
pub use error::{NmeaError, Result};
pub use kinematics::{KinematicState, RangeBearing, Waypoint, EARTH_RADIUS_M, METERS_PER_NM};
pub use sentence::{build, Sentence, SentenceKind};
