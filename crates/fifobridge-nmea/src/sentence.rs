use std::fmt;

use crate::checksum::seal;
use crate::coord::{format_latitude, format_longitude};
use crate::error::{NmeaError, Result};
use crate::kinematics::{KinematicState, Waypoint};

/// Cross-track/range fields cannot represent more than three integer digits.
const MAX_RANGE_NM: f64 = 999.0;

const KNOTS_PER_MPS: f64 = 3.6 / 1.852;

/// The sentences the GPS path can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    /// `$GPGGA`: fix data.
    Fix,
    /// `$GPRMC`: recommended minimum.
    RecommendedMinimum,
    /// `$GPRMB`: navigation to the active waypoint.
    WaypointBearing,
    /// `$GPWPL`: waypoint location.
    WaypointLocation,
}

impl SentenceKind {
    /// Emission order of the GPS emulator.
    pub const CYCLE: [SentenceKind; 4] = [
        SentenceKind::Fix,
        SentenceKind::RecommendedMinimum,
        SentenceKind::WaypointBearing,
        SentenceKind::WaypointLocation,
    ];

    /// Talker + sentence identifier.
    pub fn tag(self) -> &'static str {
        match self {
            SentenceKind::Fix => "GPGGA",
            SentenceKind::RecommendedMinimum => "GPRMC",
            SentenceKind::WaypointBearing => "GPRMB",
            SentenceKind::WaypointLocation => "GPWPL",
        }
    }

    pub fn needs_waypoint(self) -> bool {
        matches!(
            self,
            SentenceKind::WaypointBearing | SentenceKind::WaypointLocation
        )
    }
}

impl fmt::Display for SentenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A complete `$...*HH` sentence, without line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    kind: SentenceKind,
    text: String,
}

impl Sentence {
    pub fn kind(&self) -> SentenceKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Bytes between `$` and `*`.
    pub fn payload(&self) -> &str {
        let end = self.text.len() - 3;
        &self.text[1..end]
    }

    /// The appended checksum value.
    pub fn checksum(&self) -> u8 {
        let field = &self.text[self.text.len() - 2..];
        u8::from_str_radix(field, 16).unwrap_or_default()
    }

    /// The sentence as written to the pipe, CRLF-terminated.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.text.len() + 2);
        line.extend_from_slice(self.text.as_bytes());
        line.extend_from_slice(b"\r\n");
        line
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Build one sentence from the current state.
///
/// Time and date fields come from the state's sample time (UTC).
pub fn build(
    kind: SentenceKind,
    state: &KinematicState,
    waypoint: Option<&Waypoint>,
) -> Result<Sentence> {
    let body = match (kind, waypoint) {
        (SentenceKind::Fix, _) => fix(state),
        (SentenceKind::RecommendedMinimum, _) => recommended_minimum(state),
        (SentenceKind::WaypointBearing, Some(wp)) => waypoint_bearing(state, wp),
        (SentenceKind::WaypointLocation, Some(wp)) => waypoint_location(wp),
        (kind, None) => return Err(NmeaError::MissingWaypoint(kind)),
    };

    Ok(Sentence {
        kind,
        text: seal(&body),
    })
}

fn position(state: &KinematicState) -> String {
    format!(
        "{},{}",
        format_latitude(state.latitude),
        format_longitude(state.longitude)
    )
}

fn waypoint_position(waypoint: &Waypoint) -> String {
    format!(
        "{},{}",
        format_latitude(waypoint.latitude),
        format_longitude(waypoint.longitude)
    )
}

fn fix(state: &KinematicState) -> String {
    format!(
        "$GPGGA,{},{},1,08,0.0,{:.1},M,0.0,M,,",
        state.sampled_at().format("%H%M%S"),
        position(state),
        state.altitude
    )
}

fn recommended_minimum(state: &KinematicState) -> String {
    format!(
        "$GPRMC,{},A,{},{:.2},{:.2},{},0.0,E",
        state.sampled_at().format("%H%M%S"),
        position(state),
        state.speed * KNOTS_PER_MPS,
        state.track.to_degrees(),
        state.sampled_at().format("%d%m%y")
    )
}

fn waypoint_bearing(state: &KinematicState, waypoint: &Waypoint) -> String {
    let range = state.range_to(waypoint);
    format!(
        "$GPRMB,A,0.0,L,,{},{},{:04.1},{:04.1},0.0,V",
        waypoint.name(),
        waypoint_position(waypoint),
        range.distance_nm.min(MAX_RANGE_NM),
        bearing_field(range.bearing_deg)
    )
}

/// Round to the printed tenth; a bearing that rounds up to 360.0 reads as 0.0.
fn bearing_field(bearing_deg: f64) -> f64 {
    let rounded = (bearing_deg * 10.0).round() / 10.0;
    if rounded >= 360.0 {
        0.0
    } else {
        rounded
    }
}

fn waypoint_location(waypoint: &Waypoint) -> String {
    format!("$GPWPL,{},{}", waypoint_position(waypoint), waypoint.name())
}
