use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{NmeaError, Result};

/// Mean Earth radius used by the flat-earth approximations.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per international nautical mile.
pub const METERS_PER_NM: f64 = 1852.0;

/// Dead-reckoning position and motion.
///
/// Angles are radians, distances meters, speeds meters per second. The state is
/// advanced only through [`KinematicState::advance`] / [`KinematicState::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Course over ground, clockwise from true north.
    pub track: f64,
    /// Ground speed.
    pub speed: f64,
    /// Climb rate.
    pub vertical_rate: f64,
    sampled_at: DateTime<Utc>,
}

impl KinematicState {
    /// Stationary state at a position given in degrees and meters.
    pub fn from_degrees(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        sampled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude: latitude.to_radians(),
            longitude: longitude.to_radians(),
            altitude,
            track: 0.0,
            speed: 0.0,
            vertical_rate: 0.0,
            sampled_at,
        }
    }

    /// Set track (degrees), ground speed and climb rate.
    pub fn with_motion(mut self, track_degrees: f64, speed: f64, vertical_rate: f64) -> Self {
        self.track = track_degrees.to_radians();
        self.speed = speed;
        self.vertical_rate = vertical_rate;
        self
    }

    /// Time of the most recent sample.
    pub fn sampled_at(&self) -> DateTime<Utc> {
        self.sampled_at
    }

    /// Integrate motion over `elapsed` on a local tangent plane.
    ///
    /// Latitude is updated first; the longitude step uses the new latitude.
    pub fn advance(&mut self, elapsed: Duration) {
        let dt = elapsed.as_secs_f64();
        let step = self.speed * dt / EARTH_RADIUS_M;
        self.latitude += self.track.cos() * step;
        self.longitude += self.track.sin() / self.latitude.cos() * step;
        self.altitude += self.vertical_rate * dt;
    }

    /// Advance to wall-clock time `now` and return the elapsed interval.
    ///
    /// A `now` earlier than the previous sample advances by zero; the sample time
    /// never moves backwards.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.sampled_at).to_std().unwrap_or(Duration::ZERO);
        self.advance(elapsed);
        if now > self.sampled_at {
            self.sampled_at = now;
        }
        elapsed
    }

    /// Flat-earth distance and bearing to a waypoint.
    pub fn range_to(&self, waypoint: &Waypoint) -> RangeBearing {
        let dlat = waypoint.latitude - self.latitude;
        let dlon = self.latitude.cos() * (waypoint.longitude - self.longitude);
        let distance_nm =
            (dlat * dlat + dlon * dlon).sqrt() * EARTH_RADIUS_M / METERS_PER_NM;

        // rem_euclid rounds tiny negative angles up to exactly 360.0.
        let mut bearing_deg = dlon.atan2(dlat).to_degrees().rem_euclid(360.0);
        if bearing_deg >= 360.0 {
            bearing_deg = 0.0;
        }

        RangeBearing {
            distance_nm,
            bearing_deg,
        }
    }
}

/// Distance (nautical miles) and true bearing (degrees in `[0, 360)`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBearing {
    pub distance_nm: f64,
    pub bearing_deg: f64,
}

/// A named fixed destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    name: String,
    /// Radians.
    pub latitude: f64,
    /// Radians.
    pub longitude: f64,
}

impl Waypoint {
    /// Create a waypoint from degrees.
    ///
    /// The name becomes an NMEA field, so it must be non-empty printable ASCII
    /// without `,`, `*` or `$`.
    pub fn from_degrees(name: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_graphic() && !matches!(b, b',' | b'*' | b'$'));
        if !valid {
            return Err(NmeaError::InvalidWaypointName(name));
        }
        Ok(Self {
            name,
            latitude: latitude.to_radians(),
            longitude: longitude.to_radians(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 5, 14, 10, 30, 0).unwrap()
    }

    #[test]
    fn half_second_northbound_tick() {
        let mut state =
            KinematicState::from_degrees(49.229089, 16.556432, 270.0, epoch()).with_motion(
                0.0, 100.0, 1.0,
            );
        let start_lat = state.latitude;
        let start_lon = state.longitude;

        let elapsed = state.tick(epoch() + chrono::Duration::milliseconds(500));

        assert_eq!(elapsed, Duration::from_millis(500));
        let expected = 0.0_f64.cos() * 100.0 * 0.5 / 6_371_000.0;
        assert!((state.latitude - start_lat - expected).abs() < 1e-12);
        assert!((state.longitude - start_lon).abs() < 1e-15);
        assert!((state.altitude - 270.5).abs() < 1e-9);
        assert_eq!(state.sampled_at(), epoch() + chrono::Duration::milliseconds(500));
    }

    #[test]
    fn eastbound_advance_scales_with_latitude() {
        let mut state =
            KinematicState::from_degrees(60.0, 0.0, 0.0, epoch()).with_motion(90.0, 10.0, 0.0);
        state.advance(Duration::from_secs(1));

        let expected = 10.0 / EARTH_RADIUS_M / 60.0_f64.to_radians().cos();
        assert!((state.longitude - expected).abs() < 1e-12);
    }

    #[test]
    fn tick_never_moves_backwards() {
        let mut state =
            KinematicState::from_degrees(10.0, 10.0, 0.0, epoch()).with_motion(0.0, 50.0, 0.0);
        let before = state.clone();

        let elapsed = state.tick(epoch() - chrono::Duration::seconds(5));

        assert_eq!(elapsed, Duration::ZERO);
        assert_eq!(state, before);
    }

    #[test]
    fn range_and_bearing_to_waypoint() {
        let state = KinematicState::from_degrees(49.0, 16.0, 0.0, epoch());

        let north = Waypoint::from_degrees("N", 50.0, 16.0).unwrap();
        let rb = state.range_to(&north);
        assert!(rb.bearing_deg.abs() < 1e-9);
        assert!((rb.distance_nm - 60.0).abs() < 0.1);

        let west = Waypoint::from_degrees("W", 49.0, 15.0).unwrap();
        let rb = state.range_to(&west);
        assert!((rb.bearing_deg - 270.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_just_west_of_north_stays_below_full_circle() {
        let state = KinematicState::from_degrees(49.0, 0.0, 0.0, epoch());
        let waypoint = Waypoint::from_degrees("NW", 50.0, -1e-20).unwrap();

        let rb = state.range_to(&waypoint);

        assert!((0.0..360.0).contains(&rb.bearing_deg), "bearing {}", rb.bearing_deg);
        assert_eq!(rb.bearing_deg, 0.0);
    }

    #[test]
    fn waypoint_name_validation() {
        assert!(Waypoint::from_degrees("TEST01", 0.0, 0.0).is_ok());
        for bad in ["", "A,B", "A*B", "$A", "with space"] {
            assert!(
                matches!(
                    Waypoint::from_degrees(bad, 0.0, 0.0),
                    Err(NmeaError::InvalidWaypointName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
