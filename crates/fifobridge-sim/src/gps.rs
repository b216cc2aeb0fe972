use std::time::Duration;

use fifobridge_nmea::{build, KinematicState, SentenceKind, Waypoint};
use fifobridge_transport::{FrameSource, RawFrame, Result, TransportError};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Synthetic GPS settings. Angles are degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsEmulatorConfig {
    /// Time between sentences.
    pub period: Duration,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters.
    pub altitude: f64,
    pub track: f64,
    /// Meters per second.
    pub speed: f64,
    /// Meters per second.
    pub vertical_rate: f64,
    pub waypoint_name: String,
    pub waypoint_latitude: f64,
    pub waypoint_longitude: f64,
}

impl Default for GpsEmulatorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(500),
            latitude: 49.229089,
            longitude: 16.556432,
            altitude: 270.0,
            track: 0.0,
            speed: 100.0,
            vertical_rate: 1.0,
            waypoint_name: "TEST01".to_string(),
            waypoint_latitude: 49.256322,
            waypoint_longitude: 16.664412,
        }
    }
}

/// Dead-reckoning GPS that emits one CRLF-terminated sentence per period, cycling
/// GGA, RMC, RMB, WPL.
///
/// The state is advanced to the clock's current time before each sentence.
pub struct SyntheticGps<C = SystemClock> {
    period: Duration,
    clock: C,
    state: KinematicState,
    waypoint: Waypoint,
    next: usize,
}

impl SyntheticGps<SystemClock> {
    pub fn new(config: &GpsEmulatorConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SyntheticGps<C> {
    /// Fails only if the waypoint name cannot be carried in a sentence.
    pub fn with_clock(config: &GpsEmulatorConfig, clock: C) -> Result<Self> {
        let waypoint = Waypoint::from_degrees(
            config.waypoint_name.clone(),
            config.waypoint_latitude,
            config.waypoint_longitude,
        )
        .map_err(|e| TransportError::Generator(e.to_string()))?;

        let state =
            KinematicState::from_degrees(config.latitude, config.longitude, config.altitude, clock.now())
                .with_motion(config.track, config.speed, config.vertical_rate);

        debug!(
            period = ?config.period,
            waypoint = waypoint.name(),
            "synthetic GPS started"
        );

        Ok(Self {
            period: config.period,
            clock,
            state,
            waypoint,
            next: 0,
        })
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn waypoint(&self) -> &Waypoint {
        &self.waypoint
    }
}

impl<C: Clock> FrameSource for SyntheticGps<C> {
    fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        self.clock.sleep(self.period);
        self.state.tick(self.clock.now());

        let kind = SentenceKind::CYCLE[self.next];
        self.next = (self.next + 1) % SentenceKind::CYCLE.len();

        let sentence = build(kind, &self.state, Some(&self.waypoint))
            .map_err(|e| TransportError::Generator(e.to_string()))?;
        Ok(Some(RawFrame::new(sentence.to_line())))
    }

    fn transport_name(&self) -> &'static str {
        "synthetic-gps"
    }
}
