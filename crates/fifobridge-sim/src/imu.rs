use std::time::Duration;

use chrono::{DateTime, Utc};
use fifobridge_frame::RECORD_SIZE;
use fifobridge_transport::{FrameSource, RawFrame, Result};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Gyroscope full scale in degrees per second (maps to `i16::MAX`).
pub const GYRO_FULL_SCALE_DPS: f64 = 1000.0;

/// Synthetic IMU settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuEmulatorConfig {
    /// Time between samples.
    pub period: Duration,
    /// Constant yaw rate in radians per second.
    pub turn_rate: f64,
    /// Accelerometer reading (raw counts).
    pub acceleration: [i16; 3],
    /// Magnetometer reading at phase zero (raw counts).
    pub magnetic_field: [i16; 3],
}

impl Default for ImuEmulatorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(10),
            turn_rate: 0.0,
            acceleration: [1401, 1924, 3333],
            magnetic_field: [-5347, 28919, -14449],
        }
    }
}

/// Produces device-format IMU lines (52 uppercase hex characters) on a fixed cadence.
///
/// The timestamp is nanoseconds since the emulator was created. A non-zero turn rate
/// rotates the magnetic vector about Z by the accumulated phase and shows up on gyro Z
/// with the device's sign, opposite to the turn rate, so the default Z negation in
/// transcoding hands consumers `+turn_rate`.
pub struct SyntheticImu<C = SystemClock> {
    config: ImuEmulatorConfig,
    clock: C,
    started_at: DateTime<Utc>,
    last_sample: DateTime<Utc>,
    phase: f64,
}

impl SyntheticImu<SystemClock> {
    pub fn new(config: ImuEmulatorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SyntheticImu<C> {
    pub fn with_clock(config: ImuEmulatorConfig, clock: C) -> Self {
        let now = clock.now();
        debug!(period = ?config.period, turn_rate = config.turn_rate, "synthetic IMU started");
        Self {
            config,
            clock,
            started_at: now,
            last_sample: now,
            phase: 0.0,
        }
    }

    /// Accumulated rotation about Z in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    fn sample(&mut self) -> [u8; RECORD_SIZE] {
        let now = self.clock.now();
        let elapsed = (now - self.last_sample).to_std().unwrap_or(Duration::ZERO);
        if now > self.last_sample {
            self.last_sample = now;
        }
        self.phase += self.config.turn_rate * elapsed.as_secs_f64();

        let gyro_z = to_i16(
            -self.config.turn_rate.to_degrees() / GYRO_FULL_SCALE_DPS * f64::from(i16::MAX),
        );

        let [mx, my, mz] = self.config.magnetic_field.map(f64::from);
        let (sin, cos) = self.phase.sin_cos();
        let magnetic = [
            to_i16(mx * cos + my * sin),
            to_i16(-mx * sin + my * cos),
            to_i16(mz),
        ];

        let timestamp = (now - self.started_at)
            .num_nanoseconds()
            .and_then(|ns| u64::try_from(ns).ok())
            .unwrap_or(0);

        let mut record = [0u8; RECORD_SIZE];
        let fields = self
            .config
            .acceleration
            .into_iter()
            .chain([0, 0, gyro_z])
            .chain(magnetic);
        for (slot, value) in record.chunks_exact_mut(2).zip(fields) {
            slot.copy_from_slice(&value.to_be_bytes());
        }
        record[18..].copy_from_slice(&timestamp.to_be_bytes());
        record
    }
}

fn to_i16(value: f64) -> i16 {
    value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

impl<C: Clock> FrameSource for SyntheticImu<C> {
    fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        self.clock.sleep(self.config.period);
        let record = self.sample();
        Ok(Some(RawFrame::new(hex::encode_upper(record).into_bytes())))
    }

    fn transport_name(&self) -> &'static str {
        "synthetic-imu"
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use fifobridge_frame::{decode_frame, transcode, RecordLayout, HEX_FRAME_LEN};

    use super::*;
    use crate::clock::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn emits_device_format_lines() {
        let mut imu = SyntheticImu::with_clock(ImuEmulatorConfig::default(), clock());

        let frame = imu.read_frame().unwrap().unwrap();
        assert_eq!(frame.len(), HEX_FRAME_LEN);
        assert!(frame
            .as_bytes()
            .iter()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));

        let record = decode_frame(&frame, &RecordLayout::default()).unwrap();
        assert_eq!(record.acceleration(), [1401, 1924, 3333]);
        assert_eq!(record.angular_rate(), [0, 0, 0]);
        assert_eq!(record.magnetic_field(), [-5347, 28919, -14449]);
        assert_eq!(record.timestamp(), 10_000_000);
    }

    #[test]
    fn timestamp_tracks_the_clock() {
        let clock = clock();
        let config = ImuEmulatorConfig {
            period: Duration::from_millis(20),
            ..ImuEmulatorConfig::default()
        };
        let mut imu = SyntheticImu::with_clock(config, clock.clone());

        imu.read_frame().unwrap();
        clock.advance(Duration::from_millis(5));
        let frame = imu.read_frame().unwrap().unwrap();

        let record = decode_frame(&frame, &RecordLayout::default()).unwrap();
        assert_eq!(record.timestamp(), 45_000_000);
    }

    #[test]
    fn turn_rate_drives_gyro_and_heading() {
        let config = ImuEmulatorConfig {
            period: Duration::from_secs(1),
            turn_rate: std::f64::consts::FRAC_PI_2,
            ..ImuEmulatorConfig::default()
        };
        let mut imu = SyntheticImu::with_clock(config, clock());

        let frame = imu.read_frame().unwrap().unwrap();
        let record = decode_frame(&frame, &RecordLayout::default()).unwrap();

        // 90 deg/s at a 1000 deg/s full scale, device sign.
        assert_eq!(record.angular_rate(), [0, 0, -2949]);
        assert_eq!(record.magnetic_field(), [28919, 5347, -14449]);
        assert!((imu.phase() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let out = transcode(&record);
        assert_eq!(out.as_bytes()[10..12], 2949i16.to_be_bytes());
    }

    #[test]
    fn gyro_saturates_beyond_full_scale() {
        let config = ImuEmulatorConfig {
            turn_rate: 2000.0_f64.to_radians(),
            ..ImuEmulatorConfig::default()
        };
        let mut imu = SyntheticImu::with_clock(config, clock());

        let frame = imu.read_frame().unwrap().unwrap();
        let record = decode_frame(&frame, &RecordLayout::default()).unwrap();
        assert_eq!(record.angular_rate()[2], i16::MIN);
        assert_eq!(transcode(&record).as_bytes()[10..12], i16::MAX.to_be_bytes());
    }

    #[test]
    fn clock_going_backwards_does_not_rewind_phase() {
        let clock = clock();
        let config = ImuEmulatorConfig {
            turn_rate: 1.0,
            ..ImuEmulatorConfig::default()
        };
        let mut imu = SyntheticImu::with_clock(config, clock.clone());
        imu.read_frame().unwrap();
        let phase = imu.phase();

        clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap());
        imu.read_frame().unwrap();

        assert_eq!(imu.phase(), phase);
    }
}
