//! Synthetic sensor sources.
//!
//! The emulators implement [`FrameSource`](fifobridge_transport::FrameSource) and
//! produce exactly what real hardware would put on the wire: 52-character hex lines
//! for the IMU, CRLF-terminated NMEA sentences for the GPS. Pacing and timestamps go
//! through a [`Clock`], so tests can drive them with a [`ManualClock`].

pub mod clock;
pub mod gps;
pub mod imu;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gps::{GpsEmulatorConfig, SyntheticGps};
pub use imu::{ImuEmulatorConfig, SyntheticImu, GYRO_FULL_SCALE_DPS};
