//! Sensor-to-FIFO bridging for inertial and GPS feeds.
//!
//! fifobridge reads ASCII-hex IMU records from a serial line and NMEA sentences from a
//! UDP socket (or synthesizes either), normalizes them, and serves the result through a
//! named pipe that survives consumers coming and going.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial/UDP frame sources and the named-pipe endpoint
//! - [`frame`]: IMU record validation, transcoding and whole-record writes
//! - [`nmea`]: NMEA sentence construction, checksums and dead reckoning
//! - [`sim`]: synthetic IMU and GPS sources
//! - [`bridge`]: the resilient bridge loop

/// Re-export transport types.
pub mod transport {
    pub use fifobridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fifobridge_frame::*;
}

/// Re-export NMEA types.
pub mod nmea {
    pub use fifobridge_nmea::*;
}

/// Re-export emulator types.
pub mod sim {
    pub use fifobridge_sim::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use fifobridge_bridge::*;
}
