use fifobridge_frame::FrameError;
use fifobridge_nmea::NmeaError;
use fifobridge_transport::TransportError;

/// Errors that stop the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The pipe path no longer refers to the pipe the bridge was given.
    #[error("pipe endpoint lost: {0}")]
    PipeLost(#[source] TransportError),

    /// The IMU record layout is inconsistent.
    #[error("invalid record layout: {0}")]
    Layout(#[source] FrameError),
}

/// Why a single frame was dropped. Never ends a session.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    #[error("bad sentence: {0}")]
    Sentence(#[from] NmeaError),

    #[error("sentence is not ASCII text")]
    NotText,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
