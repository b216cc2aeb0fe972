//! The bridge core: move frames from a sensor transport into a named pipe and keep
//! doing so across transport failures and consumer detach/re-attach cycles.
//!
//! A [`Bridge`] owns a [`PipeEndpoint`](fifobridge_transport::PipeEndpoint) and a
//! [`Pipeline`]. The pipeline knows how to open its transport and how to turn one raw
//! frame into one output record; the bridge runs the
//! `Acquiring -> Streaming -> Draining -> Acquiring` cycle until a [`ShutdownSignal`]
//! fires or the record limit is reached.

pub mod error;
pub mod pipeline;
pub mod session;
pub mod shutdown;
pub mod state;

pub use error::{BridgeError, Rejection, Result};
pub use pipeline::{GpsPipeline, GpsSource, ImuPipeline, ImuSource, Pipeline};
pub use session::{Bridge, BridgeConfig, BridgeStats};
pub use shutdown::ShutdownSignal;
pub use state::BridgeState;
