use std::time::Duration;

use fifobridge_frame::{FrameError, RecordWriter};
use fifobridge_transport::{FrameSource, PipeEndpoint, PipeWriter, TransportError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::{BridgeError, Result};
use crate::pipeline::Pipeline;
use crate::shutdown::ShutdownSignal;
use crate::state::BridgeState;

/// Bridge loop tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Back-off after a failed acquisition attempt.
    pub retry_delay: Duration,
    /// How often to check for a consumer while none is attached, and for shutdown
    /// while an attached consumer has stopped reading.
    pub attach_poll_interval: Duration,
    /// Stop cleanly after this many forwarded records.
    pub max_records: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            attach_poll_interval: Duration::from_millis(100),
            max_records: None,
        }
    }
}

/// Counters over the lifetime of one [`Bridge::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Completed acquisitions (consumer attached and transport opened).
    pub sessions: u64,
    pub records_forwarded: u64,
    pub records_rejected: u64,
    /// Sessions ended by a pipe write failure.
    pub detaches: u64,
    /// Sessions ended by a transport read failure.
    pub transport_failures: u64,
}

enum StreamEnd {
    Shutdown,
    LimitReached,
    SinkFailed(FrameError),
    TransportFailed(TransportError),
}

/// Forwards records from a pipeline's transport into a pipe endpoint.
///
/// The endpoint is owned for the bridge's whole life and dropped with it, which is
/// what removes a [`NamedPipe`](fifobridge_transport::NamedPipe) from the filesystem.
/// Writer and transport handles live for one session only.
pub struct Bridge<E, P> {
    endpoint: E,
    pipeline: P,
    config: BridgeConfig,
    shutdown: ShutdownSignal,
    state: BridgeState,
    stats: BridgeStats,
}

impl<E: PipeEndpoint, P: Pipeline> Bridge<E, P> {
    pub fn new(endpoint: E, pipeline: P, shutdown: ShutdownSignal) -> Self {
        Self {
            endpoint,
            pipeline,
            config: BridgeConfig::default(),
            shutdown,
            state: BridgeState::Idle,
            stats: BridgeStats::default(),
        }
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Run until shutdown is requested or the record limit is reached.
    ///
    /// Transport failures and consumer detaches are retried without limit. The only
    /// error is losing the pipe endpoint itself.
    pub fn run(&mut self) -> Result<BridgeStats> {
        info!(
            pipeline = self.pipeline.name(),
            pipe = ?self.endpoint.path(),
            "bridge starting"
        );

        let outcome = self.run_sessions();
        self.enter(BridgeState::ShuttingDown);

        info!(
            sessions = self.stats.sessions,
            forwarded = self.stats.records_forwarded,
            rejected = self.stats.records_rejected,
            detaches = self.stats.detaches,
            transport_failures = self.stats.transport_failures,
            "bridge stopped"
        );
        outcome.map(|()| self.stats.clone())
    }

    fn run_sessions(&mut self) -> Result<()> {
        loop {
            self.enter(BridgeState::Acquiring);
            let Some((writer, source)) = self.acquire()? else {
                return Ok(());
            };
            self.stats.sessions += 1;

            self.enter(BridgeState::Streaming);
            match self.stream(writer, source) {
                StreamEnd::Shutdown | StreamEnd::LimitReached => return Ok(()),
                StreamEnd::SinkFailed(err) => {
                    self.stats.detaches += 1;
                    if err.is_consumer_detached() {
                        warn!(error = %err, "consumer detached; waiting for a new reader");
                    } else {
                        warn!(error = %err, "pipe write failed; reacquiring");
                    }
                }
                StreamEnd::TransportFailed(err) => {
                    self.stats.transport_failures += 1;
                    warn!(error = %err, "transport failed; reacquiring");
                }
            }
            self.enter(BridgeState::Draining);
        }
    }

    /// Wait for a consumer, then open the transport. `None` means shutdown.
    fn acquire(&mut self) -> Result<Option<(RecordWriter<E::Writer>, Box<dyn FrameSource>)>> {
        loop {
            if self.shutdown.is_requested() {
                return Ok(None);
            }

            let writer = match self.endpoint.try_open_writer() {
                Ok(Some(writer)) => writer,
                Ok(None) => {
                    if self.shutdown.wait_timeout(self.config.attach_poll_interval) {
                        return Ok(None);
                    }
                    continue;
                }
                Err(err @ TransportError::PathReplaced(_)) => {
                    return Err(BridgeError::PipeLost(err));
                }
                Err(err) => {
                    warn!(error = %err, "failed to open pipe for writing; retrying");
                    if self.shutdown.wait_timeout(self.config.retry_delay) {
                        return Ok(None);
                    }
                    continue;
                }
            };
            info!(pipe = ?self.endpoint.path(), "consumer attached");

            match self.pipeline.open_source() {
                Ok(source) => {
                    info!(transport = source.transport_name(), "transport opened");
                    return Ok(Some((RecordWriter::new(writer), source)));
                }
                Err(err) => {
                    warn!(error = %err, "failed to open transport; retrying");
                    drop(writer);
                    if self.shutdown.wait_timeout(self.config.retry_delay) {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn stream(
        &mut self,
        mut writer: RecordWriter<E::Writer>,
        mut source: Box<dyn FrameSource>,
    ) -> StreamEnd {
        let shutdown = self.shutdown.clone();
        let poll = self.config.attach_poll_interval;
        let mut wait_for_room = |pipe: &E::Writer| -> std::io::Result<bool> {
            while !shutdown.is_requested() {
                if pipe.wait_writable(poll)? {
                    return Ok(true);
                }
            }
            Ok(false)
        };

        loop {
            if self.shutdown.is_requested() {
                return StreamEnd::Shutdown;
            }
            if let Some(limit) = self.config.max_records {
                if self.stats.records_forwarded >= limit {
                    info!(limit, "record limit reached");
                    return StreamEnd::LimitReached;
                }
            }

            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(err) => return StreamEnd::TransportFailed(err),
            };

            let record = match self.pipeline.process(&frame) {
                Ok(record) => record,
                Err(rejection) => {
                    self.stats.records_rejected += 1;
                    debug!(error = %rejection, len = frame.len(), "dropped frame");
                    continue;
                }
            };

            match writer.write_record_with(&record, &mut wait_for_room) {
                Ok(()) => {}
                Err(FrameError::Cancelled) => {
                    info!("shutdown requested while the consumer was not reading");
                    return StreamEnd::Shutdown;
                }
                Err(err) => return StreamEnd::SinkFailed(err),
            }
            self.stats.records_forwarded += 1;
            trace!(len = record.len(), "forwarded record");
        }
    }

    fn enter(&mut self, next: BridgeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "bridge state");
        self.state = next;
    }
}
