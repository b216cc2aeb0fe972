use bytes::Bytes;
use fifobridge_frame::{decode_frame, transcode, RecordLayout};
use fifobridge_nmea::verify;
use fifobridge_sim::{GpsEmulatorConfig, ImuEmulatorConfig, SyntheticGps, SyntheticImu};
use fifobridge_transport::{FrameSource, RawFrame, SerialConfig, SerialSource};
#[cfg(unix)]
use fifobridge_transport::{UdpConfig, UdpSource};

use crate::error::{BridgeError, Rejection};

/// One sensor path: how to open its transport and how to turn a frame into a record.
pub trait Pipeline {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Open a fresh transport handle. Called once per acquisition.
    fn open_source(&mut self) -> fifobridge_transport::Result<Box<dyn FrameSource>>;

    /// Validate one frame and produce the bytes to write to the pipe.
    fn process(&mut self, frame: &RawFrame) -> Result<Bytes, Rejection>;
}

/// Where IMU frames come from.
#[derive(Debug, Clone)]
pub enum ImuSource {
    Serial(SerialConfig),
    Synthetic(ImuEmulatorConfig),
}

/// Hex lines in, transcoded 26-byte records out.
#[derive(Debug, Clone)]
pub struct ImuPipeline {
    source: ImuSource,
    layout: RecordLayout,
}

impl ImuPipeline {
    pub fn new(source: ImuSource, layout: RecordLayout) -> crate::Result<Self> {
        layout.validate().map_err(BridgeError::Layout)?;
        Ok(Self { source, layout })
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }
}

impl Pipeline for ImuPipeline {
    fn name(&self) -> &'static str {
        "imu"
    }

    fn open_source(&mut self) -> fifobridge_transport::Result<Box<dyn FrameSource>> {
        Ok(match &self.source {
            ImuSource::Serial(config) => Box::new(SerialSource::open(config)?),
            ImuSource::Synthetic(config) => Box::new(SyntheticImu::new(config.clone())),
        })
    }

    fn process(&mut self, frame: &RawFrame) -> Result<Bytes, Rejection> {
        let record = decode_frame(frame, &self.layout)?;
        Ok(transcode(&record).into_bytes())
    }
}

/// Where GPS sentences come from.
#[derive(Debug, Clone)]
pub enum GpsSource {
    #[cfg(unix)]
    Udp(UdpConfig),
    Synthetic(GpsEmulatorConfig),
}

/// Sentences pass through byte for byte, optionally checksum-verified.
#[derive(Debug, Clone)]
pub struct GpsPipeline {
    source: GpsSource,
    verify_checksums: bool,
}

impl GpsPipeline {
    pub fn new(source: GpsSource) -> Self {
        Self {
            source,
            verify_checksums: false,
        }
    }

    /// Drop frames carrying any sentence whose checksum does not match.
    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }
}

impl Pipeline for GpsPipeline {
    fn name(&self) -> &'static str {
        "gps"
    }

    fn open_source(&mut self) -> fifobridge_transport::Result<Box<dyn FrameSource>> {
        Ok(match &self.source {
            #[cfg(unix)]
            GpsSource::Udp(config) => Box::new(UdpSource::bind(config)?),
            GpsSource::Synthetic(config) => Box::new(SyntheticGps::new(config)?),
        })
    }

    fn process(&mut self, frame: &RawFrame) -> Result<Bytes, Rejection> {
        if self.verify_checksums {
            let text = std::str::from_utf8(frame.as_bytes()).map_err(|_| Rejection::NotText)?;
            // A datagram may carry several sentences.
            for line in text.lines().filter(|line| !line.trim().is_empty()) {
                verify(line)?;
            }
        }
        Ok(frame.clone().into_bytes())
    }
}
