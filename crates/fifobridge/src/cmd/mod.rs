use std::fs::File;
#[cfg(unix)]
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use fifobridge_bridge::{BridgeConfig, ShutdownSignal};
#[cfg(unix)]
use fifobridge_bridge::{Bridge, Pipeline};
use fifobridge_frame::Axis;
#[cfg(unix)]
use fifobridge_transport::{NamedPipe, PollingReader};
use fifobridge_transport::{FrameSource, LineSource, SerialConfig, SerialSource};

#[cfg(unix)]
use crate::exit::{bridge_error, SUCCESS};
use crate::exit::{io_error, transport_error, CliError, CliResult, INTERNAL, USAGE};
#[cfg(unix)]
use crate::output::print_stats;
use crate::output::OutputFormat;

pub mod calibrate;
pub mod doctor;
#[cfg(unix)]
pub mod gps;
#[cfg(unix)]
pub mod imu;
pub mod inspect;
pub mod version;

#[cfg(unix)]
const STDIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge IMU records into a named pipe.
    #[cfg(unix)]
    Imu(ImuArgs),
    /// Bridge GPS sentences into a named pipe.
    #[cfg(unix)]
    Gps(GpsArgs),
    /// Decode IMU hex lines and print them.
    Inspect(InspectArgs),
    /// Estimate gyroscope bias from a stationary IMU.
    Calibrate(CalibrateArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        #[cfg(unix)]
        Command::Imu(args) => imu::run(args, format),
        #[cfg(unix)]
        Command::Gps(args) => gps::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Calibrate(args) => calibrate::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AxisArg {
    X,
    Y,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImuSourceKind {
    /// Serial device emitting hex lines.
    Serial,
    /// Built-in emulator.
    Synthetic,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum GpsSourceKind {
    /// UDP datagrams carrying NMEA sentences.
    Udp,
    /// Built-in dead-reckoning emulator.
    Synthetic,
}

/// Options shared by the bridge commands.
#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Stop after forwarding N records.
    #[arg(long)]
    pub count: Option<u64>,
    /// Back-off between acquisition attempts (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub retry_delay: String,
}

impl BridgeArgs {
    pub fn to_config(&self) -> CliResult<BridgeConfig> {
        Ok(BridgeConfig {
            retry_delay: parse_duration(&self.retry_delay)?,
            max_records: self.count,
            ..BridgeConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct ImuArgs {
    /// Named pipe to create.
    #[arg(long, env = "FIFOBRIDGE_IMU_PIPE", default_value = "imufifo")]
    pub pipe: PathBuf,
    /// Where records come from.
    #[arg(long, value_enum, default_value = "serial")]
    pub source: ImuSourceKind,
    /// Serial device path.
    #[arg(long, env = "FIFOBRIDGE_IMU_DEVICE", default_value = "/dev/ttyACM3")]
    pub device: PathBuf,
    /// Serial line speed.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Keep the first line after opening the device.
    #[arg(long)]
    pub no_skip_banner: bool,
    /// Angular-rate axis negated on output.
    #[arg(long, value_enum, default_value = "z")]
    pub negate_axis: AxisArg,
    /// Synthetic sample interval (e.g. 10ms).
    #[arg(long, default_value = "10ms")]
    pub interval: String,
    /// Synthetic yaw rate in degrees per second, as seen on the pipe.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub turn_rate: f64,
    #[command(flatten)]
    pub bridge: BridgeArgs,
}

#[derive(Args, Debug)]
pub struct GpsArgs {
    /// Named pipe to create.
    #[arg(long, env = "FIFOBRIDGE_GPS_PIPE", default_value = "gpsfifo")]
    pub pipe: PathBuf,
    /// Where sentences come from.
    #[arg(long, value_enum, default_value = "udp")]
    pub source: GpsSourceKind,
    /// UDP address to bind.
    #[arg(long, env = "FIFOBRIDGE_GPS_BIND", default_value = "127.0.0.1:4353")]
    pub bind: std::net::SocketAddrV4,
    /// Drop datagrams containing a sentence with a bad checksum.
    #[arg(long)]
    pub verify_checksums: bool,
    /// Synthetic sentence interval (e.g. 500ms).
    #[arg(long, default_value = "500ms")]
    pub interval: String,
    #[command(flatten)]
    pub bridge: BridgeArgs,
}

/// Where `inspect` and `calibrate` read hex lines from.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Serial device to read.
    #[arg(long, conflicts_with = "input")]
    pub device: Option<PathBuf>,
    /// Serial line speed.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Keep the first line after opening the device.
    #[arg(long)]
    pub no_skip_banner: bool,
    /// File of hex lines; `-` or omitted reads stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Angular-rate axis negated in `raw` output.
    #[arg(long, value_enum, default_value = "z")]
    pub negate_axis: AxisArg,
    /// Exit after printing N records.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of valid frames to average.
    #[arg(long, default_value_t = 1000)]
    pub frames: u64,
    /// Print the running mean after every frame.
    #[arg(long)]
    pub follow: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// IMU pipe path to check.
    #[arg(long, env = "FIFOBRIDGE_IMU_PIPE", default_value = "imufifo")]
    pub imu_pipe: PathBuf,
    /// GPS pipe path to check.
    #[arg(long, env = "FIFOBRIDGE_GPS_PIPE", default_value = "gpsfifo")]
    pub gps_pipe: PathBuf,
    /// Serial device to check.
    #[arg(long, env = "FIFOBRIDGE_IMU_DEVICE", default_value = "/dev/ttyACM3")]
    pub device: PathBuf,
}

/// Parse `500ms`, `2s` or bare seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Route SIGINT/SIGTERM/SIGHUP to a shutdown request.
pub(crate) fn install_shutdown_handler(signal: ShutdownSignal) -> CliResult<()> {
    ctrlc::set_handler(move || {
        signal.request();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Create the pipe, run the bridge until shutdown, then remove the pipe.
#[cfg(unix)]
pub(crate) fn run_bridge<P: Pipeline>(
    pipe: &Path,
    pipeline: P,
    args: &BridgeArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let config = args.to_config()?;
    let shutdown = ShutdownSignal::new();
    install_shutdown_handler(shutdown.clone())?;

    let endpoint =
        NamedPipe::create(pipe).map_err(|err| transport_error("failed to create named pipe", err))?;
    let mut bridge = Bridge::new(endpoint, pipeline, shutdown).with_config(config);
    let outcome = bridge.run();
    drop(bridge);

    let stats = outcome.map_err(|err| bridge_error("bridge stopped", err))?;
    print_stats(&stats, format);
    Ok(SUCCESS)
}

/// Open the hex-line source selected by `args`.
pub(crate) fn open_input(args: &InputArgs) -> CliResult<Box<dyn FrameSource>> {
    if let Some(device) = &args.device {
        let config = SerialConfig {
            path: device.clone(),
            baud_rate: args.baud,
            skip_banner: !args.no_skip_banner,
            ..SerialConfig::default()
        };
        let source = SerialSource::open(&config)
            .map_err(|err| transport_error("failed to open serial device", err))?;
        return Ok(Box::new(source));
    }

    match &args.input {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed to open {}", path.display()), err))?;
            Ok(Box::new(LineSource::new(file)))
        }
        _ => open_stdin(),
    }
}

/// Stdin read through a timed poll so a quiet terminal still sees Ctrl-C.
#[cfg(unix)]
fn open_stdin() -> CliResult<Box<dyn FrameSource>> {
    use std::os::fd::AsFd;

    let fd = std::io::stdin()
        .as_fd()
        .try_clone_to_owned()
        .map_err(|err| io_error("failed to duplicate stdin", err))?;
    let reader = PollingReader::new(File::from(fd), STDIN_POLL_INTERVAL);
    Ok(Box::new(LineSource::new(reader)))
}

#[cfg(not(unix))]
fn open_stdin() -> CliResult<Box<dyn FrameSource>> {
    Ok(Box::new(LineSource::new(std::io::stdin().lock())))
}
