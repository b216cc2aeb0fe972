use fifobridge_bridge::{GpsPipeline, GpsSource};
use fifobridge_sim::GpsEmulatorConfig;
use fifobridge_transport::UdpConfig;

use crate::cmd::{parse_duration, run_bridge, GpsArgs, GpsSourceKind};
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub fn run(args: GpsArgs, format: OutputFormat) -> CliResult<i32> {
    let source = match args.source {
        GpsSourceKind::Udp => GpsSource::Udp(UdpConfig {
            bind: args.bind,
            ..UdpConfig::default()
        }),
        GpsSourceKind::Synthetic => GpsSource::Synthetic(GpsEmulatorConfig {
            period: parse_duration(&args.interval)?,
            ..GpsEmulatorConfig::default()
        }),
    };

    let pipeline = GpsPipeline::new(source).with_checksum_verification(args.verify_checksums);
    run_bridge(&args.pipe, pipeline, &args.bridge, format)
}
