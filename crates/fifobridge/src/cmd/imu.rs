use fifobridge_bridge::{ImuPipeline, ImuSource};
use fifobridge_frame::RecordLayout;
use fifobridge_sim::ImuEmulatorConfig;
use fifobridge_transport::SerialConfig;

use crate::cmd::{parse_duration, run_bridge, ImuArgs, ImuSourceKind};
use crate::exit::{bridge_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: ImuArgs, format: OutputFormat) -> CliResult<i32> {
    let source = match args.source {
        ImuSourceKind::Serial => ImuSource::Serial(SerialConfig {
            path: args.device.clone(),
            baud_rate: args.baud,
            skip_banner: !args.no_skip_banner,
            ..SerialConfig::default()
        }),
        ImuSourceKind::Synthetic => ImuSource::Synthetic(ImuEmulatorConfig {
            period: parse_duration(&args.interval)?,
            turn_rate: args.turn_rate.to_radians(),
            ..ImuEmulatorConfig::default()
        }),
    };

    let layout = RecordLayout::default().with_negated_axis(args.negate_axis.into());
    let pipeline =
        ImuPipeline::new(source, layout).map_err(|err| bridge_error("invalid configuration", err))?;

    run_bridge(&args.pipe, pipeline, &args.bridge, format)
}
