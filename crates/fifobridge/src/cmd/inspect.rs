use fifobridge_bridge::ShutdownSignal;
use fifobridge_frame::{decode_frame, RecordLayout};
use fifobridge_transport::TransportError;
use tracing::debug;

use crate::cmd::{install_shutdown_handler, open_input, InspectArgs};
use crate::exit::{transport_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = RecordLayout::default().with_negated_axis(args.negate_axis.into());
    let mut source = open_input(&args.source)?;

    let shutdown = ShutdownSignal::new();
    install_shutdown_handler(shutdown.clone())?;

    let mut printed = 0u64;
    let mut rejected = 0u64;

    while !shutdown.is_requested() {
        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(TransportError::Closed) => break,
            Err(err) => return Err(transport_error("read failed", err)),
        };

        match decode_frame(&frame, &layout) {
            Ok(record) => {
                print_record(printed, &record, format);
                printed += 1;
            }
            Err(err) => {
                rejected += 1;
                debug!(error = %err, len = frame.len(), "skipping line");
                continue;
            }
        }

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    if printed == 0 && rejected > 0 {
        eprintln!("error: no valid records ({rejected} lines rejected)");
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
