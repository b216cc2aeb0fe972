use fifobridge_bridge::ShutdownSignal;
use fifobridge_frame::{decode_frame, RecordLayout};
use fifobridge_transport::TransportError;
use tracing::{debug, info};

use crate::cmd::{install_shutdown_handler, open_input, CalibrateArgs};
use crate::exit::{transport_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{format_bias, print_bias, OutputFormat};

/// Running sum of angular-rate samples.
#[derive(Debug, Default)]
struct GyroBias {
    frames: u64,
    sums: [i64; 3],
}

impl GyroBias {
    fn push(&mut self, sample: [i16; 3]) {
        for (sum, value) in self.sums.iter_mut().zip(sample) {
            *sum += i64::from(value);
        }
        self.frames += 1;
    }

    fn mean(&self) -> Option<[f64; 3]> {
        if self.frames == 0 {
            return None;
        }
        let n = self.frames as f64;
        Some(self.sums.map(|sum| sum as f64 / n))
    }
}

pub fn run(args: CalibrateArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = RecordLayout::default();
    let mut source = open_input(&args.source)?;

    let shutdown = ShutdownSignal::new();
    install_shutdown_handler(shutdown.clone())?;

    let mut bias = GyroBias::default();
    while !shutdown.is_requested() && bias.frames < args.frames {
        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(TransportError::Closed) => break,
            Err(err) => return Err(transport_error("read failed", err)),
        };

        let record = match decode_frame(&frame, &layout) {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "skipping line");
                continue;
            }
        };
        bias.push(record.angular_rate());

        if args.follow {
            if let Some(mean) = bias.mean() {
                println!("{}", format_bias(mean));
            }
        }
    }

    let Some(mean) = bias.mean() else {
        eprintln!("error: no valid frames to average");
        return Ok(DATA_INVALID);
    };
    info!(frames = bias.frames, "gyroscope bias estimated");
    print_bias(bias.frames, mean, format);
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bias_has_no_mean() {
        assert!(GyroBias::default().mean().is_none());
    }

    #[test]
    fn mean_of_samples() {
        let mut bias = GyroBias::default();
        bias.push([10, -4, 0]);
        bias.push([20, -2, 1]);
        bias.push([30, 0, 1]);

        assert_eq!(bias.frames, 3);
        let mean = bias.mean().unwrap();
        assert_eq!(mean[0], 20.0);
        assert_eq!(mean[1], -2.0);
        assert!((mean[2] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sums_do_not_overflow_i16() {
        let mut bias = GyroBias::default();
        for _ in 0..4 {
            bias.push([i16::MAX, i16::MIN, 0]);
        }
        assert_eq!(bias.mean().unwrap(), [32767.0, -32768.0, 0.0]);
    }
}
