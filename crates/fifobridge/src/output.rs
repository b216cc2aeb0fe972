use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fifobridge_bridge::BridgeStats;
use fifobridge_frame::{transcode, DecodedRecord};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput {
    index: u64,
    acceleration: [i16; 3],
    angular_rate: [i16; 3],
    magnetic_field: [i16; 3],
    timestamp_ns: u64,
}

impl RecordOutput {
    fn new(index: u64, record: &DecodedRecord) -> Self {
        Self {
            index,
            acceleration: record.acceleration(),
            angular_rate: record.angular_rate(),
            magnetic_field: record.magnetic_field(),
            timestamp_ns: record.timestamp(),
        }
    }
}

/// Print one decoded IMU record. `Raw` writes the transcoded bytes.
pub fn print_record(index: u64, record: &DecodedRecord, format: OutputFormat) {
    let out = RecordOutput::new(index, record);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "ACCEL", "GYRO", "MAG", "TIMESTAMP (ns)"])
                .add_row(vec![
                    out.index.to_string(),
                    triplet(out.acceleration),
                    triplet(out.angular_rate),
                    triplet(out.magnetic_field),
                    out.timestamp_ns.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{} acc={} gyro={} mag={} t={}ns",
                out.index,
                triplet(out.acceleration),
                triplet(out.angular_rate),
                triplet(out.magnetic_field),
                out.timestamp_ns
            );
        }
        OutputFormat::Raw => {
            print_raw(transcode(record).as_bytes());
        }
    }
}

#[derive(Serialize)]
struct BiasOutput {
    frames: u64,
    mean: [f64; 3],
}

/// Print a gyroscope bias estimate.
pub fn print_bias(frames: u64, mean: [f64; 3], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&BiasOutput { frames, mean })
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["FRAMES", "GYRO X", "GYRO Y", "GYRO Z"])
                .add_row(vec![
                    frames.to_string(),
                    format!("{:.2}", mean[0]),
                    format!("{:.2}", mean[1]),
                    format!("{:.2}", mean[2]),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("{}", format_bias(mean));
        }
    }
}

/// Fixed-width running-mean line.
pub fn format_bias(mean: [f64; 3]) -> String {
    format!("{:06.2} {:06.2} {:06.2}", mean[0], mean[1], mean[2])
}

/// Print end-of-run bridge counters.
pub fn print_stats(stats: &BridgeStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["SESSIONS", "FORWARDED", "REJECTED", "DETACHES", "TRANSPORT FAILURES"])
                .add_row(vec![
                    stats.sessions.to_string(),
                    stats.records_forwarded.to_string(),
                    stats.records_rejected.to_string(),
                    stats.detaches.to_string(),
                    stats.transport_failures.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sessions={} forwarded={} rejected={} detaches={} transport_failures={}",
                stats.sessions,
                stats.records_forwarded,
                stats.records_rejected,
                stats.detaches,
                stats.transport_failures
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn triplet(values: [i16; 3]) -> String {
    format!("{},{},{}", values[0], values[1], values[2])
}
