#![cfg(unix)]

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use fifobridge_bridge::{
    Bridge, BridgeConfig, BridgeState, GpsPipeline, GpsSource, ImuPipeline, ImuSource,
    ShutdownSignal,
};
use fifobridge_frame::{RecordLayout, RECORD_SIZE};
use fifobridge_nmea::verify;
use fifobridge_sim::{GpsEmulatorConfig, ImuEmulatorConfig};
use fifobridge_transport::NamedPipe;

fn make_pipe_path(tag: &str, name: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/fifobridge-{}-{}-{}",
        tag,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir.join(name)
}

fn fast_config() -> BridgeConfig {
    BridgeConfig {
        retry_delay: Duration::from_millis(10),
        attach_poll_interval: Duration::from_millis(5),
        max_records: None,
    }
}

fn read_records(reader: &mut File, count: usize) -> Vec<[u8; RECORD_SIZE]> {
    (0..count)
        .map(|_| {
            let mut record = [0u8; RECORD_SIZE];
            reader
                .read_exact(&mut record)
                .expect("reader should receive a whole record");
            record
        })
        .collect()
}

fn assert_transcoded(record: &[u8; RECORD_SIZE]) {
    let acc_x = i16::from_be_bytes([record[0], record[1]]);
    let mag_y = i16::from_be_bytes([record[14], record[15]]);
    assert_eq!(acc_x, 1401);
    assert_eq!(mag_y, 28919);
    // Little-endian nanoseconds since the emulator started: the high bytes are zero.
    assert_eq!(&record[24..26], &[0, 0]);
}

#[test]
fn imu_bridge_survives_consumer_detach_and_reattach() {
    let path = make_pipe_path("imu", "imufifo");
    let pipe = NamedPipe::create(&path).expect("pipe should be created");
    let shutdown = ShutdownSignal::new();
    let pipeline = ImuPipeline::new(
        ImuSource::Synthetic(ImuEmulatorConfig {
            period: Duration::from_millis(1),
            ..ImuEmulatorConfig::default()
        }),
        RecordLayout::default(),
    )
    .expect("default layout should be valid");

    let mut bridge = Bridge::new(pipe, pipeline, shutdown.clone()).with_config(fast_config());
    let worker = thread::spawn(move || {
        let outcome = bridge.run();
        (outcome, bridge)
    });

    let mut first = File::open(&path).expect("first reader should attach");
    for record in read_records(&mut first, 3) {
        assert_transcoded(&record);
    }
    drop(first);

    // Give the bridge time to hit the broken pipe.
    thread::sleep(Duration::from_millis(50));
    assert!(path.exists(), "pipe must survive a consumer detach");

    let mut second = File::open(&path).expect("second reader should attach");
    for record in read_records(&mut second, 3) {
        assert_transcoded(&record);
    }

    shutdown.request();
    let (outcome, bridge) = worker.join().expect("bridge thread should finish");
    drop(second);

    let stats = outcome.expect("bridge should stop cleanly");
    assert!(stats.sessions >= 2, "stats: {stats:?}");
    assert!(stats.detaches >= 1, "stats: {stats:?}");
    assert_eq!(stats.records_rejected, 0);
    assert_eq!(bridge.state(), BridgeState::ShuttingDown);
    assert!(path.exists(), "pipe lives as long as the bridge");

    drop(bridge);
    assert!(!path.exists(), "pipe is removed when the bridge is dropped");

    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}

#[test]
fn gps_bridge_streams_checksummed_sentences() {
    let path = make_pipe_path("gps", "gpsfifo");
    let pipe = NamedPipe::create(&path).expect("pipe should be created");
    let pipeline = GpsPipeline::new(GpsSource::Synthetic(GpsEmulatorConfig {
        period: Duration::from_millis(1),
        ..GpsEmulatorConfig::default()
    }))
    .with_checksum_verification(true);

    let mut bridge = Bridge::new(pipe, pipeline, ShutdownSignal::new()).with_config(BridgeConfig {
        max_records: Some(8),
        ..fast_config()
    });
    let worker = thread::spawn(move || {
        let outcome = bridge.run();
        (outcome, bridge)
    });

    let mut reader = File::open(&path).expect("reader should attach");
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .expect("reader should receive sentences until the bridge stops");

    let (outcome, bridge) = worker.join().expect("bridge thread should finish");
    let stats = outcome.expect("bridge should stop cleanly");
    assert_eq!(stats.records_forwarded, 8);

    let lines: Vec<&str> = text.split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 8);
    for (line, tag) in lines.iter().zip(["$GPGGA", "$GPRMC", "$GPRMB", "$GPWPL"].iter().cycle()) {
        assert!(line.starts_with(tag), "{line}");
        verify(line).expect("every sentence should carry a valid checksum");
    }

    drop(bridge);
    assert!(!path.exists());

    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}

#[test]
fn second_pipe_at_same_path_is_refused() {
    let path = make_pipe_path("collide", "imufifo");
    let _pipe = NamedPipe::create(&path).expect("pipe should be created");

    let err = NamedPipe::create(&path).expect_err("second create should fail");
    assert!(err.to_string().contains("imufifo"), "{err}");

    drop(_pipe);
    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}
