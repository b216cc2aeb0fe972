use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        fifo_support_check(),
        working_dir_writable_check(),
        pipe_path_check("imu_pipe", &args.imu_pipe),
        pipe_path_check("gps_pipe", &args.gps_pipe),
        serial_device_check(&args.device),
    ];

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };
    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("fifobridge doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
    }
}

fn scratch_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "fifobridge-doctor-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ))
}

fn fifo_support_check() -> CheckResult {
    #[cfg(unix)]
    {
        use fifobridge_transport::NamedPipe;

        let dir = scratch_dir("fifo");
        if let Err(err) = std::fs::create_dir_all(&dir) {
            return CheckResult::new(
                "fifo_support",
                CheckStatus::Fail,
                format!("cannot create scratch dir: {err}"),
            );
        }
        let result = NamedPipe::create(dir.join("scratchfifo")).map(drop);
        let _ = std::fs::remove_dir_all(&dir);

        match result {
            Ok(()) => CheckResult::new("fifo_support", CheckStatus::Pass, "mkfifo succeeded"),
            Err(err) => CheckResult::new("fifo_support", CheckStatus::Fail, err.to_string()),
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult::new(
            "fifo_support",
            CheckStatus::Fail,
            "named pipes are only supported on Unix",
        )
    }
}

fn working_dir_writable_check() -> CheckResult {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            return CheckResult::new(
                "working_dir",
                CheckStatus::Fail,
                format!("cannot resolve working directory: {err}"),
            )
        }
    };

    let scratch = cwd.join(format!(".fifobridge-doctor-{}", std::process::id()));
    match std::fs::write(&scratch, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&scratch);
            CheckResult::new(
                "working_dir",
                CheckStatus::Pass,
                format!("{} is writable", cwd.display()),
            )
        }
        Err(err) => CheckResult::new(
            "working_dir",
            CheckStatus::Fail,
            format!("{} is not writable: {err}", cwd.display()),
        ),
    }
}

/// A leftover pipe blocks startup, but may also belong to a running bridge.
fn pipe_path_check(name: &str, path: &Path) -> CheckResult {
    match std::fs::symlink_metadata(path) {
        Err(_) => CheckResult::new(name, CheckStatus::Pass, format!("{} is free", path.display())),
        Ok(metadata) => {
            let kind = if is_fifo(&metadata) {
                "a named pipe"
            } else {
                "not a named pipe"
            };
            CheckResult::new(
                name,
                CheckStatus::Warn,
                format!(
                    "{} exists ({kind}); the bridge will refuse to start until it is removed",
                    path.display()
                ),
            )
        }
    }
}

#[cfg(unix)]
fn is_fifo(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_fifo()
}

#[cfg(not(unix))]
fn is_fifo(_metadata: &std::fs::Metadata) -> bool {
    false
}

fn serial_device_check(device: &Path) -> CheckResult {
    if device.exists() {
        CheckResult::new(
            "serial_device",
            CheckStatus::Pass,
            format!("{} present", device.display()),
        )
    } else {
        CheckResult::new(
            "serial_device",
            CheckStatus::Warn,
            format!("{} not found (synthetic sources still work)", device.display()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_pipe_path_passes() {
        let path = scratch_dir("free").join("imufifo");
        let check = pipe_path_check("imu_pipe", &path);
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn occupied_pipe_path_warns() {
        let dir = scratch_dir("occupied");
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("gpsfifo");
        std::fs::write(&path, b"stale").expect("file should be writable");

        let check = pipe_path_check("gps_pipe", &path);
        assert_eq!(check.status, CheckStatus::Warn);
        assert!(check.detail.contains("not a named pipe"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_serial_device_warns() {
        let check = serial_device_check(Path::new("/dev/fifobridge-does-not-exist"));
        assert_eq!(check.status, CheckStatus::Warn);
    }

    #[cfg(unix)]
    #[test]
    fn fifo_support_passes_on_unix() {
        assert_eq!(fifo_support_check().status, CheckStatus::Pass);
    }
}
