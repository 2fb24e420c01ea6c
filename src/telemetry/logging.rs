use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "world.log";
const DEFAULT_FILTER: &str = "worldcore=info";

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "worldcore - object and containment core";

const WEEKDAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

static INSTALLED: OnceLock<PathBuf> = OnceLock::new();

/// Opens `<root>/log/world.log` and routes `tracing` output there. The
/// filter comes from `RUST_LOG`. Calling it again is a no-op.
pub fn init(root: &Path) -> Result<PathBuf, String> {
    if let Some(path) = INSTALLED.get() {
        return Ok(path.clone());
    }
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;
    let path = log_dir.join(LOG_FILE);
    let file = open_log(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|err| format!("log subscriber install failed: {}", err))?;

    Ok(INSTALLED.get_or_init(|| path).clone())
}

/// Appending handle on a log file; a fresh file gets a header first.
fn open_log(path: &Path) -> Result<File, String> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("open log {} failed: {}", path.display(), err))?;
    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        write_header(&mut file, path)?;
    }
    Ok(file)
}

fn write_header(file: &mut File, path: &Path) -> Result<(), String> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOG_FILE.to_string());
    let timestamp = format_header_timestamp(unix_timestamp());
    writeln!(file, "{HEADER_LINE}").map_err(|err| format!("header write failed: {}", err))?;
    writeln!(file, "{HEADER_TITLE}").map_err(|err| format!("header write failed: {}", err))?;
    writeln!(file, "{name} - started {timestamp}")
        .map_err(|err| format!("header write failed: {}", err))?;
    Ok(())
}

fn format_header_timestamp(ts: i64) -> String {
    let parts = breakdown_timestamp(ts);
    let weekday = WEEKDAYS[(parts.weekday as usize).min(6)];
    let month = MONTHS[(parts.month as usize).saturating_sub(1).min(11)];
    format!(
        "{weekday} {month} {:>2} {:02}:{:02}:{:02} {}",
        parts.day, parts.hour, parts.minute, parts.second, parts.year
    )
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

struct DateTimeParts {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    weekday: u32,
}

fn breakdown_timestamp(ts: i64) -> DateTimeParts {
    let secs = ts.max(0);
    let days = secs / 86_400;
    let seconds_of_day = (secs % 86_400) as u32;
    let (year, month, day) = civil_from_days(days);
    DateTimeParts {
        year,
        month,
        day,
        hour: seconds_of_day / 3_600,
        minute: (seconds_of_day % 3_600) / 60,
        second: seconds_of_day % 60,
        // 1970-01-01 was a Thursday
        weekday: (days % 7) as u32,
    }
}

fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_header_date() {
        assert_eq!(format_header_timestamp(0), "Thu Jan  1 00:00:00 1970");
    }

    #[test]
    fn leap_day_is_computed() {
        // 2024-02-29 12:30:05 UTC
        let parts = breakdown_timestamp(1_709_209_805);
        assert_eq!((parts.year, parts.month, parts.day), (2024, 2, 29));
        assert_eq!((parts.hour, parts.minute, parts.second), (12, 30, 5));
        assert_eq!(WEEKDAYS[parts.weekday as usize], "Thu");
    }

    #[test]
    fn fresh_log_gets_a_header_once() {
        let dir = std::env::temp_dir().join(format!("worldcore-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(LOG_FILE);
        let _ = std::fs::remove_file(&path);
        drop(open_log(&path).expect("first open"));
        drop(open_log(&path).expect("second open"));
        let text = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(text.matches(HEADER_TITLE).count(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
