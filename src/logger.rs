//! Per-run log file for the region painter.
//!
//! Each `init` starts the file over, so it holds one run's history: batch
//! progress, form loads, segmentation summaries and stroke ends. Library
//! callers that never call `init` get silent no-op macros.
//!
//! `REGIONPAINT_LOG=<path>` redirects the file; otherwise it lives at
//! `<data dir>/regionpaint/regionpaint.log`.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Environment variable overriding the log file location.
pub const LOG_PATH_ENV: &str = "REGIONPAINT_LOG";

static SINK: OnceLock<Mutex<File>> = OnceLock::new();
static SINK_PATH: OnceLock<PathBuf> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

/// Where this run is logging, once `init` succeeded.
pub fn log_path() -> Option<&'static PathBuf> {
    SINK_PATH.get()
}

pub fn is_enabled() -> bool {
    SINK.get().is_some()
}

/// Append one raw line. I/O errors are dropped.
pub fn write_line(line: &str) {
    if let Some(sink) = SINK.get()
        && let Ok(mut file) = sink.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Append a `[HH:MM:SS] [LEVEL] msg` line.
pub fn write(level: Level, msg: &str) {
    if !is_enabled() {
        return;
    }
    write_line(&format_line(&clock_now(), level, msg));
}

fn format_line(clock: &str, level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", clock, level, msg)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {{
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*));
    }};
}

/// Start logging at [`default_log_path`].
pub fn init() {
    init_at(&default_log_path());
}

/// Start logging to `path`, truncating it. The first call in a process wins;
/// later calls are ignored. Panics are mirrored into the file before the
/// previous hook runs.
pub fn init_at(path: &Path) {
    if is_enabled() {
        return;
    }
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }

    let opened = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path);
    let file = match opened {
        Ok(f) => f,
        Err(e) => {
            // Logging is optional; carry on without it.
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    if SINK.set(Mutex::new(file)).is_err() {
        return;
    }
    let _ = SINK_PATH.set(path.to_path_buf());

    write_line(&format!(
        "=== regionpaint {} run at unix {} ===",
        env!("CARGO_PKG_VERSION"),
        unix_secs().unwrap_or(0)
    ));
    write_line(&format!("log: {}", path.display()));

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format_line(&clock_now(), Level::Panic, &info.to_string()));
        previous(info);
    }));
}

/// `$REGIONPAINT_LOG`, else `<data dir>/regionpaint/regionpaint.log`.
pub fn default_log_path() -> PathBuf {
    match std::env::var_os(LOG_PATH_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => platform_data_dir()
            .join("regionpaint")
            .join("regionpaint.log"),
    }
}

fn env_dir(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn platform_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let native = env_dir("APPDATA");
    #[cfg(target_os = "macos")]
    let native = env_dir("HOME").map(|h| h.join("Library").join("Application Support"));
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let native: Option<PathBuf> = None;

    native
        .or_else(|| env_dir("XDG_DATA_HOME"))
        .or_else(|| env_dir("HOME").map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

fn clock_now() -> String {
    unix_secs().map(clock).unwrap_or_else(|| "--:--:--".into())
}

/// UTC wall clock `HH:MM:SS` for a unix timestamp.
fn clock(secs: u64) -> String {
    let day = secs % 86_400;
    format!("{:02}:{:02}:{:02}", day / 3600, day % 3600 / 60, day % 60)
}
