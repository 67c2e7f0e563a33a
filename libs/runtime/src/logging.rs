//! Subscriber setup for the client: a human-readable console layer on stderr
//! and an optional JSON file layer with size-based rotation.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, Layer, Registry};

use crate::config::{LoggingConfig, Section};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 20;
const DEFAULT_MAX_BACKUPS: usize = 3;

type RotatingFile = Mutex<FileRotate<AppendTimestamp>>;

/// Unknown level names fall back to INFO; "off" and "none" disable output.
fn level_filter(raw: &str) -> LevelFilter {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn console_level(section: &Section) -> &str {
    &section.console_level
}

fn file_level(section: &Section) -> &str {
    if section.file_level.trim().is_empty() {
        &section.console_level
    } else {
        &section.file_level
    }
}

/// One target per section; the "default" section sets the fallback level.
fn targets(cfg: &LoggingConfig, level_of: fn(&Section) -> &str) -> Targets {
    cfg.iter()
        .fold(Targets::new().with_default(LevelFilter::OFF), |acc, (name, section)| {
            let level = level_filter(level_of(section));
            if name == DEFAULT_SECTION {
                acc.with_default(level)
            } else {
                acc.with_target(name.clone(), level)
            }
        })
}

/// Relative log paths live under the client home directory.
fn log_path(file: &str, home_dir: &Path) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home_dir.join(path)
    }
}

fn open_rotating(
    path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotatingFile> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Mutex::new(FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(max_backups)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    )))
}

/// `None` when the section has no file or the file cannot be opened.
fn file_sink(section: &Section, home_dir: &Path) -> Option<RotatingFile> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = log_path(&section.file, home_dir);
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    match open_rotating(&path, max_bytes as usize, max_backups) {
        Ok(sink) => Some(sink),
        Err(e) => {
            // The subscriber is not installed yet.
            eprintln!("Failed to open log file '{}': {}", path.display(), e);
            None
        }
    }
}

/// Install the global subscriber.
///
/// `home_dir` anchors relative log file paths. Only the "default" section
/// opens a file; every section contributes its level to both filters.
/// Calling this twice keeps the first subscriber.
pub fn init_logging_from_config(cfg: &LoggingConfig, home_dir: &Path) {
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(targets(cfg, console_level));

    let file = cfg
        .get(DEFAULT_SECTION)
        .and_then(|section| file_sink(section, home_dir))
        .map(|sink| {
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(sink)
                .with_filter(targets(cfg, file_level))
        });

    let subscriber = Registry::default().with(console).with(file);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;
    use tracing::Level;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(level_filter("TRACE"), LevelFilter::TRACE);
        assert_eq!(level_filter("Debug"), LevelFilter::DEBUG);
        assert_eq!(level_filter(" warn "), LevelFilter::WARN);
        assert_eq!(level_filter("none"), LevelFilter::OFF);
        assert_eq!(level_filter("loud"), LevelFilter::INFO);
    }

    #[test]
    fn crate_section_overrides_default_on_console() {
        let mut cfg = default_logging_config();
        cfg.insert("identity_session".into(), section("debug", "", ""));

        let targets = targets(&cfg, console_level);

        assert!(targets.would_enable("identity_session::domain", &Level::DEBUG));
        assert!(!targets.would_enable("identity_session::domain", &Level::TRACE));
        assert!(targets.would_enable("reqwest", &Level::WARN));
        assert!(!targets.would_enable("reqwest", &Level::INFO));
    }

    #[test]
    fn empty_file_level_falls_back_to_console_level() {
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section("error", "logs/a.log", ""));

        let targets = targets(&cfg, file_level);

        assert!(targets.would_enable("anything", &Level::ERROR));
        assert!(!targets.would_enable("anything", &Level::WARN));
    }

    #[test]
    fn relative_log_paths_resolve_under_home() {
        let tmp = tempdir().unwrap();
        let resolved = log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let absolute = tmp.path().join("abs.log");
        assert_eq!(
            log_path(&absolute.to_string_lossy(), Path::new("/elsewhere")),
            absolute
        );
    }

    #[test]
    fn file_sink_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let sink = file_sink(&section("info", "nested/dir/app.log", "debug"), tmp.path());
        assert!(sink.is_some());
        assert!(tmp.path().join("nested/dir").is_dir());
    }

    #[test]
    fn blank_file_means_no_sink() {
        let tmp = tempdir().unwrap();
        assert!(file_sink(&section("info", "  ", "debug"), tmp.path()).is_none());
    }
}
