//! Logging initialisation from the `logging` config section.
//!
//! Each section names a target prefix (`appointments`, `api_ingress`, `sqlx`,
//! ...) and `default` covers every other target. Console output is plain
//! text; file output is JSON with size-based rotation.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use crate::config::{LoggingConfig, Section};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Unknown names fall back to `info`; an empty string means "not set".
fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Console filter: each subsystem at its own level, everything else at the
/// `default` level (off when there is no default section).
fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .map(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::OFF);
    subsystems(cfg).fold(Targets::new().with_default(default), |t, (name, s)| {
        t.with_target(name.clone(), parse_level(&s.console_level))
    })
}

/// Filter for the `default` file: every target not claimed by a subsystem.
fn default_file_targets(cfg: &LoggingConfig, level: LevelFilter) -> Targets {
    subsystems(cfg).fold(Targets::new().with_default(level), |t, (name, _)| {
        t.with_target(name.clone(), LevelFilter::OFF)
    })
}

fn subsystems(cfg: &LoggingConfig) -> impl Iterator<Item = (&String, &Section)> {
    cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
}

/// Relative log paths live under `base_dir` (the service home).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating_file(path: &Path, section: &Section) -> std::io::Result<FileRotate<AppendCount>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    Ok(FileRotate::new(
        path,
        AppendCount::new(backups),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

fn file_layer(section: &Section, base_dir: &Path, filter: Targets) -> Option<BoxedLayer> {
    if section.file.trim().is_empty() {
        return None;
    }
    let path = resolve_log_path(&section.file, base_dir);
    match open_rotating_file(&path, section) {
        Ok(writer) => Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(Mutex::new(writer))
                .with_filter(filter)
                .boxed(),
        ),
        Err(e) => {
            // The subscriber is not installed yet.
            eprintln!("Failed to open log file '{}': {e}", path.display());
            None
        }
    }
}

fn build_layers(cfg: &LoggingConfig, base_dir: &Path) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg))
        .boxed()];

    if let Some(section) = cfg.get(DEFAULT_SECTION) {
        let filter = default_file_targets(cfg, parse_level(&section.file_level));
        layers.extend(file_layer(section, base_dir, filter));
    }
    for (name, section) in subsystems(cfg) {
        let filter = Targets::new().with_target(name.clone(), parse_level(&section.file_level));
        layers.extend(file_layer(section, base_dir, filter));
    }
    layers
}

/// Install the global subscriber. `log` records are bridged into `tracing`.
/// An empty config logs `info` and above to the console. Calling this twice
/// keeps the first subscriber.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    let _ = tracing_log::LogTracer::init();

    let effective;
    let cfg = if cfg.is_empty() {
        effective = crate::config::default_logging_config()
            .into_iter()
            .map(|(k, mut s)| {
                s.file.clear();
                (k, s)
            })
            .collect::<LoggingConfig>();
        &effective
    } else {
        cfg
    };

    let _ = tracing_subscriber::registry()
        .with(build_layers(cfg, base_dir))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
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
    fn level_parsing() {
        assert_eq!(parse_level("trace"), LevelFilter::TRACE);
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level(" Warn "), LevelFilter::WARN);
        assert_eq!(parse_level("error"), LevelFilter::ERROR);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("bogus"), LevelFilter::INFO);
    }

    #[test]
    fn console_uses_subsystem_level_then_default() {
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("warn", "", ""));
        cfg.insert("appointments".into(), section("debug", "", ""));
        cfg.insert("sqlx".into(), section("off", "", ""));

        let t = console_targets(&cfg);
        assert!(t.would_enable("appointments::domain::service", &Level::DEBUG));
        assert!(!t.would_enable("appointments", &Level::TRACE));
        assert!(t.would_enable("hyper::proto", &Level::WARN));
        assert!(!t.would_enable("hyper::proto", &Level::INFO));
        assert!(!t.would_enable("sqlx::query", &Level::ERROR));
    }

    #[test]
    fn no_default_section_silences_other_targets() {
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("appointments".into(), section("info", "", ""));
        let t = console_targets(&cfg);
        assert!(t.would_enable("appointments", &Level::INFO));
        assert!(!t.would_enable("tower_http", &Level::ERROR));
    }

    #[test]
    fn default_file_excludes_subsystems() {
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("info", "logs/all.log", "debug"));
        cfg.insert("api_ingress".into(), section("info", "logs/http.log", "info"));
        let t = default_file_targets(&cfg, LevelFilter::DEBUG);
        assert!(t.would_enable("appointments", &Level::DEBUG));
        assert!(!t.would_enable("api_ingress::request_id", &Level::ERROR));
    }

    #[test]
    fn relative_log_paths_resolve_under_base_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let abs = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(&abs.to_string_lossy(), Path::new("/x")), abs);
    }

    #[test]
    fn layers_are_built_per_configured_file() {
        let tmp = tempdir().unwrap();
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("info", "logs/all.log", "debug"));
        cfg.insert("api_ingress".into(), section("info", "logs/http.log", "info"));
        cfg.insert("appointments".into(), section("debug", "", ""));

        let layers = build_layers(&cfg, tmp.path());
        // console + two files
        assert_eq!(layers.len(), 3);
        assert!(tmp.path().join("logs").is_dir());
    }
}
