// # zonesyncd - Zone Sync Agent
//
// This binary is a THIN integration layer:
// - DO NOT add reconciliation, registrar or rollback logic here
// - All sync logic lives in zonesync-core
//
// zonesyncd is responsible for:
// 1. Loading the JSON configuration file
// 2. Initializing logging
// 3. Wiring the Gandi registrar and the HTTP address resolver
// 4. Running the engine once and mapping the outcome to an exit code
//
// Repeated runs are scheduled externally (cron, systemd timer).
//
// ## Configuration
//
// - First CLI argument or `ZONESYNC_CONFIG`: path to the config file
//   (default `zonesync.json`)
// - `ZONESYNC_SILENT=1`: no logging to stdout
// - `ZONESYNC_LOG_LEVEL`: overrides `log_level` from the file
//
// ## Example
//
// ```bash
// ZONESYNC_LOG_LEVEL=info zonesyncd /etc/zonesync/zonesync.json
// ```

use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use zonesync_core::{EngineEvent, SyncConfig, SyncEngine};
use zonesync_ip_http::HttpAddressResolver;
use zonesync_registrar_gandi::GandiRegistrar;

/// Default configuration file
const DEFAULT_CONFIG_PATH: &str = "zonesync.json";

/// Rotated log files kept next to the current one
const LOG_FILES_KEPT: usize = 4;

/// Exit codes for the possible run outcomes
///
/// - 0: Every domain is in sync (cleanup warnings allowed)
/// - 1: Configuration or startup error
/// - 2: The run failed
#[derive(Debug, Clone, Copy)]
enum ZonesyncExitCode {
    /// Run completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// A domain failed; later domains were not processed
    RunFailed = 2,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("ZONESYNC_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = match SyncConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    let level_name = env::var("ZONESYNC_LOG_LEVEL").unwrap_or_else(|_| config.log_level.clone());
    let Some(level) = parse_level(&level_name) else {
        eprintln!(
            "Configuration error: log level '{}' is not valid. Valid levels: {}",
            level_name,
            zonesync_core::config::LOG_LEVELS.join(", ")
        );
        return ZonesyncExitCode::ConfigError.into();
    };

    let silent =
        env::var("ZONESYNC_SILENT").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    // Dropping the guard flushes the file writer, so it lives until exit
    let _log_guard = match init_tracing(level, silent, config.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    info!("Starting zonesyncd with {}", config_path);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    rt.block_on(run_once(config)).into()
}

/// Map a configured level name to a filter; `fatal` is an alias of `error`
fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" | "fatal" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

/// Install the global subscriber: stdout unless silent, plus a weekly
/// rolling file when `log_file` is set
fn init_tracing(
    level: LevelFilter,
    silent: bool,
    log_file: Option<&str>,
) -> Result<Option<WorkerGuard>> {
    let stdout = (!silent).then(tracing_subscriber::fmt::layer);

    let (file, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(level)
        .with(stdout)
        .with(file)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(guard)
}

/// Weekly rolling appender for `log_file`, keeping the last few files
fn file_appender(log_file: &str) -> Result<RollingFileAppender> {
    let path = Path::new(log_file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("log_file '{}' has no file name", log_file))?;

    RollingFileAppender::builder()
        .rotation(Rotation::WEEKLY)
        .filename_prefix(name.to_string_lossy())
        .max_log_files(LOG_FILES_KEPT)
        .build(dir)
        .with_context(|| format!("Cannot open log file {}", log_file))
}

/// Wire the collaborators and run the engine once
async fn run_once(config: SyncConfig) -> ZonesyncExitCode {
    let (engine, events) = match build_engine(&config) {
        Ok(built) => built,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return ZonesyncExitCode::ConfigError;
        }
    };

    let monitor = tokio::spawn(log_events(events));
    let result = engine.run().await;
    // Closing the channel lets the monitor drain and finish
    drop(engine);
    if let Err(e) = monitor.await {
        warn!("Event monitor stopped abnormally: {}", e);
    }

    match result {
        Ok(report) => {
            for (domain, warning) in report.warnings() {
                warn!("{}: {}", domain, warning);
            }
            info!(
                "All domains in sync ({} published, {} unchanged) in {}ms",
                report.published(),
                report.unchanged(),
                (report.finished_at - report.started_at).num_milliseconds()
            );
            ZonesyncExitCode::Success
        }
        Err(e) => {
            error!("{}", e);
            ZonesyncExitCode::RunFailed
        }
    }
}

fn build_engine(config: &SyncConfig) -> Result<(SyncEngine, mpsc::Receiver<EngineEvent>)> {
    let resolver = HttpAddressResolver::from_config(&config.ip_source)
        .context("Failed to create address resolver")?;
    let registrar =
        GandiRegistrar::from_config(config).context("Failed to create Gandi registrar")?;

    SyncEngine::from_config(Arc::new(resolver), Arc::new(registrar), config)
        .context("Failed to create engine")
}

async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        trace!(?event, "engine event");
    }
}
