//! Logging System
//!
//! Structured logging using the `tracing` crate. Stdout belongs to the session report, so
//! logs go to a file by default and can be mirrored to stderr.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Master switch (`--quiet` turns it off)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: file, stderr, file+stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path; defaults to the platform state directory
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored output on stderr when it is a terminal
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Output destinations
#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stderr: bool,
    file: bool,
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. Environment variables (CORDON_LOG, CORDON_LOG_FORMAT, CORDON_LOG_OUTPUT)
/// 2. The given config (CLI flags already merged in)
/// 3. Defaults
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if output.file {
        let path = resolve_log_file_path(None, config.file.clone())?;
        let file = open_log_file(&path)?;
        layers.push(make_layer(Mutex::new(file), format, false));
    }
    if output.stderr {
        let ansi = config.color && std::io::stderr().is_terminal();
        layers.push(make_layer(std::io::stderr, format, ansi));
    }

    Registry::default()
        .with(filter)
        .with(layers)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

fn make_layer<W>(writer: W, format: LogFormat, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(ansi)
        .with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File, ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::Logging(format!("Failed to create log directory {:?}: {}", parent, e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ConfigError::Logging(format!("Failed to open log file {:?}: {}", path, e)))
}

/// Default log file: `<state dir>/cordon.log` (`$XDG_STATE_HOME/cordon` on Linux)
pub fn default_log_file_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "cordon").ok_or_else(|| {
        ConfigError::Logging("Could not determine a home directory for the log file".to_string())
    })?;
    let base = dirs
        .state_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dirs.data_local_dir().to_path_buf());
    Ok(base.join("cordon.log"))
}

/// Pick the log file: CLI flag, then config, then the platform default
pub fn resolve_log_file_path(
    cli_override: Option<PathBuf>,
    configured: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    match cli_override.or(configured) {
        Some(path) => Ok(path),
        None => default_log_file_path(),
    }
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("CORDON_LOG") {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);

    for (module, module_level) in &config.modules {
        let directive = format!("{}={}", module, module_level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ConfigError::Logging(format!("Invalid log directive: {}", e)))?,
        );
    }

    if let Ok(modules_str) = std::env::var("CORDON_LOG_MODULES") {
        for module_spec in modules_str.split(',') {
            if let Some((module, level)) = module_spec.split_once('=') {
                let directive = format!("{}={}", module.trim(), level.trim());
                filter = filter.add_directive(directive.parse().map_err(|e| {
                    ConfigError::Logging(format!("Invalid log directive from env: {}", e))
                })?);
            }
        }
    }

    Ok(filter)
}

fn determine_format(config: &LoggingConfig) -> Result<LogFormat, ConfigError> {
    let format = std::env::var("CORDON_LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    parse_format(&format)
}

fn parse_format(format: &str) -> Result<LogFormat, ConfigError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::Logging(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn determine_output(config: &LoggingConfig) -> Result<OutputDestinations, ConfigError> {
    let output = std::env::var("CORDON_LOG_OUTPUT").unwrap_or_else(|_| config.output.clone());
    parse_output_destinations(&output)
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ConfigError> {
    match output {
        "file" => Ok(OutputDestinations {
            stderr: false,
            file: true,
        }),
        "stderr" => Ok(OutputDestinations {
            stderr: true,
            file: false,
        }),
        "file+stderr" => Ok(OutputDestinations {
            stderr: true,
            file: true,
        }),
        "stdout" => Err(ConfigError::Logging(
            "Log output 'stdout' is not available: stdout carries the session report".to_string(),
        )),
        _ => Err(ConfigError::Logging(format!(
            "Invalid log output: {} (must be 'file', 'stderr', or 'file+stderr')",
            output
        ))),
    }
}
