//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::output::CliError;
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, CordonConfig};
use crate::error::ConfigError;
use crate::report::{render, ReportFormat};
use crate::runtime::DockerRuntime;
use crate::session::{Interrupt, SandboxRunner, SessionRequest};
use crate::tree::path::canonicalize_path;
use crate::tree::snapshot::{RootState, Snapshotter};
use crate::types::{short_hex, to_hex, DIRECTORY_MARKER};
use serde_json::json;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// What a routed command leaves behind: text for stdout and the process exit code
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn success(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: 0,
        }
    }
}

/// Runtime context for CLI execution: the loaded configuration.
/// Built from an optional config path using ConfigLoader only.
pub struct RunContext {
    config: CordonConfig,
    config_path: Option<PathBuf>,
}

impl RunContext {
    /// Create run context from an optional config path. Uses ConfigLoader only.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self::from_config(config, config_path))
    }

    pub fn from_config(config: CordonConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &CordonConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(
        &self,
        command: &Commands,
        interrupt: &Interrupt,
    ) -> Result<CommandOutput, CliError> {
        let started = Instant::now();
        let result = match command {
            Commands::Run {
                image,
                edit,
                user,
                format,
                command,
            } => {
                let request = SessionRequest {
                    image: image.clone(),
                    editable: edit.clone(),
                    principal: user.clone(),
                    command: command.clone(),
                };
                self.handle_run(&request, parse_format(format)?, interrupt)
            }
            Commands::Snapshot { path, format } => {
                self.handle_snapshot(path, parse_format(format)?)
            }
        };
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis(),
            config = ?self.config_path,
            "Command finished"
        );
        result
    }

    fn handle_run(
        &self,
        request: &SessionRequest,
        format: ReportFormat,
        interrupt: &Interrupt,
    ) -> Result<CommandOutput, CliError> {
        let runtime = DockerRuntime::from_config(&self.config.runtime);
        let runner = SandboxRunner::new(runtime, &self.config);
        let outcome = runner.run(request, interrupt)?;

        for failure in &outcome.cleanup.failed {
            warn!("{}", failure);
        }

        let color = self.config.logging.color && std::io::stdout().is_terminal();
        let stdout = render(&outcome.report, format, color)?;
        Ok(CommandOutput {
            stdout,
            exit_code: outcome.exit_code,
        })
    }

    fn handle_snapshot(&self, path: &Path, format: ReportFormat) -> Result<CommandOutput, CliError> {
        if !path.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "{:?} is not a directory",
                path
            )));
        }
        let root = canonicalize_path(path)?;
        let state = Snapshotter::new().capture(&root)?;
        let stdout = match format {
            ReportFormat::Json => serde_json::to_string_pretty(&json!({
                "root": state.root,
                "fingerprint": to_hex(&state.fingerprint),
                "bytes_hashed": state.bytes_hashed,
                "entries": state.snapshot,
            }))?,
            ReportFormat::Text => format_snapshot_text(&state),
        };
        Ok(CommandOutput::success(stdout))
    }
}

fn parse_format(format: &str) -> Result<ReportFormat, CliError> {
    format.parse().map_err(CliError::InvalidArgument)
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } => "run",
        Commands::Snapshot { .. } => "snapshot",
    }
}

fn format_snapshot_text(state: &RootState) -> String {
    use comfy_table::Table;
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Path", "Digest"]);
    for (key, digest) in state.snapshot.iter() {
        let digest = if *digest == DIRECTORY_MARKER {
            "-".to_string()
        } else {
            short_hex(digest)
        };
        table.add_row(vec![key.as_str(), digest.as_str()]);
    }
    format!(
        "{}\nfingerprint: {}\nentries: {}\n{}",
        state.root.display(),
        to_hex(&state.fingerprint),
        state.snapshot.len(),
        table
    )
}
