//! Cordon CLI Binary
//!
//! Command-line interface for running sandboxed sessions.

use anyhow::Context;
use clap::Parser;
use cordon::cli::{map_error, Cli, RunContext};
use cordon::config::ConfigLoader;
use cordon::error::EXIT_SETUP_FAILURE;
use cordon::logging::{init_logging, LoggingConfig};
use cordon::session::Interrupt;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(EXIT_SETUP_FAILURE);
    }

    info!("Cordon CLI starting");

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("Start-up failed: {:#}", e);
            eprintln!("cordon: {:#}", e);
            EXIT_SETUP_FAILURE
        }
    };
    process::exit(code);
}

/// Load configuration, install signal handlers, and execute the command. Returns the exit code.
fn run(cli: &Cli) -> anyhow::Result<i32> {
    let context = RunContext::new(cli.config.clone()).context("Failed to load configuration")?;

    let interrupt = Interrupt::new();
    let _signals = interrupt
        .register()
        .context("Failed to install signal handlers")?;

    match context.execute(&cli.command, &interrupt) {
        Ok(output) => {
            info!(exit_code = output.exit_code, "Command completed");
            if !output.stdout.is_empty() {
                println!("{}", output.stdout);
            }
            Ok(output.exit_code)
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            Ok(e.exit_code())
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load()
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
        // An explicit --log-output value still takes precedence below.
        if config.output == "file" {
            config.output = "file+stderr".to_string();
        }
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }

    let output_uses_file = config.output == "file" || config.output == "file+stderr";
    if config.enabled && output_uses_file {
        let resolved =
            cordon::logging::resolve_log_file_path(cli.log_file.clone(), config.file.clone());
        if let Ok(path) = resolved {
            config.file = Some(path);
        }
    } else if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}
