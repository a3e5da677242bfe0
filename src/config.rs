//! Configuration System
//!
//! Layered configuration: built-in defaults, then the global config file (or an explicit
//! `--config` file), then `CORDON_<SECTION>__<KEY>` environment variables. CLI flags are
//! applied on top by the binary.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::runtime::MountTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod sources;

pub use sources::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CordonConfig {
    /// Sandbox runtime and isolation ceilings
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Where overlays are created
    #[serde(default)]
    pub overlay: OverlayConfig,

    /// Defaults for session inputs the caller leaves out
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sandbox runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Container CLI to invoke
    #[serde(default = "default_binary")]
    pub binary: String,

    /// OCI runtime (`--runtime=`); empty or absent disables the flag
    #[serde(default = "default_oci_runtime")]
    pub oci_runtime: Option<String>,

    /// Process-count ceiling
    #[serde(default = "default_pids_limit")]
    pub pids_limit: u32,

    /// Memory ceiling in docker notation
    #[serde(default = "default_memory")]
    pub memory: String,

    /// The one writable scratch mount inside the sandbox
    #[serde(default = "default_scratch_mount")]
    pub scratch_mount: PathBuf,

    /// Container path for each overlay
    #[serde(default)]
    pub mount_target: MountTarget,
}

fn default_binary() -> String {
    "docker".to_string()
}

fn default_oci_runtime() -> Option<String> {
    Some("runsc".to_string())
}

fn default_pids_limit() -> u32 {
    64
}

fn default_memory() -> String {
    "512m".to_string()
}

fn default_scratch_mount() -> PathBuf {
    PathBuf::from("/tmp")
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            oci_runtime: default_oci_runtime(),
            pids_limit: default_pids_limit(),
            memory: default_memory(),
            scratch_mount: default_scratch_mount(),
            mount_target: MountTarget::default(),
        }
    }
}

/// Overlay placement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Parent directory for overlays (system temp directory when unset)
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

/// Session input defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Principal the command runs as
    #[serde(default = "default_user")]
    pub default_user: String,

    /// Command run when none is given
    #[serde(default = "default_command")]
    pub default_command: Vec<String>,
}

fn default_user() -> String {
    "dev".to_string()
}

fn default_command() -> Vec<String> {
    vec!["/bin/bash".to_string()]
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_user: default_user(),
            default_command: default_command(),
        }
    }
}

impl CordonConfig {
    /// Validate the entire configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.runtime.binary.trim().is_empty() {
            errors.push("runtime.binary cannot be empty".to_string());
        }
        if self.runtime.pids_limit == 0 {
            errors.push("runtime.pids_limit must be greater than 0".to_string());
        }
        if self.runtime.memory.trim().is_empty() {
            errors.push("runtime.memory cannot be empty".to_string());
        }
        if !self.runtime.scratch_mount.is_absolute() {
            errors.push(format!(
                "runtime.scratch_mount must be absolute, got {:?}",
                self.runtime.scratch_mount
            ));
        }
        if self.session.default_command.is_empty() {
            errors.push("session.default_command cannot be empty".to_string());
        }
        if self.session.default_user.trim().is_empty() {
            errors.push("session.default_user cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

/// Loads [`CordonConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, the global config file if present, then the environment
    pub fn load() -> Result<CordonConfig, ConfigError> {
        let builder = sources::global_file(config::Config::builder());
        Self::finish(builder)
    }

    /// Defaults, the given file (which must exist), then the environment
    pub fn load_from_file(path: &Path) -> Result<CordonConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Invalid(format!(
                "Config file {:?} does not exist",
                path
            )));
        }
        let builder = sources::explicit_file(config::Config::builder(), path);
        Self::finish(builder)
    }

    /// Built-in defaults only
    pub fn defaults() -> CordonConfig {
        CordonConfig::default()
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<CordonConfig, ConfigError> {
        let config: CordonConfig = sources::environment(builder).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
