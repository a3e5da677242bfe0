//! Config sources: global file, explicit file, environment

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to the global config file.
///
/// `$XDG_CONFIG_HOME/cordon/config.toml`, else `~/.config/cordon/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("cordon").join("config.toml"))
}

/// Add the global config file to the builder if it exists
pub fn global_file(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) if path.is_file() => {
            debug!(config_path = %path.display(), "Using global config file");
            builder.add_source(File::from(path).required(false))
        }
        _ => builder,
    }
}

/// Add an explicitly requested config file
pub fn explicit_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).required(true))
}

/// Add `CORDON_<SECTION>__<KEY>` environment overrides, e.g. `CORDON_RUNTIME__PIDS_LIMIT=32`
pub fn environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("CORDON")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
