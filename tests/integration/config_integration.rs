//! Configuration layering: defaults, global file, explicit file, environment

use super::test_utils::with_xdg_env;
use cordon::config::{global_config_path, ConfigLoader};
use cordon::runtime::MountTarget;
use std::fs;
use tempfile::TempDir;

fn write_global(test_dir: &TempDir, content: &str) {
    let dir = test_dir.path().join("cordon");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

#[test]
fn test_global_file_overrides_defaults() {
    let test_dir = TempDir::new().unwrap();
    write_global(
        &test_dir,
        "[runtime]\nbinary = \"podman\"\nmount_target = \"original\"\n\n[session]\ndefault_user = \"builder\"\n",
    );

    let config = with_xdg_env(&test_dir, || {
        assert_eq!(
            global_config_path().unwrap(),
            test_dir.path().join("cordon").join("config.toml")
        );
        ConfigLoader::load().unwrap()
    });

    assert_eq!(config.runtime.binary, "podman");
    assert_eq!(config.runtime.mount_target, MountTarget::Original);
    assert_eq!(config.session.default_user, "builder");
    // Untouched keys keep their defaults
    assert_eq!(config.runtime.pids_limit, 64);
    assert_eq!(config.session.default_command, vec!["/bin/bash"]);
}

#[test]
fn test_environment_overrides_file() {
    let test_dir = TempDir::new().unwrap();
    write_global(&test_dir, "[runtime]\npids_limit = 16\n");

    let config = with_xdg_env(&test_dir, || {
        std::env::set_var("CORDON_RUNTIME__PIDS_LIMIT", "32");
        ConfigLoader::load().unwrap()
    });

    assert_eq!(config.runtime.pids_limit, 32);
}

#[test]
fn test_explicit_file_replaces_global_file() {
    let test_dir = TempDir::new().unwrap();
    write_global(&test_dir, "[runtime]\nmemory = \"1g\"\n");
    let explicit = test_dir.path().join("explicit.toml");
    fs::write(&explicit, "[runtime]\npids_limit = 8\n").unwrap();

    let config = with_xdg_env(&test_dir, || ConfigLoader::load_from_file(&explicit).unwrap());

    assert_eq!(config.runtime.pids_limit, 8);
    assert_eq!(config.runtime.memory, "512m");
}

#[test]
fn test_invalid_values_rejected() {
    let test_dir = TempDir::new().unwrap();
    write_global(&test_dir, "[runtime]\npids_limit = 0\nscratch_mount = \"tmp\"\n");

    let err = with_xdg_env(&test_dir, || ConfigLoader::load().unwrap_err());
    let message = err.to_string();
    assert!(message.contains("pids_limit"), "{}", message);
    assert!(message.contains("scratch_mount"), "{}", message);
}
