//! Binary-level checks: pre-flight validation, exit codes, and stdout/stderr separation

use super::test_utils::{entry_count, BinaryEnv};
use std::fs;

#[test]
fn test_missing_editable_path_exits_one_without_side_effects() {
    let env = BinaryEnv::new();
    let config = env.write_config();
    let missing = env.dir.path().join("does-not-exist");

    let output = env
        .command()
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .args(["run", "--image", "img", "--edit"])
        .arg(&missing)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "report channel must stay empty");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("does not exist"),
        "diagnostic should name the problem: {}",
        stderr
    );
    assert_eq!(entry_count(&env.overlay_root()), 0);
}

#[test]
fn test_file_given_as_editable_path_is_rejected() {
    let env = BinaryEnv::new();
    let config = env.write_config();
    let file = env.dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();

    let output = env
        .command()
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .args(["run", "--image", "img", "--edit"])
        .arg(&file)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a directory"));
    assert_eq!(entry_count(&env.overlay_root()), 0);
}

#[test]
fn test_unlaunchable_runtime_exits_125_and_cleans_overlays() {
    let env = BinaryEnv::new();
    let config = env.write_config();
    let root = env.dir.path().join("proj");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("file.txt"), "one").unwrap();

    let output = env
        .command()
        .env("CORDON_RUNTIME__BINARY", "/nonexistent/cordon-container-cli")
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .args(["run", "--image", "img", "--edit"])
        .arg(&root)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(125));
    assert_eq!(entry_count(&env.overlay_root()), 0);
    assert_eq!(fs::read_to_string(root.join("file.txt")).unwrap(), "one");
}

#[test]
fn test_missing_config_file_is_a_startup_failure() {
    let env = BinaryEnv::new();
    let output = env
        .command()
        .arg("--config")
        .arg(env.dir.path().join("absent.toml"))
        .arg("--quiet")
        .args(["snapshot", "."])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("configuration"));
}

#[test]
fn test_snapshot_command_prints_fingerprint() {
    let env = BinaryEnv::new();
    let root = env.dir.path().join("proj");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src").join("main.rs"), "fn main() {}").unwrap();

    let output = env
        .command()
        .arg("--quiet")
        .args(["snapshot", "--format", "json"])
        .arg(&root)
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["fingerprint"].as_str().unwrap().len(), 64);
    assert!(value["entries"]["src/"].is_string());
    assert!(value["entries"]["src/main.rs"].is_string());
}

#[test]
fn test_validation_failure_writes_only_the_log_file() {
    let env = BinaryEnv::new();
    let config = env.write_config();
    let missing = env.dir.path().join("does-not-exist");

    let quiet = env
        .command()
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .args(["run", "--image", "img", "--edit"])
        .arg(&missing)
        .output()
        .unwrap();
    assert_eq!(quiet.status.code(), Some(1));
    assert_eq!(entry_count(&env.state_home()), 0, "--quiet writes nothing");

    let logged = env
        .command()
        .arg("--config")
        .arg(&config)
        .args(["run", "--image", "img", "--edit"])
        .arg(&missing)
        .output()
        .unwrap();
    assert_eq!(logged.status.code(), Some(1));
    let log_dir = env.state_home().join("cordon");
    let names: Vec<_> = fs::read_dir(&log_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("cordon.log")]);
    assert_eq!(entry_count(&env.state_home()), 1);
    assert_eq!(entry_count(&env.overlay_root()), 0);
    assert!(!missing.exists());
}
