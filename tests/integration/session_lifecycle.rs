//! End-to-end session tests against an in-process sandbox runtime

use super::test_utils::entry_count;
use cordon::config::CordonConfig;
use cordon::diff::{ChangeKind, ChangeRecord};
use cordon::error::{ExecutionError, SessionError};
use cordon::report::{render, ReportFormat};
use cordon::runtime::{SandboxInvocation, SandboxRuntime};
use cordon::session::{Interrupt, SandboxRunner, SessionRequest};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runtime that edits the mounted overlays the way a sandboxed command would
struct ScriptedRuntime<F>(F);

impl<F> SandboxRuntime for ScriptedRuntime<F>
where
    F: Fn(&[PathBuf]) -> i32,
{
    fn name(&self) -> &str {
        "scripted"
    }

    fn run(&self, invocation: &SandboxInvocation, _: &Interrupt) -> Result<i32, ExecutionError> {
        let hosts: Vec<PathBuf> = invocation.mounts.iter().map(|m| m.host.clone()).collect();
        Ok((self.0)(&hosts))
    }
}

struct Fixture {
    _hosts: TempDir,
    temp_root: TempDir,
    roots: Vec<PathBuf>,
}

impl Fixture {
    fn new(names: &[&str]) -> Self {
        let hosts = TempDir::new().unwrap();
        let roots = names
            .iter()
            .map(|name| {
                let root = hosts.path().join(name);
                fs::create_dir(&root).unwrap();
                fs::write(root.join("file.txt"), "one").unwrap();
                root
            })
            .collect();
        Self {
            _hosts: hosts,
            temp_root: TempDir::new().unwrap(),
            roots,
        }
    }

    fn config(&self) -> CordonConfig {
        let mut config = CordonConfig::default();
        config.overlay.temp_root = Some(self.temp_root.path().to_path_buf());
        config
    }

    fn request(&self) -> SessionRequest {
        SessionRequest {
            image: "sandbox:latest".to_string(),
            editable: self.roots.clone(),
            principal: None,
            command: vec!["make".to_string()],
        }
    }

    fn overlays_left(&self) -> usize {
        entry_count(self.temp_root.path())
    }
}

fn write(root: &Path, name: &str, content: &str) {
    fs::write(root.join(name), content).unwrap();
}

#[test]
fn test_one_to_two_reports_single_modification() {
    let fixture = Fixture::new(&["snap"]);
    let runner = SandboxRunner::new(
        ScriptedRuntime(|hosts: &[PathBuf]| {
            write(&hosts[0], "file.txt", "two");
            0
        }),
        &fixture.config(),
    );

    let outcome = runner.run(&fixture.request(), &Interrupt::new()).unwrap();
    let report = outcome.report;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(report.roots.len(), 1);
    assert_eq!(
        report.roots[0].changes,
        vec![ChangeRecord::new(ChangeKind::Modified, "file.txt")]
    );
    let text = render(&report, ReportFormat::Text, false).unwrap();
    assert!(text.contains("  Modified: file.txt"));
    assert!(text.ends_with("Directories changed during session: 1 of 1"));

    assert_eq!(fs::read_to_string(fixture.roots[0].join("file.txt")).unwrap(), "one");
    assert_eq!(fixture.overlays_left(), 0);
}

#[test]
fn test_only_changed_roots_carry_records() {
    let fixture = Fixture::new(&["untouched", "edited"]);
    let runner = SandboxRunner::new(
        ScriptedRuntime(|hosts: &[PathBuf]| {
            write(&hosts[1], "new.txt", "fresh");
            0
        }),
        &fixture.config(),
    );

    let report = runner
        .run(&fixture.request(), &Interrupt::new())
        .unwrap()
        .report;

    let changed: Vec<_> = report.changed_roots().map(|r| r.original.clone()).collect();
    assert_eq!(changed, vec![dunce::canonicalize(&fixture.roots[1]).unwrap()]);
    assert_eq!(report.roots[0].pre_fingerprint, report.roots[0].post_fingerprint);
    assert_eq!(
        report.roots[1].changes,
        vec![ChangeRecord::new(ChangeKind::Added, "new.txt")]
    );
}

#[test]
fn test_nonzero_exit_without_changes() {
    let fixture = Fixture::new(&["r"]);
    let runner = SandboxRunner::new(ScriptedRuntime(|_: &[PathBuf]| 2), &fixture.config());

    let outcome = runner.run(&fixture.request(), &Interrupt::new()).unwrap();
    assert_eq!(outcome.exit_code, 2);
    let text = render(&outcome.report, ReportFormat::Text, false).unwrap();
    assert!(text.ends_with("No changes detected."));
    assert_eq!(fixture.overlays_left(), 0);
}

#[test]
fn test_root_deleted_inside_sandbox_reports_removal() {
    let fixture = Fixture::new(&["r", "kept"]);
    let runner = SandboxRunner::new(
        ScriptedRuntime(|hosts: &[PathBuf]| {
            fs::remove_dir_all(&hosts[0]).unwrap();
            write(&hosts[1], "file.txt", "two");
            0
        }),
        &fixture.config(),
    );

    let outcome = runner.run(&fixture.request(), &Interrupt::new()).unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(
        outcome.report.roots[0].changes,
        vec![ChangeRecord::new(ChangeKind::Removed, "file.txt")]
    );
    assert_eq!(
        outcome.report.roots[1].changes,
        vec![ChangeRecord::new(ChangeKind::Modified, "file.txt")]
    );
    let text = render(&outcome.report, ReportFormat::Text, false).unwrap();
    assert!(text.contains("  Removed: file.txt"));
    assert!(text.ends_with("Directories changed during session: 2 of 2"));
    assert!(outcome.cleanup.is_clean());
    assert_eq!(fixture.overlays_left(), 0);
}

#[test]
fn test_no_editable_roots_still_runs() {
    let fixture = Fixture::new(&[]);
    let runner = SandboxRunner::new(
        ScriptedRuntime(|hosts: &[PathBuf]| hosts.len() as i32),
        &fixture.config(),
    );

    let outcome = runner.run(&fixture.request(), &Interrupt::new()).unwrap();
    assert_eq!(outcome.exit_code, 0);
    let report = outcome.report;
    assert!(report.roots.is_empty());
    assert!(!report.has_changes());
}

#[test]
fn test_termination_before_launch_aborts_with_130() {
    let fixture = Fixture::new(&["r"]);
    let interrupt = Interrupt::new();
    interrupt.terminate();
    let runner = SandboxRunner::new(
        ScriptedRuntime(|_: &[PathBuf]| -> i32 { panic!("runtime must not be reached") }),
        &fixture.config(),
    );

    let err = runner.run(&fixture.request(), &interrupt).unwrap_err();
    assert!(matches!(err, SessionError::Interrupted { .. }));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(fixture.overlays_left(), 0);
}
