//! External sandbox runtimes
//!
//! The runner never isolates anything itself. It hands a [`SandboxInvocation`] to a
//! [`SandboxRuntime`], which must honour the isolation contract and block until the command
//! exits.

use crate::config::RuntimeConfig;
use crate::error::ExecutionError;
use crate::session::Interrupt;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where an overlay appears inside the sandbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountTarget {
    /// At the overlay's own host path
    #[default]
    Overlay,
    /// At the original root's host path, so the command sees the paths it was given
    Original,
}

/// One bind mount handed to the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub host: PathBuf,
    pub container: PathBuf,
    pub read_write: bool,
}

impl BindMount {
    fn volume_arg(&self) -> String {
        let mode = if self.read_write { "rw" } else { "ro" };
        format!("{}:{}:{}", self.host.display(), self.container.display(), mode)
    }
}

/// Resource ceilings and runtime selection.
///
/// Network denial, a read-only root, dropping every capability and forbidding privilege
/// escalation are not configurable: every invocation carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationPolicy {
    /// OCI runtime passed as `--runtime` (gVisor's `runsc` by default)
    pub oci_runtime: Option<String>,
    /// The single writable scratch area (tmpfs)
    pub scratch_mount: PathBuf,
    pub pids_limit: u32,
    pub memory: String,
}

impl From<&RuntimeConfig> for IsolationPolicy {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            oci_runtime: config.oci_runtime.clone().filter(|r| !r.is_empty()),
            scratch_mount: config.scratch_mount.clone(),
            pids_limit: config.pids_limit,
            memory: config.memory.clone(),
        }
    }
}

/// Everything the runtime needs to start one sandboxed command
#[derive(Debug, Clone)]
pub struct SandboxInvocation {
    pub image: String,
    pub mounts: Vec<BindMount>,
    pub principal: String,
    pub command: Vec<String>,
    pub policy: IsolationPolicy,
}

/// The external sandbox-execution collaborator
pub trait SandboxRuntime {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Run the invocation to completion and return its exit code.
    ///
    /// Implementations should stop the sandboxed process when `interrupt` reports a
    /// termination request, then still return its exit code.
    fn run(
        &self,
        invocation: &SandboxInvocation,
        interrupt: &Interrupt,
    ) -> Result<i32, ExecutionError>;
}

/// Drives the `docker` CLI (or a compatible one such as `podman`)
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    binary: String,
    attach_tty: bool,
}

impl DockerRuntime {
    /// Attach a TTY only when stdin is a terminal
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            attach_tty: std::io::stdin().is_terminal(),
        }
    }

    pub fn new(binary: impl Into<String>, attach_tty: bool) -> Self {
        Self {
            binary: binary.into(),
            attach_tty,
        }
    }

    /// Argument vector for `docker run`. Options precede the image; the command follows it.
    pub fn arguments(&self, invocation: &SandboxInvocation) -> Vec<String> {
        let policy = &invocation.policy;
        let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
        if self.attach_tty {
            args.push("--interactive".into());
            args.push("--tty".into());
        }
        if let Some(oci) = &policy.oci_runtime {
            args.push(format!("--runtime={}", oci));
        }
        args.extend([
            "--network".to_string(),
            "none".to_string(),
            "--read-only".to_string(),
            "--tmpfs".to_string(),
            policy.scratch_mount.display().to_string(),
            "--cap-drop".to_string(),
            "ALL".to_string(),
            "--security-opt".to_string(),
            "no-new-privileges".to_string(),
            "--pids-limit".to_string(),
            policy.pids_limit.to_string(),
            "--memory".to_string(),
            policy.memory.clone(),
        ]);
        for mount in &invocation.mounts {
            args.push("-v".into());
            args.push(mount.volume_arg());
        }
        args.push("--user".into());
        args.push(invocation.principal.clone());
        args.push(invocation.image.clone());
        args.extend(invocation.command.iter().cloned());
        args
    }
}

impl SandboxRuntime for DockerRuntime {
    fn name(&self) -> &str {
        &self.binary
    }

    fn run(
        &self,
        invocation: &SandboxInvocation,
        interrupt: &Interrupt,
    ) -> Result<i32, ExecutionError> {
        let args = self.arguments(invocation);
        info!(command = %format!("{} {}", self.binary, args.join(" ")), "Launching sandbox");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .spawn()
            .map_err(|e| ExecutionError::Spawn {
                runtime: self.binary.clone(),
                source: e,
            })?;

        let mut kill_sent = false;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = exit_code(status);
                    debug!(exit_code = code, "Sandbox exited");
                    return Ok(code);
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(ExecutionError::Wait {
                        runtime: self.binary.clone(),
                        source: e,
                    })
                }
            }

            if interrupt.terminated() && !kill_sent {
                warn!("Termination requested, stopping sandbox");
                if let Err(e) = child.kill() {
                    warn!("Failed to stop sandbox: {}", e);
                }
                kill_sent = true;
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Exit code of a finished process; `128 + n` when it was killed by signal `n`
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
