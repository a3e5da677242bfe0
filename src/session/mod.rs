//! Sandbox sessions
//!
//! A session validates its inputs, copies every editable root into an overlay, snapshots
//! the overlays, hands them to the sandbox runtime, snapshots again, and reports what
//! changed. Overlays are removed on every path out of a session that created them.

mod interrupt;
mod phase;

pub use interrupt::{Interrupt, SignalGuard};
pub use phase::SessionPhase;

use crate::config::{CordonConfig, SessionConfig};
use crate::diff::{diff_fingerprints, diff_snapshots};
use crate::error::{SessionError, ValidationError};
use crate::overlay::{CleanupSummary, OverlayManager, OverlaySet};
use crate::report::{RootReport, SessionReport};
use crate::runtime::{BindMount, IsolationPolicy, MountTarget, SandboxInvocation, SandboxRuntime};
use crate::tree::snapshot::{DirectorySnapshot, RootState, Snapshotter};
use crate::types::Hash;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

/// Caller inputs for one session
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    /// Sandbox image identifier
    pub image: String,
    /// Host directories the command may modify (through overlays)
    pub editable: Vec<PathBuf>,
    /// Identity to run as; the configured default when `None`
    pub principal: Option<String>,
    /// Command vector; the configured default shell when empty
    pub command: Vec<String>,
}

/// What a completed session returns
#[derive(Debug)]
pub struct SessionOutcome {
    /// The sandboxed command's exit code
    pub exit_code: i32,
    pub report: SessionReport,
    pub cleanup: CleanupSummary,
}

/// Transient per-session state. Dropping it releases any overlays still held.
struct SessionState {
    phase: SessionPhase,
    overlays: Option<OverlaySet>,
    pre: BTreeMap<PathBuf, RootState>,
    post: BTreeMap<PathBuf, RootState>,
    /// Roots whose post-run snapshot could not be taken
    unreadable: Vec<PathBuf>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            overlays: None,
            pre: BTreeMap::new(),
            post: BTreeMap::new(),
            unreadable: Vec::new(),
        }
    }

    fn advance(&mut self, next: SessionPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal session transition {} -> {}",
            self.phase,
            next
        );
        debug!(from = %self.phase, to = %next, "Session phase");
        self.phase = next;
    }

    fn bindings(&self) -> Vec<(PathBuf, PathBuf)> {
        self.overlays
            .as_ref()
            .map(|set| {
                set.bindings()
                    .iter()
                    .map(|b| (b.original().to_path_buf(), b.overlay().to_path_buf()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove overlays. Runs at most once; later calls find nothing to remove.
    fn teardown(&mut self) -> CleanupSummary {
        if self.phase.is_terminal() {
            return CleanupSummary::default();
        }
        let summary = match self.overlays.take() {
            Some(set) => set.cleanup(),
            None => CleanupSummary::default(),
        };
        if !summary.is_clean() {
            warn!(
                failed = summary.failed.len(),
                "Some overlays could not be removed"
            );
        }
        self.advance(SessionPhase::Cleaned);
        summary
    }

    /// Record a failure, cleaning up if overlays exist, and hand back the error
    fn fail(&mut self, err: SessionError) -> SessionError {
        error!(phase = %self.phase, "Session failed: {}", err);
        let had_overlays = self.overlays.is_some();
        self.advance(SessionPhase::Failed);
        if had_overlays {
            self.teardown();
        }
        err
    }
}

/// Orchestrates sessions against one sandbox runtime
pub struct SandboxRunner<R: SandboxRuntime> {
    runtime: R,
    overlays: OverlayManager,
    snapshotter: Snapshotter,
    policy: IsolationPolicy,
    mount_target: MountTarget,
    defaults: SessionConfig,
}

impl<R: SandboxRuntime> SandboxRunner<R> {
    pub fn new(runtime: R, config: &CordonConfig) -> Self {
        Self {
            runtime,
            overlays: OverlayManager::with_temp_root(config.overlay.temp_root.clone()),
            snapshotter: Snapshotter::new(),
            policy: IsolationPolicy::from(&config.runtime),
            mount_target: config.runtime.mount_target,
            defaults: config.session.clone(),
        }
    }

    pub fn with_snapshotter(mut self, snapshotter: Snapshotter) -> Self {
        self.snapshotter = snapshotter;
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Run one session to completion.
    ///
    /// Returns the command's exit code with the report. Errors only for failures before the
    /// command could run (or when it could not be launched); overlays are already gone when
    /// either returns.
    #[instrument(skip_all, fields(image = %request.image, roots = request.editable.len()))]
    pub fn run(
        &self,
        request: &SessionRequest,
        interrupt: &Interrupt,
    ) -> Result<SessionOutcome, SessionError> {
        let started_at = Utc::now();
        let mut state = SessionState::new();

        state.advance(SessionPhase::Validating);
        let (roots, principal, command) = match self.validate(request) {
            Ok(inputs) => inputs,
            Err(e) => return Err(state.fail(e.into())),
        };
        if interrupt.requested() {
            return Err(state.fail(SessionError::Interrupted {
                phase: SessionPhase::Validating,
            }));
        }

        match self.overlays.prepare(&roots) {
            Ok(set) => state.overlays = Some(set),
            // prepare already removed any overlays it created
            Err(e) => return Err(state.fail(e.into())),
        }
        state.advance(SessionPhase::OverlaysReady);

        if interrupt.requested() {
            return Err(state.fail(SessionError::Interrupted {
                phase: SessionPhase::OverlaysReady,
            }));
        }

        let bindings = state.bindings();
        for (original, overlay) in &bindings {
            match self.snapshotter.capture(overlay) {
                Ok(root_state) => {
                    state.pre.insert(original.clone(), root_state);
                }
                Err(e) => return Err(state.fail(e.into())),
            }
        }
        state.advance(SessionPhase::SnapshottedPre);

        if interrupt.requested() {
            return Err(state.fail(SessionError::Interrupted {
                phase: SessionPhase::SnapshottedPre,
            }));
        }

        let invocation = SandboxInvocation {
            image: request.image.clone(),
            mounts: bindings
                .iter()
                .map(|(original, overlay)| BindMount {
                    host: overlay.clone(),
                    container: match self.mount_target {
                        MountTarget::Overlay => overlay.clone(),
                        MountTarget::Original => original.clone(),
                    },
                    read_write: true,
                })
                .collect(),
            principal: principal.clone(),
            command: command.clone(),
            policy: self.policy.clone(),
        };

        state.advance(SessionPhase::Executing);
        let result = self.runtime.run(&invocation, interrupt);
        interrupt.clear_interrupt();
        let exit_code = match result {
            Ok(code) => code,
            Err(e) => return Err(state.fail(e.into())),
        };
        info!(exit_code, runtime = self.runtime.name(), "Sandboxed command finished");

        for (original, overlay) in &bindings {
            match self.snapshotter.capture(overlay) {
                Ok(root_state) => {
                    state.post.insert(original.clone(), root_state);
                }
                Err(_) if !overlay.exists() => {
                    warn!(root = %original.display(), "Overlay removed during session");
                    state.post.insert(original.clone(), RootState::vanished(overlay));
                }
                Err(e) => {
                    error!(root = %original.display(), "Post-run snapshot failed: {}", e);
                    state.unreadable.push(original.clone());
                }
            }
        }
        state.advance(SessionPhase::SnapshottedPost);

        let report = build_report(
            &state,
            &bindings,
            SessionReport {
                image: request.image.clone(),
                principal,
                command,
                started_at,
                finished_at: Utc::now(),
                exit_code,
                roots: Vec::new(),
                unreadable: Vec::new(),
            },
        );
        state.advance(SessionPhase::Reported);

        let cleanup = state.teardown();
        Ok(SessionOutcome {
            exit_code,
            report,
            cleanup,
        })
    }

    /// Check inputs without touching the filesystem beyond reading metadata
    fn validate(
        &self,
        request: &SessionRequest,
    ) -> Result<(Vec<PathBuf>, String, Vec<String>), ValidationError> {
        if request.image.trim().is_empty() {
            return Err(ValidationError::EmptyImage);
        }

        let mut roots: Vec<PathBuf> = Vec::with_capacity(request.editable.len());
        for path in &request.editable {
            if !path.exists() {
                return Err(ValidationError::MissingPath(path.clone()));
            }
            if !path.is_dir() {
                return Err(ValidationError::NotADirectory(path.clone()));
            }
            let canonical =
                dunce::canonicalize(path).map_err(|e| ValidationError::Unresolvable {
                    path: path.clone(),
                    source: e,
                })?;
            if roots.contains(&canonical) {
                warn!(path = %canonical.display(), "Editable path given more than once");
                continue;
            }
            roots.push(canonical);
        }

        let principal = request
            .principal
            .clone()
            .unwrap_or_else(|| self.defaults.default_user.clone());
        if principal.trim().is_empty() {
            return Err(ValidationError::EmptyPrincipal);
        }

        let command = if request.command.is_empty() {
            self.defaults.default_command.clone()
        } else {
            request.command.clone()
        };

        Ok((roots, principal, command))
    }
}

/// Fill in per-root results. Only roots whose fingerprint moved get a detailed diff.
/// Unreadable roots are listed separately and never diffed.
fn build_report(
    state: &SessionState,
    bindings: &[(PathBuf, PathBuf)],
    mut report: SessionReport,
) -> SessionReport {
    let readable = |root: &PathBuf| !state.unreadable.contains(root);
    let fingerprints = |states: &BTreeMap<PathBuf, RootState>| -> BTreeMap<PathBuf, Hash> {
        states
            .iter()
            .filter(|(root, _)| readable(root))
            .map(|(root, s)| (root.clone(), s.fingerprint))
            .collect()
    };
    let flagged = diff_fingerprints(&fingerprints(&state.pre), &fingerprints(&state.post));

    let pick = |states: &BTreeMap<PathBuf, RootState>| -> BTreeMap<PathBuf, DirectorySnapshot> {
        states
            .iter()
            .filter(|(root, _)| flagged.contains(*root))
            .map(|(root, s)| (root.clone(), s.snapshot.clone()))
            .collect()
    };
    let mut changes = diff_snapshots(&pick(&state.pre), &pick(&state.post));

    for (original, overlay) in bindings {
        if !readable(original) {
            report.unreadable.push(original.clone());
            continue;
        }
        let pre = state.pre.get(original).map(|s| s.fingerprint).unwrap_or_default();
        let post = state
            .post
            .get(original)
            .map(|s| s.fingerprint)
            .unwrap_or_default();
        report.roots.push(RootReport {
            original: original.clone(),
            overlay: overlay.clone(),
            pre_fingerprint: pre,
            post_fingerprint: post,
            changes: changes.remove(original).unwrap_or_default(),
        });
    }

    info!(
        changed = report.changed_roots().count(),
        roots = report.roots.len(),
        unreadable = report.unreadable.len(),
        "Session report built"
    );
    report
}
