//! Session phases and the transitions allowed between them

use serde::Serialize;
use std::fmt;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionPhase {
    Idle,
    Validating,
    OverlaysReady,
    SnapshottedPre,
    Executing,
    SnapshottedPost,
    Reported,
    Cleaned,
    Failed,
}

impl SessionPhase {
    /// Whether `self -> to` is a legal transition.
    ///
    /// `Failed` is reachable from every phase before the command has finished. Cleanup
    /// (`Cleaned`) follows `Reported`, a post-snapshot that could not be reported, or a
    /// failure that happened once overlays existed.
    pub fn can_advance_to(self, to: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, to),
            (Idle, Validating)
                | (Validating, OverlaysReady)
                | (Validating, Failed)
                | (OverlaysReady, SnapshottedPre)
                | (OverlaysReady, Failed)
                | (SnapshottedPre, Executing)
                | (SnapshottedPre, Failed)
                | (Executing, SnapshottedPost)
                | (Executing, Failed)
                | (SnapshottedPost, Reported)
                | (SnapshottedPost, Cleaned)
                | (Reported, Cleaned)
                | (Failed, Cleaned)
        )
    }

    /// No further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Cleaned)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Validating => "validating",
            SessionPhase::OverlaysReady => "overlays-ready",
            SessionPhase::SnapshottedPre => "snapshotted(pre)",
            SessionPhase::Executing => "executing",
            SessionPhase::SnapshottedPost => "snapshotted(post)",
            SessionPhase::Reported => "reported",
            SessionPhase::Cleaned => "cleaned",
            SessionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
