//! Session reports and their rendering

use crate::diff::{tally, ChangeKind, ChangeRecord};
use crate::types::{short_hex, Hash};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::{Serialize, Serializer};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

/// Result for one editable root
#[derive(Debug, Clone, Serialize)]
pub struct RootReport {
    /// Host directory the user named
    pub original: PathBuf,
    /// Working copy the command actually wrote to
    pub overlay: PathBuf,
    #[serde(serialize_with = "serialize_hash")]
    pub pre_fingerprint: Hash,
    #[serde(serialize_with = "serialize_hash")]
    pub post_fingerprint: Hash,
    pub changes: Vec<ChangeRecord>,
}

impl RootReport {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Everything a finished session has to say
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub image: String,
    pub principal: String,
    pub command: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exit_code: i32,
    pub roots: Vec<RootReport>,
    /// Roots whose overlay could not be read after the run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<PathBuf>,
}

impl SessionReport {
    pub fn changed_roots(&self) -> impl Iterator<Item = &RootReport> {
        self.roots.iter().filter(|r| r.changed())
    }

    pub fn has_changes(&self) -> bool {
        self.changed_roots().next().is_some()
    }
}

fn serialize_hash<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(hash))
}

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("Invalid format: {} (must be 'text' or 'json')", other)),
        }
    }
}

/// Render a report in the requested format
pub fn render(
    report: &SessionReport,
    format: ReportFormat,
    color: bool,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report),
        ReportFormat::Text => Ok(render_text(report, color)),
    }
}

/// Human-readable report: one block per root, one line per change
pub fn render_text(report: &SessionReport, color: bool) -> String {
    let mut out = String::new();

    for root in &report.roots {
        let title = root.original.display().to_string();
        let title = if color {
            title.bold().to_string()
        } else {
            title
        };

        if !root.changed() {
            let _ = writeln!(out, "{}: no changes", title);
            continue;
        }

        let counts = tally(&root.changes);
        let _ = writeln!(
            out,
            "{}: {} added, {} modified, {} removed ({} -> {})",
            title,
            counts.get(&ChangeKind::Added).unwrap_or(&0),
            counts.get(&ChangeKind::Modified).unwrap_or(&0),
            counts.get(&ChangeKind::Removed).unwrap_or(&0),
            short_hex(&root.pre_fingerprint),
            short_hex(&root.post_fingerprint),
        );
        for record in &root.changes {
            let _ = writeln!(out, "  {}", render_record(record, color));
        }
    }

    for root in &report.unreadable {
        let _ = writeln!(out, "{}: post-run snapshot failed", root.display());
    }

    let changed = report.changed_roots().count();
    if changed == 0 {
        out.push_str("No changes detected.");
    } else {
        let _ = write!(
            out,
            "Directories changed during session: {} of {}",
            changed,
            report.roots.len()
        );
    }
    out
}

fn render_record(record: &ChangeRecord, color: bool) -> String {
    if !color {
        return record.to_string();
    }
    let label = record.kind.to_string();
    let label = match record.kind {
        ChangeKind::Added => label.green().to_string(),
        ChangeKind::Modified => label.yellow().to_string(),
        ChangeKind::Removed => label.red().to_string(),
    };
    format!("{}: {}", label, record.path)
}
