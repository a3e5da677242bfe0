//! Cordon: sandboxed command sessions with change reports
//!
//! Copies the directories a command may edit into disposable overlays, runs the command in an
//! isolated container against those overlays, and reports which files it added, modified, or
//! removed. The host directories are never written.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod report;
pub mod runtime;
pub mod session;
pub mod tree;
pub mod types;
