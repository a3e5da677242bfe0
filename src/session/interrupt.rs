//! Interrupt and termination requests
//!
//! While handlers are registered, SIGINT/SIGTERM/SIGHUP no longer kill the process; they set
//! flags the session polls so overlays are always torn down.

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared interrupt/termination flags
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    interrupted: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT to the interrupt flag and SIGTERM/SIGHUP to the termination flag until the
    /// returned guard is dropped.
    pub fn register(&self) -> std::io::Result<SignalGuard> {
        let mut ids = vec![
            signal_hook::flag::register(SIGINT, Arc::clone(&self.interrupted))?,
            signal_hook::flag::register(SIGTERM, Arc::clone(&self.terminated))?,
        ];
        #[cfg(unix)]
        ids.push(signal_hook::flag::register(
            signal_hook::consts::SIGHUP,
            Arc::clone(&self.terminated),
        )?);
        debug!(handlers = ids.len(), "Signal handlers registered");
        Ok(SignalGuard { ids })
    }

    /// Any stop request, interrupt or termination
    pub fn requested(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst) || self.terminated.load(Ordering::SeqCst)
    }

    /// A termination request (SIGTERM, SIGHUP)
    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Forget interrupts delivered while the sandboxed command owned the terminal
    pub fn clear_interrupt(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

/// Unregisters the signal handlers on drop
#[derive(Debug)]
pub struct SignalGuard {
    ids: Vec<SigId>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}
