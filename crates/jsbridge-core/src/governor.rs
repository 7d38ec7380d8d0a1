//! Execution Governor
//!
//! Tracks the wall-clock budget of script execution. Every entry into the
//! engine that can run script code opens a [`BudgetWindow`]; the engine polls
//! [`ExecutionGovernor::should_interrupt`] between bytecode steps and aborts
//! once the budget of the outermost window is spent.
//!
//! Reentrant entries (a host callback calling back into the same runtime)
//! open nested windows that share the outermost start time, so the budget
//! is neither reset nor counted twice.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock budget state for one runtime
#[derive(Debug, Default)]
pub struct ExecutionGovernor {
    /// Configured budget (None = unlimited)
    limit: Mutex<Option<Duration>>,

    /// Start of the outermost open window
    started: Mutex<Option<Instant>>,

    /// Number of open windows
    depth: AtomicUsize,

    /// Set when a poll requested an interrupt inside the current outermost window
    interrupted: AtomicBool,
}

impl ExecutionGovernor {
    /// Create a governor with an optional budget
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit: Mutex::new(limit),
            ..Default::default()
        }
    }

    /// Replace the budget; takes effect for the next poll
    pub fn set_limit(&self, limit: Option<Duration>) {
        *self.limit.lock() = limit;
    }

    /// Configured budget
    pub fn limit(&self) -> Option<Duration> {
        *self.limit.lock()
    }

    /// Open a budget window.
    ///
    /// Only the outermost window records a start time and resets the
    /// interrupt flag. The window closes when the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> BudgetWindow {
        let outermost = self.depth.fetch_add(1, Ordering::SeqCst) == 0;
        if outermost {
            self.interrupted.store(false, Ordering::SeqCst);
            *self.started.lock() = Some(Instant::now());
            log::trace!("budget window opened (limit {:?})", self.limit());
        }
        BudgetWindow {
            governor: Arc::clone(self),
            outermost,
        }
    }

    /// Interrupt poll called by the engine.
    ///
    /// Returns true once the outermost window has been open for at least the
    /// configured budget. Never interrupts when no window is open or no budget
    /// is configured.
    pub fn should_interrupt(&self) -> bool {
        let Some(limit) = self.limit() else {
            return false;
        };
        let Some(started) = *self.started.lock() else {
            return false;
        };
        if started.elapsed() >= limit {
            self.interrupted.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Whether an interrupt was requested in the current outermost window.
    ///
    /// Always false once that window has closed.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Whether a window is open
    pub fn is_running(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }

    /// Time spent in the current outermost window
    pub fn elapsed(&self) -> Option<Duration> {
        self.started.lock().map(|started| started.elapsed())
    }

    /// Number of open windows
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Guard for an open budget window
#[derive(Debug)]
pub struct BudgetWindow {
    governor: Arc<ExecutionGovernor>,
    outermost: bool,
}

impl BudgetWindow {
    /// Whether this window started the budget
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for BudgetWindow {
    fn drop(&mut self) {
        self.governor.depth.fetch_sub(1, Ordering::SeqCst);
        if self.outermost {
            *self.governor.started.lock() = None;
            self.governor.interrupted.store(false, Ordering::SeqCst);
            log::trace!("budget window closed");
        }
    }
}
