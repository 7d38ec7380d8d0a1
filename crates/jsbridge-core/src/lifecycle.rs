//! Resource Lifecycle Manager
//!
//! Ownership forms a tree: a runtime owns contexts, a context owns the
//! function, array, and object handles it produced. Each scope keeps a
//! registry of its dependents as weak references keyed by id, so the host can
//! drop a handle at any time without the scope keeping it alive.
//!
//! Closing a scope releases every live dependent first, collecting failures
//! instead of stopping at the first one, and only then frees the scope's own
//! native resource. Dropping the last host reference to a resource runs the
//! same release as a backstop; release is idempotent, so the explicit and the
//! drop-driven paths can both run without harm.

use crate::error::{BridgeError, BridgeResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

/// A resource that can release its native side
pub(crate) trait Release {
    /// Free the native resource. Releasing twice is a no-op.
    fn release(&self) -> BridgeResult<()>;

    /// Short description used in log messages
    fn describe(&self) -> String;

    /// Number of dependents this resource owns in turn
    fn dependent_count(&self) -> usize {
        0
    }
}

/// Outcome of closing a scope
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Number of dependents released by the cascade
    pub released: usize,

    /// Failures collected while releasing dependents
    pub failures: Vec<BridgeError>,
}

impl CloseReport {
    /// Whether every dependent was released cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of dependents owned by one scope
#[derive(Default)]
pub(crate) struct Dependents {
    entries: RefCell<HashMap<u64, Weak<dyn Release>>>,
}

impl Dependents {
    pub(crate) fn register(&self, id: u64, dependent: Weak<dyn Release>) {
        self.entries.borrow_mut().insert(id, dependent);
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.entries.borrow_mut().remove(&id);
    }

    /// Number of registered dependents that are still alive
    pub(crate) fn live(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|d| d.strong_count() > 0)
            .count()
    }

    /// Dependents of the live dependents, one level down
    pub(crate) fn nested(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .map(|d| d.dependent_count())
            .sum()
    }

    /// Release every live dependent.
    ///
    /// The registry is emptied before any dependent runs, so a dependent that
    /// unregisters itself while releasing does not touch the borrowed map.
    pub(crate) fn release_all(&self, scope: &str) -> CloseReport {
        let drained: Vec<(u64, Weak<dyn Release>)> = self.entries.borrow_mut().drain().collect();
        let mut report = CloseReport::default();
        for (id, dependent) in drained {
            let Some(dependent) = dependent.upgrade() else {
                continue;
            };
            match dependent.release() {
                Ok(()) => report.released += 1,
                Err(err) => {
                    log::warn!(
                        "{}: failed to release dependent {} ({}): {}",
                        scope,
                        id,
                        dependent.describe(),
                        err
                    );
                    report.failures.push(err);
                }
            }
        }
        log::debug!(
            "{}: released {} dependents ({} failures)",
            scope,
            report.released,
            report.failures.len()
        );
        report
    }
}
