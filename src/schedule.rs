use crate::error::{DeliveryError, ObserverError};
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Weak;
use tracing::{debug, warn};

/// A merged ref with a reconciliation pass that may be queued
pub(crate) trait PendingReconcile {
    /// Run the pass if one is still queued; false if there was nothing to do
    fn reconcile_if_pending(&self) -> Result<bool, DeliveryError>;
}

// Thread-local queue of merged refs whose observer list changed this cycle.
// Weak so that dropping a component also drops its queued pass.
thread_local! {
    static PENDING: RefCell<Vec<Weak<dyn PendingReconcile>>> = const { RefCell::new(Vec::new()) };
}

/// Queue a reconciliation pass (called by `MergeRefs::merge`)
pub(crate) fn schedule_reconcile(target: Weak<dyn PendingReconcile>) {
    PENDING.with(|pending| pending.borrow_mut().push(target));
}

/// Check if any reconciliation pass is queued on this thread
pub fn is_reconcile_scheduled() -> bool {
    PENDING.with(|pending| !pending.borrow().is_empty())
}

/// Puts back whatever a batch did not get to if a pass panics.
struct Requeue {
    rest: std::vec::IntoIter<Weak<dyn PendingReconcile>>,
}

impl Drop for Requeue {
    fn drop(&mut self) {
        let rest: Vec<_> = self.rest.by_ref().collect();
        if !rest.is_empty() {
            PENDING.with(|pending| pending.borrow_mut().extend(rest));
        }
    }
}

/// Run every queued reconciliation pass
///
/// The host calls this once per cycle, after its structural changes have
/// been committed and after that cycle's attach/detach calls, and before the
/// next visible frame. Passes queued by observers while flushing run in the
/// same call.
///
/// Returns the number of passes run. Observer failures from all passes are
/// collected into a single [`DeliveryError`]; a panicking observer is resumed
/// after its own pass completes, and passes not yet run stay queued. Failures
/// collected before such a panic cannot be returned, so they are logged with
/// `warn!` before the panic propagates.
///
/// # Example
///
/// ```ignore
/// loop {
///     let handle = merged.merge(observers_for_this_frame());
///     commit_tree(&handle);          // may call handle.attach / detach
///     flush_reconciliations()?;      // diff observer lists
/// }
/// ```
pub fn flush_reconciliations() -> Result<usize, DeliveryError> {
    let mut total = 0;
    let mut failures: Vec<ObserverError> = Vec::new();

    loop {
        let batch = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if batch.is_empty() {
            break;
        }

        let mut batch = Requeue {
            rest: batch.into_iter(),
        };
        while let Some(target) = batch.rest.next() {
            let Some(target) = target.upgrade() else {
                continue;
            };
            let outcome = match catch_unwind(AssertUnwindSafe(|| target.reconcile_if_pending())) {
                Ok(outcome) => outcome,
                Err(panic) => {
                    for failure in &failures {
                        warn!(error = %failure, "observer failure dropped by a panicking flush");
                    }
                    resume_unwind(panic);
                }
            };
            match outcome {
                Ok(true) => total += 1,
                Ok(false) => {}
                Err(err) => {
                    total += 1;
                    failures.extend(err.failures);
                }
            }
        }
    }

    debug!(passes = total, "flushed merged ref reconciliations");
    DeliveryError::from_failures(failures).map(|()| total)
}
