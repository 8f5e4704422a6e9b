use crate::error::DeliveryError;
use crate::schedule::flush_reconciliations;
use std::cell::Cell;

// Thread-local commit depth counter.
// When > 0, queued reconciliation passes wait for the outermost commit.
thread_local! {
    static COMMIT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII guard that restores the commit depth even if the commit body panics.
struct CommitGuard;

impl CommitGuard {
    fn enter() -> Self {
        COMMIT_DEPTH.with(|depth| depth.set(depth.get() + 1));
        CommitGuard
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        COMMIT_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Check if currently inside a commit on this thread
pub fn is_commit_active() -> bool {
    COMMIT_DEPTH.with(|depth| depth.get() > 0)
}

/// One host update cycle.
///
/// The body does the cycle's work: supply observer lists with
/// [`MergeRefs::merge`](crate::MergeRefs::merge), mutate the tree, and call
/// [`RefHandle::set`](crate::RefHandle::set) for whatever attached or
/// detached. When the outermost commit returns, the queued reconciliation
/// passes run, which gives them the ordering they need: after the tree
/// mutation and after every attach/detach of the same cycle.
///
/// # Example
/// ```ignore
/// Commit::run(|| {
///     let handle = merged.merge([Observer::from(&a), Observer::from(&b)]);
///     handle.attach(node)
/// })??;
/// ```
///
/// # Nesting
/// Nested commits join the outer one; passes run once, when the outermost
/// commit exits. If the body panics the depth is restored and the queued
/// passes stay queued for the next flush.
///
/// # Errors
/// Observer failures from the flush are returned instead of the body's
/// value, which is dropped. The body's own effects have already happened by
/// then. Bodies whose result must survive a failed flush should return it
/// through a captured variable, or call
/// [`flush_reconciliations`](crate::flush_reconciliations) themselves.
pub struct Commit {
    _private: (),
}

impl Commit {
    /// Run `f` as one update cycle, then flush reconciliation passes
    pub fn run<F, R>(f: F) -> Result<R, DeliveryError>
    where
        F: FnOnce() -> R,
    {
        let value = {
            let _guard = CommitGuard::enter();
            f()
        };

        if !is_commit_active() {
            flush_reconciliations()?;
        }
        Ok(value)
    }
}
