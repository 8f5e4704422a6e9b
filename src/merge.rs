use crate::error::DeliveryError;
use crate::handle::RefHandle;
use crate::observer::{Observer, dispatch};
use crate::schedule::{PendingReconcile, schedule_reconcile};
use crate::state::MergeState;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// One component's merged ref.
///
/// Construct once per component instance and call [`merge`](MergeRefs::merge)
/// with the consumer's observers on every update cycle. The returned
/// [`RefHandle`] is what the host attaches and detaches; it never changes.
///
/// When the observer list changes identity between cycles, a reconciliation
/// pass is queued. The host runs it via [`flush_reconciliations`] (or
/// [`Commit::run`]) after its structural changes for the cycle have been
/// committed and after any attach/detach calls for that cycle.
///
/// # Example
/// ```ignore
/// let merged = MergeRefs::new();
/// let a = RefObject::new();
/// let b = RefObject::new();
///
/// let handle = merged.merge([Observer::from(&a), Observer::from(&b)]);
/// handle.attach(node)?;          // a and b now hold `node`
/// flush_reconciliations()?;      // silent: attach already fanned out
///
/// let c = RefObject::new();
/// merged.merge([Observer::from(&b), Observer::from(&c)]);
/// flush_reconciliations()?;      // a -> None, c -> node, b untouched
/// ```
///
/// [`flush_reconciliations`]: crate::flush_reconciliations
/// [`Commit::run`]: crate::Commit::run
pub struct MergeRefs<T> {
    state: Arc<Mutex<MergeState<T>>>,
    handle: RefHandle<T>,
}

impl<T: Clone + Send + Sync + 'static> MergeRefs<T> {
    /// Create a merged ref with no observers and nothing attached
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(MergeState::new()));
        let handle = RefHandle::new(state.clone());
        Self { state, handle }
    }

    /// Create a merged ref and supply the first cycle's observers
    pub fn with_observers<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Observer<T>>,
    {
        let merged = Self::new();
        merged.merge(observers);
        merged
    }

    /// Supply this cycle's observers and get the stable handle.
    ///
    /// Passing a new collection with the same identities in the same order
    /// is not a change. Any other difference queues a reconciliation pass.
    pub fn merge<I>(&self, observers: I) -> RefHandle<T>
    where
        I: IntoIterator<Item = Observer<T>>,
    {
        let newly_pending = {
            let mut state = self.state.lock();
            let changed = state.begin_cycle(observers.into_iter().collect());
            changed && state.mark_pending()
        };

        if newly_pending {
            let weak: Weak<Mutex<MergeState<T>>> = Arc::downgrade(&self.state);
            schedule_reconcile(weak);
        }

        self.handle.clone()
    }

    /// Run the queued reconciliation pass for this component now.
    ///
    /// Returns `Ok(false)` if no pass was queued.
    pub fn reconcile(&self) -> Result<bool, DeliveryError> {
        self.state.reconcile_if_pending()
    }
}

impl<T: Clone> MergeRefs<T> {
    /// The stable handle, same as the one returned by every `merge` call
    pub fn handle(&self) -> RefHandle<T> {
        self.handle.clone()
    }

    /// True while a reconciliation pass is queued
    pub fn needs_reconcile(&self) -> bool {
        self.state.lock().is_pending()
    }

    /// Value currently attached, if any
    pub fn current(&self) -> Option<T> {
        self.state.lock().resource().cloned()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for MergeRefs<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MergeRefs<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeRefs")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T: Clone> PendingReconcile for Mutex<MergeState<T>> {
    fn reconcile_if_pending(&self) -> Result<bool, DeliveryError> {
        let plan = {
            let mut state = self.lock();
            if !state.is_pending() {
                return Ok(false);
            }
            state.on_observer_list_changed()
        };
        dispatch(plan)?;
        Ok(true)
    }
}
