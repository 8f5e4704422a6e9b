use crate::error::{DeliveryError, ObserverError};
use crate::observer::{Observer, RefCallback, dispatch};
use crate::state::MergeState;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// The stable entry point handed to the host.
///
/// The host calls [`set`](RefHandle::set) with the attached value and with
/// `None` on detach, exactly as it would call a single ref callback. Every
/// [`MergeRefs::merge`](crate::MergeRefs::merge) call on one component returns
/// a handle equal to all the others, no matter how the observer list changes,
/// so the host never mistakes a list update for a re-attach.
pub struct RefHandle<T> {
    state: Arc<Mutex<MergeState<T>>>,
    /// This handle as a callback observer, created once so its identity is
    /// as stable as the handle's.
    observer: RefCallback<T>,
}

impl<T: Clone + Send + Sync + 'static> RefHandle<T> {
    pub(crate) fn new(state: Arc<Mutex<MergeState<T>>>) -> Self {
        let weak: Weak<Mutex<MergeState<T>>> = Arc::downgrade(&state);
        let observer = RefCallback::fallible(move |value: Option<&T>| {
            let Some(state) = weak.upgrade() else {
                return Ok(());
            };
            let plan = state.lock().on_attach(value.cloned());
            dispatch(plan).map_err(|err| ObserverError::Other(Box::new(err)))
        });
        Self { state, observer }
    }
}

impl<T: Clone> RefHandle<T> {
    /// Attachment notifier: record `value` and fan it out to the live list.
    ///
    /// Returns the failures of fallible observers once every observer has
    /// been notified. A panicking observer is resumed after the fan-out.
    pub fn set(&self, value: Option<T>) -> Result<(), DeliveryError> {
        let plan = self.state.lock().on_attach(value);
        dispatch(plan)
    }

    /// The host attached `value`
    pub fn attach(&self, value: T) -> Result<(), DeliveryError> {
        self.set(Some(value))
    }

    /// The host detached the resource
    pub fn detach(&self) -> Result<(), DeliveryError> {
        self.set(None)
    }

    /// Value most recently handed to [`set`](RefHandle::set)
    pub fn current(&self) -> Option<T> {
        self.state.lock().resource().cloned()
    }

    /// This handle as an observer, for merging a merged ref into another one
    ///
    /// Repeated calls return the same observer identity.
    pub fn as_observer(&self) -> Observer<T> {
        Observer::Callback(self.observer.clone())
    }

    /// True if both handles drive the same merged ref
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            observer: self.observer.clone(),
        }
    }
}

impl<T> PartialEq for RefHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Eq for RefHandle<T> {}

impl<T> fmt::Debug for RefHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefHandle")
            .field("state", &Arc::as_ptr(&self.state))
            .finish()
    }
}

impl<T: Clone> From<&RefHandle<T>> for Observer<T> {
    fn from(handle: &RefHandle<T>) -> Self {
        handle.as_observer()
    }
}
