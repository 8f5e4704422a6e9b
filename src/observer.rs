//! Observers: the consumer side of a merged ref.
//!
//! An observer is either a callback invoked with the attached value (or
//! `None` on detach) or a shared cell whose `current` slot is overwritten.
//! Observers are compared by identity, never by content: two cells created
//! separately are different observers even while both hold the same value,
//! and a clone of an observer is the same observer.

use crate::error::{DeliveryError, ObserverError};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

type CallbackFn<T> = Box<dyn FnMut(Option<&T>) -> Result<(), ObserverError> + Send>;

/// Identity of an observer, derived from its shared allocation.
///
/// Stable for as long as any clone of the observer is alive.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ObserverKey(usize);

impl ObserverKey {
    fn of<U: ?Sized>(arc: &Arc<U>) -> Self {
        Self(Arc::as_ptr(arc) as *const () as usize)
    }
}

/// Callback-style observer
///
/// Cloning shares the underlying closure (and therefore the identity).
pub struct RefCallback<T> {
    inner: Arc<Mutex<CallbackFn<T>>>,
}

impl<T> RefCallback<T> {
    /// Wrap an infallible callback
    pub fn new<F>(mut f: F) -> Self
    where
        F: FnMut(Option<&T>) + Send + 'static,
    {
        Self::fallible(move |value| {
            f(value);
            Ok(())
        })
    }

    /// Wrap a callback that may reject the value it is handed
    ///
    /// Errors are collected and surfaced to whoever triggered the fan-out,
    /// after every other observer has been notified.
    pub fn fallible<F>(f: F) -> Self
    where
        F: FnMut(Option<&T>) -> Result<(), ObserverError> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(f))),
        }
    }

    /// Identity of this callback
    pub fn key(&self) -> ObserverKey {
        ObserverKey::of(&self.inner)
    }
}

impl<T> Clone for RefCallback<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for RefCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefCallback").field(&self.key()).finish()
    }
}

/// Cell-style observer: a shared slot the merged ref writes into.
///
/// The consumer keeps a clone and reads [`current`](RefObject::current)
/// whenever it needs the attached value.
pub struct RefObject<T> {
    current: Arc<RwLock<Option<T>>>,
}

impl<T> RefObject<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Clone of the value currently held, if any
    pub fn current(&self) -> Option<T>
    where
        T: Clone,
    {
        self.current.read().clone()
    }

    /// Access the held value by reference without cloning
    pub fn with_current<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.current.read().as_ref())
    }

    /// Overwrite the held value directly
    pub fn set_current(&self, value: Option<T>) {
        *self.current.write() = value;
    }

    /// True while the cell holds a value
    pub fn is_attached(&self) -> bool {
        self.current.read().is_some()
    }

    /// Identity of this cell
    pub fn key(&self) -> ObserverKey {
        ObserverKey::of(&self.current)
    }
}

impl<T> Default for RefObject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RefObject<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RefObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefObject")
            .field("key", &self.key())
            .field("current", &*self.current.read())
            .finish()
    }
}

/// A consumer of the merged ref: callback or cell.
pub enum Observer<T> {
    /// Invoked with the value on attach and `None` on detach
    Callback(RefCallback<T>),
    /// Has its `current` slot assigned the value or `None`
    Object(RefObject<T>),
}

impl<T> Observer<T> {
    /// Shorthand for an infallible callback observer
    pub fn callback<F>(f: F) -> Self
    where
        F: FnMut(Option<&T>) + Send + 'static,
    {
        Observer::Callback(RefCallback::new(f))
    }

    /// Shorthand for a fallible callback observer
    pub fn try_callback<F>(f: F) -> Self
    where
        F: FnMut(Option<&T>) -> Result<(), ObserverError> + Send + 'static,
    {
        Observer::Callback(RefCallback::fallible(f))
    }

    /// Identity used when diffing observer lists
    pub fn key(&self) -> ObserverKey {
        match self {
            Observer::Callback(callback) => callback.key(),
            Observer::Object(object) => object.key(),
        }
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        match self {
            Observer::Callback(callback) => Observer::Callback(callback.clone()),
            Observer::Object(object) => Observer::Object(object.clone()),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observer::Callback(_) => f.debug_tuple("Callback").field(&self.key()).finish(),
            Observer::Object(_) => f.debug_tuple("Object").field(&self.key()).finish(),
        }
    }
}

impl<T> From<RefCallback<T>> for Observer<T> {
    fn from(callback: RefCallback<T>) -> Self {
        Observer::Callback(callback)
    }
}

impl<T> From<RefObject<T>> for Observer<T> {
    fn from(object: RefObject<T>) -> Self {
        Observer::Object(object)
    }
}

impl<T> From<&RefObject<T>> for Observer<T> {
    fn from(object: &RefObject<T>) -> Self {
        Observer::Object(object.clone())
    }
}

/// Hand `value` to a single observer.
///
/// A callback that is already running further up the stack (it triggered
/// this delivery itself) cannot be entered again; that delivery is skipped
/// with a warning rather than deadlocking or aborting the fan-out.
pub fn deliver<T: Clone>(observer: &Observer<T>, value: Option<&T>) -> Result<(), ObserverError> {
    match observer {
        Observer::Callback(callback) => {
            let Some(mut f) = callback.inner.try_lock() else {
                warn!(
                    observer = ?callback.key(),
                    "ref callback re-entered during its own delivery, skipping"
                );
                return Ok(());
            };
            (*f)(value)
        }
        Observer::Object(object) => {
            *object.current.write() = value.cloned();
            Ok(())
        }
    }
}

/// One planned notification
pub(crate) struct Delivery<T> {
    pub(crate) observer: Observer<T>,
    pub(crate) value: Option<T>,
}

impl<T> Delivery<T> {
    pub(crate) fn new(observer: &Observer<T>, value: Option<T>) -> Self {
        Self {
            observer: observer.clone(),
            value,
        }
    }
}

/// Run a planned fan-out to completion.
///
/// Every delivery is attempted. Callback errors are collected into one
/// [`DeliveryError`]; if a callback panics, the rest of the plan still runs
/// and the first panic is resumed afterwards.
pub(crate) fn dispatch<T: Clone>(plan: Vec<Delivery<T>>) -> Result<(), DeliveryError> {
    let mut failures = Vec::new();
    let mut first_panic = None;

    for Delivery { observer, value } in plan {
        trace!(observer = ?observer.key(), attached = value.is_some(), "delivering ref value");

        match panic::catch_unwind(AssertUnwindSafe(|| deliver(&observer, value.as_ref()))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push(err),
            Err(payload) => {
                warn!(observer = ?observer.key(), "ref callback panicked");
                first_panic.get_or_insert(payload);
            }
        }
    }

    if let Some(payload) = first_panic {
        panic::resume_unwind(payload);
    }

    DeliveryError::from_failures(failures)
}
