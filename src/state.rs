//! Shared state of one merged ref and its two entry points.
//!
//! The attachment path ([`MergeState::on_attach`]) and the reconciliation
//! path ([`MergeState::on_observer_list_changed`]) both live on this struct
//! so the rule keeping them from notifying the same observers twice in one
//! cycle is visible in one place. Both return a delivery plan instead of
//! calling observers directly: the caller drops the state lock first and
//! then dispatches, so observers may call back into the merged ref.

use crate::hash::{FastIndexSet, key_set, same_keys, unique_by};
use crate::observer::{Delivery, Observer, ObserverKey};
use tracing::debug;

pub(crate) struct MergeState<T> {
    /// Latest value handed to the attachment path
    resource: Option<T>,
    /// Set by the attachment path, cleared by the next cycle start or
    /// reconciliation pass, whichever comes first
    changed_this_cycle: bool,
    /// List supplied for the current cycle
    live: Vec<Observer<T>>,
    /// List the last reconciliation pass acted upon
    previous: Vec<Observer<T>>,
    /// A reconciliation pass is queued with the host
    reconcile_pending: bool,
}

impl<T: Clone> MergeState<T> {
    pub(crate) fn new() -> Self {
        Self {
            resource: None,
            changed_this_cycle: false,
            live: Vec::new(),
            previous: Vec::new(),
            reconcile_pending: false,
        }
    }

    /// Record that a pass is due; false if one was already queued
    pub(crate) fn mark_pending(&mut self) -> bool {
        !std::mem::replace(&mut self.reconcile_pending, true)
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.reconcile_pending
    }

    pub(crate) fn resource(&self) -> Option<&T> {
        self.resource.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn live(&self) -> &[Observer<T>] {
        &self.live
    }

    /// Start a new cycle with the consumer's freshly supplied list.
    ///
    /// Returns true when the identity sequence differs from the previous
    /// cycle's list, i.e. a reconciliation pass is due.
    pub(crate) fn begin_cycle(&mut self, observers: Vec<Observer<T>>) -> bool {
        // The attachment path ran after the last pass, so the outgoing live
        // list is exactly what holds the value now. Settle it the way a
        // skipped pass would; a leftover flag must not suppress this cycle's
        // pass.
        if self.changed_this_cycle {
            self.previous = self.live.clone();
            self.changed_this_cycle = false;
        }

        let changed = !same_identities(&self.live, &observers);
        self.live = observers;
        changed
    }

    /// Attachment path: the host attached `value` or detached (`None`).
    pub(crate) fn on_attach(&mut self, value: Option<T>) -> Vec<Delivery<T>> {
        let mut plan = Vec::new();
        let live_keys = keys(&self.live);

        if self.resource.is_some() {
            // Whoever holds the outgoing value. Once this path already ran in
            // the current cycle, that is the live list; otherwise it is the
            // list the last reconciliation pass left behind.
            let holders = if self.changed_this_cycle {
                &self.live
            } else {
                &self.previous
            };
            for observer in unique(holders) {
                // On attach, observers still in the live list get the new
                // value below instead of an intermediate `None`.
                if value.is_none() || !live_keys.contains(&observer.key()) {
                    plan.push(Delivery::new(observer, None));
                }
            }
        }

        if let Some(value) = &value {
            for observer in unique(&self.live) {
                plan.push(Delivery::new(observer, Some(value.clone())));
            }
        }

        debug!(
            attached = value.is_some(),
            deliveries = plan.len(),
            "merged ref attachment changed"
        );

        self.resource = value;
        self.changed_this_cycle = true;
        plan
    }

    /// Reconciliation path: the live list differs from the one last acted upon.
    pub(crate) fn on_observer_list_changed(&mut self) -> Vec<Delivery<T>> {
        let mut plan = Vec::new();

        if self.changed_this_cycle {
            // The attachment path already fanned out to the live list.
            debug!("attachment changed this cycle, skipping reconciliation");
        } else if let Some(value) = &self.resource {
            let previous_keys = keys(&self.previous);
            let live_keys = keys(&self.live);

            for observer in unique(&self.previous) {
                if !live_keys.contains(&observer.key()) {
                    plan.push(Delivery::new(observer, None));
                }
            }
            let removed = plan.len();

            for observer in unique(&self.live) {
                if !previous_keys.contains(&observer.key()) {
                    plan.push(Delivery::new(observer, Some(value.clone())));
                }
            }

            debug!(
                removed,
                added = plan.len() - removed,
                "reconciled merged ref observers"
            );
        }

        // With nothing attached, removed observers already hold `None` and
        // added ones have nothing to receive.
        self.previous = self.live.clone();
        self.changed_this_cycle = false;
        self.reconcile_pending = false;
        plan
    }
}

fn keys<T>(observers: &[Observer<T>]) -> FastIndexSet<ObserverKey> {
    key_set(observers, Observer::key)
}

/// Observers in list order with repeated identities dropped
fn unique<T>(observers: &[Observer<T>]) -> impl Iterator<Item = &Observer<T>> {
    unique_by(observers, Observer::key)
}

/// Order- and length-sensitive identity comparison of two lists
pub(crate) fn same_identities<T>(a: &[Observer<T>], b: &[Observer<T>]) -> bool {
    same_keys(a, b, Observer::key)
}
