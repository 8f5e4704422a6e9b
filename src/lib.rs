#![deny(missing_docs)]

//! One stable ref handle fanned out to a changing list of observers.
//!
//! A host (a UI tree, a scene graph, anything that attaches and detaches
//! nodes) hands a single callback the node when it attaches and `None` when
//! it detaches. This crate lets several independent consumers share that one
//! callback. Each consumer supplies an observer, either a callback or a
//! [`RefObject`] cell, and the list of observers may change from one update
//! cycle to the next without the host ever seeing a different handle.
//!
//! # Quick Start
//!
//! ```ignore
//! use merge_refs::{Commit, MergeRefs, Observer, RefObject};
//!
//! let merged = MergeRefs::new();
//! let measured = RefObject::new();
//! let focused = RefObject::new();
//!
//! // Cycle 1: both consumers want the node
//! Commit::run(|| {
//!     let handle = merged.merge([Observer::from(&measured), Observer::from(&focused)]);
//!     handle.attach(node)
//! })??;
//! assert_eq!(measured.current(), Some(node));
//!
//! // Cycle 2: `focused` goes away, a logging callback joins
//! Commit::run(|| {
//!     merged.merge([
//!         Observer::from(&measured),
//!         Observer::callback(|node| println!("node: {node:?}")),
//!     ])
//! })?;
//! // focused -> None, callback -> Some(node), measured untouched
//! ```
//!
//! # Core Types
//!
//! - [`MergeRefs`] - One per component. [`merge`](MergeRefs::merge) supplies
//!   the cycle's observers and returns the stable handle.
//! - [`RefHandle`] - What the host calls on attach/detach. Identity never
//!   changes for the lifetime of its [`MergeRefs`].
//! - [`Observer`] - `Callback` or `Object`, compared by identity.
//! - [`Commit`] - One host update cycle; flushes reconciliation on exit.
//!
//! # Guarantees
//!
//! - An observer never receives the same value twice in a row.
//! - An observer added while a node is attached gets exactly one call with
//!   that node; the others get nothing.
//! - An observer removed from the list gets exactly one `None`, then nothing.
//! - When an attach/detach and a list change land in the same cycle, the
//!   attach/detach fan-out covers the change and the reconciliation pass
//!   stays silent.
//!
//! # Host contract
//!
//! Everything is synchronous and single-threaded per component. The host
//! must run [`flush_reconciliations`] (or let [`Commit::run`] do it) after
//! the cycle's tree mutation and attach/detach calls, and before the next
//! visible frame. Calling it out of that order is not detected.
//!
//! # Helpers
//!
//! - [`shallow`] - shallow equality of attribute mappings and a settings mirror.
//! - [`dom`] - range height from client rects, insert-after for sibling lists.

mod commit;
pub mod dom;
mod error;
mod handle;
mod hash;
mod merge;
mod observer;
mod schedule;
pub mod shallow;
mod state;

// Core types
pub use handle::RefHandle;
pub use merge::MergeRefs;
pub use observer::{Observer, ObserverKey, RefCallback, RefObject, deliver};

// Cycle handling
pub use commit::{Commit, is_commit_active};
pub use schedule::{flush_reconciliations, is_reconcile_scheduled};

// Errors
pub use error::{BoxError, DeliveryError, DomError, ObserverError};
