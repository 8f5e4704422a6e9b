use thiserror::Error;

/// Boxed error type accepted from fallible ref callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a single fallible ref callback.
#[derive(Error, Debug)]
pub enum ObserverError {
    /// The callback refused the value it was handed
    #[error("observer rejected value: {0}")]
    Rejected(String),

    /// Any other error raised by the callback
    #[error(transparent)]
    Other(#[from] BoxError),
}

/// Every observer failure raised during one fan-out.
///
/// Failures are collected while the remaining observers are still being
/// notified, so by the time a caller sees this error the whole fan-out has
/// already happened and the merged ref state is up to date.
#[derive(Error, Debug)]
#[error("{} observer(s) failed during delivery", .failures.len())]
pub struct DeliveryError {
    /// Failures in delivery order
    pub failures: Vec<ObserverError>,
}

impl DeliveryError {
    pub(crate) fn from_failures(failures: Vec<ObserverError>) -> Result<(), Self> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self { failures })
        }
    }
}

/// Failure of a sibling-list insertion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node to insert after is not a child of the list
    #[error("reference node is not a child of the parent")]
    ReferenceNotFound,
}
