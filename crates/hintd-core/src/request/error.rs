//! Request lease errors.

use thiserror::Error;

/// Errors from lease operations on a request group.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LeaseError {
    /// The request is no longer present: it was withdrawn, or its lease
    /// lapsed and an arbitration pass already pruned it.
    #[error("request {id} is gone: withdrawn or lease already lapsed")]
    RequestGone {
        /// Handle id of the missing request.
        id: u64,
    },

    /// A renewal must strictly extend the active lease.
    #[error("renewal for request {id} does not extend the active lease")]
    RenewalDoesNotExtend {
        /// Handle id of the request being renewed.
        id: u64,
    },
}
