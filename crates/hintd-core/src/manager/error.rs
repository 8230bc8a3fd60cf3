//! Registry construction and submission errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::node::NodeError;
use crate::request::LeaseError;

/// Errors from building a manager out of configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A node was not constructible from its configuration.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// The arbitration looper thread could not be spawned.
    #[error("failed to spawn the arbitration looper thread")]
    Spawn(#[source] std::io::Error),
}

/// Errors from request submission, renewal, or withdrawal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    /// The named node is not registered.
    #[error("unknown node: {node}")]
    UnknownNode {
        /// The name that failed to resolve.
        node: String,
    },

    /// The node exists but has no tier with the given name.
    #[error("node {node} has no tier named {tier}")]
    UnknownTier {
        /// Node name.
        node: String,
        /// The tier name that failed to resolve.
        tier: String,
    },

    /// The handle was not issued by this manager.
    #[error("request handle does not belong to this manager")]
    ForeignHandle,

    /// The underlying lease operation failed.
    #[error(transparent)]
    Lease(#[from] LeaseError),
}
