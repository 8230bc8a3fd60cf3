//! Node registry and request submission surface.
//!
//! The manager is the client-facing edge of the engine: it owns the nodes
//! built from validated configuration, issues opaque [`RequestHandle`]s,
//! rejects submissions naming unknown nodes or tiers before they can reach
//! the arbitration core, and kicks the looper after every mutation so the
//! decision is re-evaluated immediately rather than on the next timer wake.
//!
//! # Architecture
//!
//! ```text
//! client ── submit / renew / withdraw ──> HintManager
//!                                            │ validate, mutate group
//!                                            │ kick
//!                                            v
//!                                         Looper ── update(now) ──> Node
//! ```
//!
//! Handles are plain indices plus a registrar-assigned id; they are only
//! meaningful to the manager that issued them.

mod error;


pub use error::{BuildError, SubmitError};

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::ArbiterConfig;
use crate::looper::Looper;
use crate::node::{ApplySink, Node};
use crate::request::Request;
use crate::time::TimeSource;

/// Opaque claim on one outstanding request, returned by [`HintManager::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    node: usize,
    tier: usize,
    id: u64,
}

/// The registry of arbitration nodes and the submission API over them.
///
/// Dropping the manager stops the looper thread; nodes perform no further
/// arbitration after that.
#[derive(Debug)]
pub struct HintManager {
    nodes: Arc<Vec<Arc<Node>>>,
    names: HashMap<String, usize>,
    looper: Looper,
    clock: Arc<dyn TimeSource>,
    next_id: AtomicU64,
}

impl HintManager {
    /// Builds the node registry from validated configuration and starts the
    /// arbitration looper.
    ///
    /// Every node shares `sink` as its apply side effect; the sink
    /// distinguishes nodes by the `(name, identifier)` arguments it
    /// receives. Nodes configured with `reset_on_init` apply their decision
    /// on the looper's initial pass, before this function's caller observes
    /// any client traffic.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the configuration is invalid, a node is
    /// not constructible, or the looper thread cannot be spawned.
    pub fn from_config(
        config: &ArbiterConfig,
        sink: Arc<dyn ApplySink>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let mut nodes = Vec::with_capacity(config.nodes.len());
        let mut names = HashMap::with_capacity(config.nodes.len());
        for node_config in &config.nodes {
            let groups = node_config.tiers.iter().map(|tier| tier.build()).collect();
            let node = Node::new(
                node_config.name.clone(),
                node_config.identifier.clone(),
                groups,
                node_config.reset_on_init,
                Arc::clone(&sink),
            )?;
            names.insert(node_config.name.clone(), nodes.len());
            nodes.push(Arc::new(node));
        }
        let nodes = Arc::new(nodes);
        let looper =
            Looper::spawn(Arc::clone(&nodes), Arc::clone(&clock)).map_err(BuildError::Spawn)?;
        debug!(nodes = nodes.len(), "hint manager started");
        Ok(Self {
            nodes,
            names,
            looper,
            clock,
            next_id: AtomicU64::new(1),
        })
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Submits a leased request and wakes the arbiter.
    ///
    /// `ttl` of `None` leases the value until it is explicitly withdrawn.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when `node` or `tier` is not registered; an
    /// invalid submission never reaches the arbitration core.
    pub fn submit(
        &self,
        node: &str,
        tier: &str,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Result<RequestHandle, SubmitError> {
        let node_index = *self
            .names
            .get(node)
            .ok_or_else(|| SubmitError::UnknownNode {
                node: node.to_owned(),
            })?;
        let node_ref = &self.nodes[node_index];
        let tier_index = node_ref
            .tier_index(tier)
            .ok_or_else(|| SubmitError::UnknownTier {
                node: node.to_owned(),
                tier: tier.to_owned(),
            })?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        node_ref
            .group(tier_index)
            .submit(Request::new(id, value, expires_at));
        self.looper.kick(node_index);
        Ok(RequestHandle {
            node: node_index,
            tier: tier_index,
            id,
        })
    }

    /// Extends a request's lease and refreshes its recency, making it the
    /// most recent submission in its tier again.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when the handle is foreign, the request is
    /// gone, or the renewal would not extend the current lease.
    pub fn renew(&self, handle: RequestHandle, ttl: Option<Duration>) -> Result<(), SubmitError> {
        let node = self
            .nodes
            .get(handle.node)
            .ok_or(SubmitError::ForeignHandle)?;
        if handle.tier >= node.tier_count() {
            return Err(SubmitError::ForeignHandle);
        }
        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        node.group(handle.tier).renew(handle.id, expires_at)?;
        self.looper.kick(handle.node);
        Ok(())
    }

    /// Withdraws a request. Visible to the very next arbitration pass.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when the handle is foreign or the request
    /// was already withdrawn or pruned.
    pub fn withdraw(&self, handle: RequestHandle) -> Result<(), SubmitError> {
        let node = self
            .nodes
            .get(handle.node)
            .ok_or(SubmitError::ForeignHandle)?;
        if handle.tier >= node.tier_count() {
            return Err(SubmitError::ForeignHandle);
        }
        node.group(handle.tier).withdraw(handle.id)?;
        self.looper.kick(handle.node);
        Ok(())
    }

    /// Writes a diagnostics snapshot of every node, in registration order.
    /// Write failures are logged and swallowed per node.
    pub fn dump(&self, w: &mut dyn io::Write) {
        let now = self.clock.now();
        for node in self.nodes.iter() {
            node.dump(w, now);
        }
    }
}
