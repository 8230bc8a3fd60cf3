//! Arbitration nodes: priority-ordered request groups with change-detected
//! apply side effects.
//!
//! # Architecture
//!
//! ```text
//! update(now)
//!     |
//!     v
//! select ------- pure first-active scan, highest priority first
//!     |
//!     v
//! changed? ----- selected != current_index || reset_on_init
//!     |
//!     v
//! ApplySink ---- apply(name, identifier, value), bracketed by a trace span
//!     |
//!     v
//! WakeHint ----- expiry of the tier that is currently winning
//! ```
//!
//! Selection is separated from the apply step: `select` has no side effects
//! and can be exercised without a sink, while the apply step owns change
//! detection and the once-per-pass guarantee.
//!
//! # Invariants
//!
//! - The last group is the fallback: it carries a default value and always
//!   reports active, so every scan terminates with a decision.
//! - The apply sink fires at most once per `update` call, and only when the
//!   winning tier differs from the applied one (or on the forced initial
//!   synchronization pass).
//! - The returned wake hint is the winning tier's expiry, never some other
//!   tier's: a lease that currently loses needs no wake, because only a
//!   change in the *winner* can make the decision stale.

mod sink;


pub use sink::{ApplySink, CallbackSink};

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use thiserror::Error;
use tracing::{error, trace_span};

use crate::request::{GroupSnapshot, RequestGroup};

/// When a node's arbitration decision may become stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeHint {
    /// Re-evaluate at (or shortly after) this instant.
    At(Instant),
    /// The winning tier cannot lapse; no wake is needed until the next
    /// submission, renewal, or withdrawal.
    Never,
}

impl WakeHint {
    /// The hinted instant, or `None` for [`WakeHint::Never`].
    #[must_use]
    pub fn instant(self) -> Option<Instant> {
        match self {
            Self::At(instant) => Some(instant),
            Self::Never => None,
        }
    }
}

/// Errors from node construction.
///
/// Arbitration correctness depends on a guaranteed-active fallback tier, so
/// a node violating these rules is not instantiable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NodeError {
    /// The node declares no priority tiers at all.
    #[error("node {node} has no priority tiers")]
    NoTiers {
        /// Node name.
        node: String,
    },

    /// The last (fallback) tier has no default value.
    #[error("node {node}: fallback tier {tier} has no default value")]
    FallbackWithoutDefault {
        /// Node name.
        node: String,
        /// Name of the offending tier.
        tier: String,
    },

    /// A non-final tier carries a default value, which would keep it
    /// permanently active and mask every lower tier.
    #[error("node {node}: tier {tier} has a default value but is not the fallback tier")]
    MaskingDefault {
        /// Node name.
        node: String,
        /// Name of the offending tier.
        tier: String,
    },

    /// Two tiers share a name.
    #[error("node {node}: duplicate tier name {tier}")]
    DuplicateTier {
        /// Node name.
        node: String,
        /// The duplicated tier name.
        tier: String,
    },
}

#[derive(Debug)]
struct NodeState {
    current_index: usize,
    reset_on_init: bool,
    applied_value: Option<String>,
}

/// One arbitration unit: an ordered sequence of priority tiers deciding a
/// single control surface.
pub struct Node {
    name: String,
    identifier: String,
    groups: Vec<RequestGroup>,
    default_index: usize,
    state: Mutex<NodeState>,
    sink: Arc<dyn ApplySink>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("tiers", &self.groups.len())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Creates a node from `groups`, ordered highest priority first.
    ///
    /// The apply mechanism is the injected `sink`; a node built with a
    /// callback sink is the event-driven variant, invoked instead of any
    /// direct write.
    ///
    /// With `reset_on_init` set, the first arbitration pass applies its
    /// decision even when the winner equals the fallback, so the external
    /// state is synchronized at startup rather than assumed.
    ///
    /// # Errors
    ///
    /// Returns a [`NodeError`] when the tier list is empty, the last tier
    /// has no default value, an earlier tier has one, or tier names
    /// collide.
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        groups: Vec<RequestGroup>,
        reset_on_init: bool,
        sink: Arc<dyn ApplySink>,
    ) -> Result<Self, NodeError> {
        let name = name.into();
        let Some(last_index) = groups.len().checked_sub(1) else {
            return Err(NodeError::NoTiers { node: name });
        };
        for (index, group) in groups.iter().enumerate() {
            if groups[..index].iter().any(|g| g.name() == group.name()) {
                return Err(NodeError::DuplicateTier {
                    node: name,
                    tier: group.name().to_owned(),
                });
            }
            if index == last_index && group.default_value().is_none() {
                return Err(NodeError::FallbackWithoutDefault {
                    node: name,
                    tier: group.name().to_owned(),
                });
            }
            if index != last_index && group.default_value().is_some() {
                return Err(NodeError::MaskingDefault {
                    node: name,
                    tier: group.name().to_owned(),
                });
            }
        }
        Ok(Self {
            name,
            identifier: identifier.into(),
            groups,
            default_index: last_index,
            state: Mutex::new(NodeState {
                current_index: last_index,
                reset_on_init,
                applied_value: None,
            }),
            sink,
        })
    }

    /// Node name, as handed to the apply sink.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque control-surface identifier, as handed to the apply sink.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Number of priority tiers.
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.groups.len()
    }

    /// Index of the currently applied tier.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_index
    }

    /// Resolves a tier name to its priority index.
    #[must_use]
    pub fn tier_index(&self, tier: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name() == tier)
    }

    /// The request group backing the named tier.
    #[must_use]
    pub fn tier(&self, tier: &str) -> Option<&RequestGroup> {
        self.tier_index(tier).map(|index| &self.groups[index])
    }

    /// Tier at `index`. Callers obtain valid indices from [`tier_index`].
    ///
    /// [`tier_index`]: Node::tier_index
    pub(crate) fn group(&self, index: usize) -> &RequestGroup {
        &self.groups[index]
    }

    /// Runs one arbitration pass.
    ///
    /// Scans tiers from highest priority for the first active one, and if
    /// the winner differs from the applied tier (or the initial
    /// synchronization is pending) invokes the apply sink exactly once.
    /// Repeated passes with no change in winner perform no side effect.
    ///
    /// Always returns the winning tier's expiry as the next wake hint,
    /// whether or not anything was applied: the caller needs it to know
    /// when this decision goes stale.
    pub fn update(&self, now: Instant) -> WakeHint {
        let (selected, snapshot) = self.select(now);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if selected != state.current_index || state.reset_on_init {
            {
                let expires_in = snapshot
                    .expires_at
                    .map(|deadline| deadline.saturating_duration_since(now));
                let span = trace_span!(
                    "apply",
                    node = %self.name,
                    value = %snapshot.value,
                    expires_in = ?expires_in,
                );
                let _guard = span.enter();
                self.sink.apply(&self.name, &self.identifier, &snapshot.value);
            }
            state.current_index = selected;
            state.reset_on_init = false;
            state.applied_value = Some(snapshot.value);
        }
        match snapshot.expires_at {
            Some(deadline) => WakeHint::At(deadline),
            None => WakeHint::Never,
        }
    }

    /// Pure winner selection: the first active tier, scanned from highest
    /// priority. No side effects and no change detection.
    fn select(&self, now: Instant) -> (usize, GroupSnapshot) {
        for (index, group) in self.groups.iter().enumerate() {
            if let Some(snapshot) = group.snapshot(now) {
                return (index, snapshot);
            }
        }
        // The fallback tier always reports active, so this is unreachable
        // through any constructible node. Degrade to the configured default
        // rather than abort.
        error!(node = %self.name, "no active tier found; using fallback default");
        let value = self.groups[self.default_index]
            .default_value()
            .unwrap_or_default()
            .to_owned();
        (
            self.default_index,
            GroupSnapshot {
                value,
                expires_at: None,
            },
        )
    }

    /// Writes a human-readable diagnostics snapshot.
    ///
    /// Never mutates arbitration state. Write failures are logged and
    /// swallowed so a broken diagnostics consumer cannot take the engine
    /// down with it.
    pub fn dump(&self, w: &mut dyn io::Write, now: Instant) {
        if let Err(error) = self.dump_inner(w, now) {
            error!(node = %self.name, %error, "failed to write node dump");
        }
    }

    fn dump_inner(&self, w: &mut dyn io::Write, now: Instant) -> io::Result<()> {
        let (current_index, current_value) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let value = state.applied_value.clone().unwrap_or_else(|| {
                self.groups[self.default_index]
                    .default_value()
                    .unwrap_or_default()
                    .to_owned()
            });
            (state.current_index, value)
        };
        writeln!(w, "Node Name\tIdentifier\tCurrent Index\tCurrent Value")?;
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            self.name, self.identifier, current_index, current_value
        )?;
        for (index, group) in self.groups.iter().enumerate() {
            group.dump_into(w, now, &format!("\t\tReq{index}:\t"))?;
        }
        Ok(())
    }
}
