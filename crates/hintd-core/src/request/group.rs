//! Request storage for a single priority tier.

use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use super::error::LeaseError;

/// One outstanding leased request.
///
/// Immutable once issued, except that a renewal may push `expires_at`
/// further out and refresh the request's submission recency.
#[derive(Debug, Clone)]
pub struct Request {
    value: String,
    expires_at: Option<Instant>,
    id: u64,
    seq: u64,
}

impl Request {
    /// Creates a request. `id` is the withdrawal key and must be unique
    /// among the requests submitted into one group; [`crate::HintManager`]
    /// issues process-unique ids.
    #[must_use]
    pub fn new(id: u64, value: impl Into<String>, expires_at: Option<Instant>) -> Self {
        Self {
            value: value.into(),
            expires_at,
            id,
            seq: 0,
        }
    }

    /// The value the client wants applied.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Absolute lease deadline; `None` never expires while present.
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    fn is_live_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// One consistent view of a group's effective value and expiry.
///
/// Produced under the group lock in a single acquisition, so the value and
/// expiry always describe the same membership state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Value of the most-recently-submitted live request, or the group's
    /// configured default when no member is live.
    pub value: String,
    /// Instant at which the group stops being active, assuming no further
    /// submissions. `None` when the group cannot lapse (a permanent member
    /// or a configured default keeps it active).
    pub expires_at: Option<Instant>,
}

#[derive(Debug)]
struct GroupInner {
    members: Vec<Request>,
    // Submission recency; renewals take a fresh value so a renewed request
    // counts as the most recent submission again.
    next_seq: u64,
}

/// All outstanding requests at one priority tier.
#[derive(Debug)]
pub struct RequestGroup {
    name: String,
    default_value: Option<String>,
    inner: Mutex<GroupInner>,
}

impl RequestGroup {
    /// Creates an ordinary tier: active only while it has a live member.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: None,
            inner: Mutex::new(GroupInner {
                members: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    /// Creates a fallback tier: always active, contributing `default_value`
    /// whenever no member is live.
    #[must_use]
    pub fn with_default(name: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: Some(default_value.into()),
            inner: Mutex::new(GroupInner {
                members: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    /// Tier name, unique within a node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured default value, present only on fallback tiers.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Active view for an arbitration pass.
    ///
    /// Members whose lease has lapsed by `now` are observed stale and
    /// pruned here; this is the only place requests are removed without an
    /// explicit withdrawal.
    pub fn snapshot(&self, now: Instant) -> Option<GroupSnapshot> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.members.retain(|request| request.is_live_at(now));
        Self::view(&inner.members, self.default_value.as_deref())
    }

    /// Read-only view for diagnostics. Never mutates membership, so a dump
    /// can show a lapsed member that arbitration has not yet pruned.
    pub(crate) fn peek(&self, now: Instant) -> Option<GroupSnapshot> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let live: Vec<Request> = inner
            .members
            .iter()
            .filter(|request| request.is_live_at(now))
            .cloned()
            .collect();
        Self::view(&live, self.default_value.as_deref())
    }

    fn view(live: &[Request], default_value: Option<&str>) -> Option<GroupSnapshot> {
        match live.iter().max_by_key(|request| request.seq) {
            Some(winner) => {
                let mut lapses_never = false;
                let mut latest: Option<Instant> = None;
                for request in live {
                    match request.expires_at {
                        None => lapses_never = true,
                        Some(deadline) => {
                            latest = Some(latest.map_or(deadline, |max| max.max(deadline)));
                        }
                    }
                }
                Some(GroupSnapshot {
                    value: winner.value.clone(),
                    expires_at: if lapses_never { None } else { latest },
                })
            }
            None => default_value.map(|value| GroupSnapshot {
                value: value.to_owned(),
                expires_at: None,
            }),
        }
    }

    /// Adds a request to this tier, making it the most recent submission.
    pub fn submit(&self, request: Request) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.members.push(Request { seq, ..request });
    }

    /// Extends a live request's lease and refreshes its recency.
    ///
    /// The new deadline must be strictly later than the current one
    /// (`None` counts as "already never lapses").
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::RequestGone`] when no member has `id`, and
    /// [`LeaseError::RenewalDoesNotExtend`] when the new deadline does not
    /// extend the lease.
    pub fn renew(&self, id: u64, expires_at: Option<Instant>) -> Result<(), LeaseError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.next_seq;
        let Some(request) = inner.members.iter_mut().find(|request| request.id == id) else {
            return Err(LeaseError::RequestGone { id });
        };
        let extends = match (request.expires_at, expires_at) {
            (Some(current), Some(renewed)) => renewed > current,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !extends {
            return Err(LeaseError::RenewalDoesNotExtend { id });
        }
        request.expires_at = expires_at;
        request.seq = seq;
        inner.next_seq += 1;
        Ok(())
    }

    /// Removes the request with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::RequestGone`] when no member has `id`, either
    /// because it was already withdrawn or because an arbitration pass
    /// pruned its lapsed lease.
    pub fn withdraw(&self, id: u64) -> Result<(), LeaseError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.members.len();
        inner.members.retain(|request| request.id != id);
        if inner.members.len() == before {
            Err(LeaseError::RequestGone { id })
        } else {
            Ok(())
        }
    }

    /// Appends this tier's diagnostic line: name, live count, then each live
    /// request's value with its remaining lease.
    pub(crate) fn dump_into(
        &self,
        w: &mut dyn io::Write,
        now: Instant,
        prefix: &str,
    ) -> io::Result<()> {
        let live: Vec<Request> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner
                .members
                .iter()
                .filter(|request| request.is_live_at(now))
                .cloned()
                .collect()
        };
        write!(w, "{prefix}{}\t{}", self.name, live.len())?;
        for request in &live {
            match request.expires_at {
                Some(deadline) => write!(
                    w,
                    "\t{}@{}ms",
                    request.value,
                    deadline.saturating_duration_since(now).as_millis()
                )?,
                None => write!(w, "\t{}@forever", request.value)?,
            }
        }
        if live.is_empty() {
            if let Some(default_value) = &self.default_value {
                write!(w, "\t{default_value}@default")?;
            }
        }
        writeln!(w)
    }
}
