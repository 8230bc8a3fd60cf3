//! Leased value requests and per-tier request groups.
//!
//! A [`Request`] is a value/lease pair: the value a client wants applied and
//! the absolute time its lease lapses. A [`RequestGroup`] holds every
//! outstanding request at one priority tier and answers the only two
//! questions arbitration asks: is anything here still live, and if so, what
//! value and effective expiry does this tier contribute.
//!
//! # Key Concepts
//!
//! - **Lease**: a request is live until its `expires_at` passes; `None`
//!   means it stays live until withdrawn.
//! - **Tie-break**: when several requests are live in one tier, the
//!   most-recently-submitted one supplies the value, while the tier stays
//!   active until the *last* lease lapses (maximum expiry).
//! - **Fallback tier**: a group constructed with a default value reports
//!   active even with no members, which is what guarantees arbitration
//!   always terminates with a decision.
//!
//! Membership is guarded by a per-group lock held only for the duration of
//! a single query or mutation, so submissions on one tier never block
//! arbitration scans of another.

mod error;
mod group;

#[cfg(test)]
mod tests;

pub use error::LeaseError;
pub use group::{GroupSnapshot, Request, RequestGroup};
