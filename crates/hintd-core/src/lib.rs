//! Control-node arbitration for platform power hints.
//!
//! Multiple clients concurrently request different values for one control
//! surface (a governor knob, a clock throttle, a scheduling hint), at
//! different priorities and for different durations. This crate decides the
//! single effective value, knows exactly when that decision can go stale,
//! and invokes a registered apply callback only when the winner actually
//! changes.
//!
//! # Architecture
//!
//! ```text
//! client ── submit/renew/withdraw ──> HintManager
//!                                         │ kick
//!                                         v
//!                                      Looper ── update(now) ──> Node
//!                                         ^                       │
//!                                         └────── WakeHint ───────┘
//!                                                                 │ winner changed
//!                                                                 v
//!                                                            ApplySink
//! ```
//!
//! # Key Concepts
//!
//! - **Strict highest-priority-wins**: the first tier with a live request
//!   takes the node; lower tiers are irrelevant while it holds.
//! - **Leases**: every request carries an optional deadline, and the engine
//!   re-evaluates on its own when the winning lease lapses; nobody has to
//!   call in.
//! - **Change detection**: the apply callback fires only on winning-tier
//!   transitions, never redundantly.
//! - **Guaranteed decision**: the last tier of every node is an
//!   always-active fallback with a configured default value.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hintd_core::{ArbiterConfig, CallbackSink, HintManager, SystemTimeSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ArbiterConfig::from_toml(
//!     r#"
//!     [[nodes]]
//!     name = "cpu-governor"
//!     identifier = "cpu0"
//!     reset_on_init = true
//!
//!     [[nodes.tiers]]
//!     name = "interactive"
//!
//!     [[nodes.tiers]]
//!     name = "default"
//!     default = "schedutil"
//!     "#,
//! )?;
//!
//! let sink = Arc::new(CallbackSink::new(|name: &str, identifier: &str, value: &str| {
//!     println!("{name} ({identifier}) -> {value}");
//! }));
//! let manager = HintManager::from_config(&config, sink, Arc::new(SystemTimeSource))?;
//!
//! // "performance" wins the node for half a second, then the engine falls
//! // back to "schedutil" on its own.
//! let handle = manager.submit(
//!     "cpu-governor",
//!     "interactive",
//!     "performance",
//!     Some(Duration::from_millis(500)),
//! )?;
//! manager.withdraw(handle)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod node;
pub mod request;
pub mod time;

mod looper;

pub use config::{ArbiterConfig, ConfigError, NodeConfig, TierConfig};
pub use manager::{BuildError, HintManager, RequestHandle, SubmitError};
pub use node::{ApplySink, CallbackSink, Node, NodeError, WakeHint};
pub use request::{GroupSnapshot, LeaseError, Request, RequestGroup};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
