//! Timer-driven arbitration scheduler.
//!
//! One worker thread per manager tracks, for every node, the instant at
//! which its current decision may go stale. The thread sleeps until the
//! earliest deadline or an explicit kick (a submission, renewal, or
//! withdrawal), re-runs the affected arbitration passes, and stores the
//! returned wake hints as the new deadlines.
//!
//! Deadlines are hints, not hard timers: a wake may come early (a kick) or
//! late (scheduler jitter), and both are harmless because `Node::update` is
//! idempotent. The worker also serializes all passes for its nodes, which
//! satisfies the per-node serialization requirement for free.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use crate::node::Node;
use crate::time::TimeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WakeSignal {
    /// Re-evaluate one node immediately.
    Kick(usize),
    Shutdown,
}

/// Handle to the scheduler thread. Stops and joins the worker on drop.
#[derive(Debug)]
pub(crate) struct Looper {
    tx: Sender<WakeSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Looper {
    /// Spawns the worker. Every node gets one initial arbitration pass so
    /// `reset_on_init` synchronization happens before any client traffic.
    pub(crate) fn spawn(
        nodes: Arc<Vec<Arc<Node>>>,
        clock: Arc<dyn TimeSource>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("hintd-looper".to_owned())
            .spawn(move || {
                let deadlines = vec![None; nodes.len()];
                Worker {
                    nodes,
                    clock,
                    rx,
                    deadlines,
                }
                .run();
            })?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Requests an immediate arbitration pass for one node.
    pub(crate) fn kick(&self, node_index: usize) {
        if self.tx.send(WakeSignal::Kick(node_index)).is_err() {
            warn!(node_index, "arbitration looper is gone; wake signal dropped");
        }
    }

    fn stop(&mut self) {
        let _ = self.tx.send(WakeSignal::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("arbitration looper panicked during shutdown");
            }
        }
    }
}

impl Drop for Looper {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    nodes: Arc<Vec<Arc<Node>>>,
    clock: Arc<dyn TimeSource>,
    rx: Receiver<WakeSignal>,
    deadlines: Vec<Option<Instant>>,
}

impl Worker {
    fn run(mut self) {
        debug!(nodes = self.nodes.len(), "arbitration looper started");
        let now = self.clock.now();
        for index in 0..self.nodes.len() {
            self.refresh(index, now);
        }

        loop {
            let signal = match self.next_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(self.clock.now());
                    self.rx.recv_timeout(timeout)
                }
                // Nothing can expire; park until the next kick.
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match signal {
                Ok(WakeSignal::Kick(index)) => {
                    let now = self.clock.now();
                    self.refresh(index, now);
                    self.run_due(now);
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.run_due(self.clock.now());
                }
                Ok(WakeSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("arbitration looper stopped");
    }

    fn refresh(&mut self, index: usize, now: Instant) {
        if let Some(node) = self.nodes.get(index) {
            self.deadlines[index] = node.update(now).instant();
        }
    }

    /// Re-runs every node whose deadline has passed. A pass always returns
    /// a strictly future deadline (or none), so this cannot spin.
    fn run_due(&mut self, now: Instant) {
        for index in 0..self.nodes.len() {
            if self.deadlines[index].is_some_and(|deadline| deadline <= now) {
                self.refresh(index, now);
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().copied().min()
    }
}
