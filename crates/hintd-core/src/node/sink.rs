//! Apply side-effect capabilities.
//!
//! A node never writes to the outside world itself. The mechanism that
//! persists a winning value is injected at construction as an [`ApplySink`],
//! so the arbitration algorithm stays free of I/O and the same node type
//! serves sysfs writers, IPC notifiers, and test recorders alike.

/// The side effect invoked when a node's winning tier changes.
///
/// Called synchronously inside the arbitration pass, at most once per
/// `update` call and only on a tier change. Implementations must be
/// non-blocking; a slow sink stalls every node behind it on the looper.
/// Errors are the sink owner's concern: the engine guarantees the
/// invocation, not its success.
pub trait ApplySink: Send + Sync {
    /// Applies `value` to the control surface named `name` and addressed by
    /// `identifier` (a path or opaque handle, forwarded verbatim from the
    /// node's configuration).
    fn apply(&self, name: &str, identifier: &str, value: &str);
}

/// Adapts a plain closure into an [`ApplySink`].
pub struct CallbackSink<F>(F);

impl<F> CallbackSink<F>
where
    F: Fn(&str, &str, &str) + Send + Sync,
{
    /// Wraps `callback` as an apply sink.
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> ApplySink for CallbackSink<F>
where
    F: Fn(&str, &str, &str) + Send + Sync,
{
    fn apply(&self, name: &str, identifier: &str, value: &str) {
        (self.0)(name, identifier, value);
    }
}
