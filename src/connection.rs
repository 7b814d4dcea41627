//! The capability interface for pooled resources.
//!
//! Anything that can be established, torn down, and probed for liveness can
//! live in a [`ConnectionPool`](crate::pool::ConnectionPool), such as a
//! database session or a socket.

use std::fmt;

/// A stateful, reusable resource managed by a pool.
///
/// The pool calls every one of these operations while holding its internal
/// lock, so implementations should keep them short and must not call back
/// into the pool.
///
/// Connections enter the pool unconnected; the pool attempts `connect` the
/// first time one is checked out, and again whenever a connection no longer
/// reports healthy at checkout or release time.
pub trait Connection: Send + 'static {
    /// Attempt to establish the underlying resource. Returns whether the
    /// connection is now established.
    fn connect(&mut self) -> bool;

    /// Tear down the underlying resource. Best effort.
    fn disconnect(&mut self);

    /// Cheap, non-blocking liveness check.
    fn is_healthy(&self) -> bool;

    /// Active liveness probe, such as a ping. May have side effects on the
    /// underlying resource. The pool invokes this during sweeps but does
    /// not act on the result.
    fn heartbeat(&mut self) -> bool;
}

/// Identity of a pooled connection, unique within its pool.
///
/// Assigned at pool construction and stable for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection-{}", self.0)
    }
}
