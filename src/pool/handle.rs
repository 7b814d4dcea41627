//! Scoped borrow handle for a checked-out connection.
//!
//! Holds the connection itself for the duration of the borrow and gives it
//! back to the pool when dropped, whether the scope exits normally or by
//! unwinding.

use std::fmt;
use std::sync::Weak;

use crate::connection::{Connection, ConnectionId};
use crate::pool::registry::ConnectionPool;

/// A scoped borrow of one pooled connection.
///
/// Returned by [`ConnectionPool::checkout`]. Move-only: ownership of the
/// borrow transfers with the value and there is no way to duplicate it, so
/// at most one live handle exists per busy connection. An armed handle
/// releases its connection exactly once, either when dropped or earlier
/// through [`release`](ConnectionHandle::release); after that the handle is
/// spent and finalization is a no-op.
pub struct ConnectionHandle<C: Connection> {
    /// Armed while `Some`; taken exactly once on release
    connection: Option<C>,

    /// Identity of the borrowed connection within its pool
    id: ConnectionId,

    /// The pool to give the connection back to
    pool: Weak<ConnectionPool<C>>,
}

impl<C: Connection> ConnectionHandle<C> {
    pub(crate) fn new(id: ConnectionId, connection: C, pool: Weak<ConnectionPool<C>>) -> Self {
        Self {
            connection: Some(connection),
            id,
            pool,
        }
    }

    /// Identity of the borrowed connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Shared access to the underlying connection.
    pub fn get(&self) -> &C {
        self.connection.as_ref().expect("handle already spent")
    }

    /// Exclusive access to the underlying connection.
    pub fn get_mut(&mut self) -> &mut C {
        self.connection.as_mut().expect("handle already spent")
    }

    /// Whether this handle still corresponds to a checked-out connection.
    ///
    /// Acquires the pool lock and reports whether the identity is in the
    /// busy set. Returns false for a spent handle or when the pool no
    /// longer exists.
    pub fn valid(&self) -> bool {
        if self.connection.is_none() {
            return false;
        }

        match self.pool.upgrade() {
            Some(pool) => pool.is_busy(self.id),
            None => false,
        }
    }

    /// Return the connection to the pool now instead of at scope exit.
    ///
    /// Consuming `self` leaves nothing to release a second time.
    pub fn release(self) {}
}

impl<C: Connection> Drop for ConnectionHandle<C> {
    fn drop(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            match self.pool.upgrade() {
                Some(pool) => pool.release_connection(self.id, connection),
                // The pool is gone; there is nowhere to return to.
                None => connection.disconnect(),
            }
        }
    }
}

impl<C: Connection> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.connection.is_some() {
            write!(f, "ConnectionHandle({})", self.id)
        } else {
            write!(f, "ConnectionHandle(spent)")
        }
    }
}
