//! The sole construction path for connection pools.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::connection::{Connection, ConnectionId};
use crate::pool::registry::ConnectionPool;

/// Builds pools of a single concrete connection type.
///
/// [`ConnectionPool`] has no exported constructor; every pool starts here.
/// That keeps every connection a pool owns coming from one type-consistent
/// source, carrying a unique identity, and starting out idle and
/// unconnected; the first checkout establishes it.
pub struct ConnectionPoolFactory<C: Connection> {
    _marker: PhantomData<C>,
}

impl<C: Connection> ConnectionPoolFactory<C> {
    /// Build a pool of `count` default-constructed connections.
    pub fn create(count: usize) -> Arc<ConnectionPool<C>>
    where
        C: Default,
    {
        Self::create_with(count, C::default)
    }

    /// Build a pool of `count` connections produced by `make`.
    ///
    /// For connection types that need injected state, such as shared
    /// endpoints or test probes.
    pub fn create_with(count: usize, mut make: impl FnMut() -> C) -> Arc<ConnectionPool<C>> {
        let connections = (0..count as u64)
            .map(|k| (ConnectionId(k), make()))
            .collect();

        ConnectionPool::new(connections)
    }
}
