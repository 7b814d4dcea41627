//! The pool registry: idle/busy partition and the checkout/release protocol.
//!
//! A single mutex guards both partitions, so counts and state transitions
//! are always snapshot-consistent. Critical sections are short; `checkout`
//! and `heartbeat_sweep` are O(idle) in the worst case and nothing ever
//! blocks waiting for a connection to become available.

use log::{debug, info, trace};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::connection::{Connection, ConnectionId};
use crate::pool::handle::ConnectionHandle;

/// Point-in-time pool counts, taken under a single lock acquisition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of connections owned by the pool
    pub size: usize,

    /// Connections available for checkout
    pub idle: usize,

    /// Connections currently checked out
    pub busy: usize,
}

/// The idle/busy partition. The two sets are disjoint and together cover
/// every connection the pool owns; a busy connection's instance rides in
/// its live handle while its identity stays here.
struct PoolState<C: Connection> {
    idle: HashMap<ConnectionId, C>,
    busy: HashSet<ConnectionId>,
}

/// If the connection does not report healthy, make a single reconnect
/// attempt. Returns whether the connection is usable now.
fn ensure_usable<C: Connection>(connection: &mut C) -> bool {
    if connection.is_healthy() {
        return true;
    }

    connection.connect()
}

/// A thread-safe pool of reusable connections.
///
/// The pool owns a fixed set of connections for its whole lifetime; nothing
/// is created on demand and nothing is evicted. Borrowing goes through
/// [`checkout`](ConnectionPool::checkout), which hands out a
/// [`ConnectionHandle`] that returns the connection on drop.
///
/// All outstanding handles must be finalized before the pool itself is
/// dropped; tearing the pool down while handles are live is not supported.
pub struct ConnectionPool<C: Connection> {
    state: Mutex<PoolState<C>>,
}

impl<C: Connection> ConnectionPool<C> {
    /// Wrap pre-constructed connections, all idle. Construction from the
    /// outside goes through
    /// [`ConnectionPoolFactory`](crate::pool::ConnectionPoolFactory), which
    /// guarantees identities are unique and connections start unconnected.
    pub(crate) fn new(connections: Vec<(ConnectionId, C)>) -> Arc<Self> {
        info!(
            "initializing connection pool with {} connections",
            connections.len()
        );

        Arc::new(Self {
            state: Mutex::new(PoolState {
                idle: connections.into_iter().collect(),
                busy: HashSet::new(),
            }),
        })
    }

    /// Borrow an idle, usable connection.
    ///
    /// Scans the idle set in unspecified order and moves the first
    /// connection that passes the health-check-then-reconnect sequence to
    /// busy, returning an armed handle for it. Connections that fail the
    /// sequence stay in idle untouched, to be retried by a later checkout.
    ///
    /// Returns `None` immediately, without ever blocking, when the idle set
    /// is empty or no idle connection can be made usable; the partition is
    /// left unchanged in that case.
    pub fn checkout(self: &Arc<Self>) -> Option<ConnectionHandle<C>> {
        let mut state = self.state.lock().unwrap();

        if state.idle.is_empty() {
            return None;
        }

        let mut candidate = None;
        for (id, connection) in state.idle.iter_mut() {
            if ensure_usable(connection) {
                candidate = Some(*id);
                break;
            }

            // Left in place for a future attempt, not evicted.
            trace!("skipping unusable idle {id}");
        }

        let id = candidate?;
        let connection = state.idle.remove(&id)?;
        state.busy.insert(id);

        debug!("checked out {id}");
        Some(ConnectionHandle::new(id, connection, Arc::downgrade(self)))
    }

    /// Return a checked-out connection ahead of its handle's scope exit.
    ///
    /// Equivalent to dropping the handle. Consuming the handle here makes a
    /// second release of the same checkout unrepresentable.
    pub fn release(&self, handle: ConnectionHandle<C>) {
        drop(handle);
    }

    /// Put a borrowed connection back in the idle set.
    ///
    /// No-op if the identity is not currently checked out. Otherwise the
    /// connection gets one best-effort reconnect and moves to idle
    /// regardless of the result; an unusable connection is retried lazily
    /// by a future checkout rather than dropped.
    pub(crate) fn release_connection(&self, id: ConnectionId, mut connection: C) {
        let mut state = self.state.lock().unwrap();

        if !state.busy.remove(&id) {
            return;
        }

        ensure_usable(&mut connection);
        state.idle.insert(id, connection);
        debug!("released {id}");
    }

    /// Whether the identity is currently checked out.
    pub(crate) fn is_busy(&self, id: ConnectionId) -> bool {
        self.state.lock().unwrap().busy.contains(&id)
    }

    /// Total number of connections owned by the pool.
    pub fn size(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.idle.len() + state.busy.len()
    }

    /// Number of connections available for checkout.
    pub fn size_idle(&self) -> usize {
        self.state.lock().unwrap().idle.len()
    }

    /// Number of connections currently checked out.
    pub fn size_busy(&self) -> usize {
        self.state.lock().unwrap().busy.len()
    }

    /// All three counts from one lock acquisition, so they are consistent
    /// with each other even under concurrent checkouts and releases.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock().unwrap();
        PoolStats {
            size: state.idle.len() + state.busy.len(),
            idle: state.idle.len(),
            busy: state.busy.len(),
        }
    }

    /// Run [`Connection::heartbeat`] on every idle connection.
    ///
    /// Busy connections are never probed: they are presumed actively in
    /// use, and probing would race with the borrower's own use of the
    /// underlying resource.
    pub fn heartbeat_sweep(&self) {
        let mut state = self.state.lock().unwrap();
        trace!("heartbeat sweep over {} idle connections", state.idle.len());

        for (id, connection) in state.idle.iter_mut() {
            if !connection.heartbeat() {
                trace!("heartbeat failed for idle {id}");
            }
        }
    }
}

impl<C: Connection> Drop for ConnectionPool<C> {
    fn drop(&mut self) {
        // By the documented teardown precondition every handle has been
        // finalized, so every connection is back in idle.
        let mut state = self.state.lock().unwrap();
        for connection in state.idle.values_mut() {
            connection.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::factory::ConnectionPoolFactory;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Shared observation point for one test connection.
    #[derive(Clone)]
    struct Probe {
        can_connect: Arc<AtomicBool>,
        connect_calls: Arc<AtomicUsize>,
        heartbeats: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                can_connect: Arc::new(AtomicBool::new(true)),
                connect_calls: Arc::new(AtomicUsize::new(0)),
                heartbeats: Arc::new(AtomicUsize::new(0)),
                disconnects: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn refuse_connect(&self) {
            self.can_connect.store(false, Ordering::Relaxed);
        }

        fn connect_calls(&self) -> usize {
            self.connect_calls.load(Ordering::Relaxed)
        }

        fn heartbeats(&self) -> usize {
            self.heartbeats.load(Ordering::Relaxed)
        }
    }

    struct TestConnection {
        connected: bool,
        probe: Probe,
    }

    impl TestConnection {
        fn new(probe: Probe) -> Self {
            Self {
                connected: false,
                probe,
            }
        }

        fn heartbeats(&self) -> usize {
            self.probe.heartbeats()
        }
    }

    impl Connection for TestConnection {
        fn connect(&mut self) -> bool {
            self.probe.connect_calls.fetch_add(1, Ordering::Relaxed);
            self.connected = self.probe.can_connect.load(Ordering::Relaxed);
            self.connected
        }

        fn disconnect(&mut self) {
            self.probe.disconnects.fetch_add(1, Ordering::Relaxed);
            self.connected = false;
        }

        fn is_healthy(&self) -> bool {
            self.connected
        }

        fn heartbeat(&mut self) -> bool {
            self.probe.heartbeats.fetch_add(1, Ordering::Relaxed);
            self.connected
        }
    }

    fn pool_with_probes(count: usize) -> (Arc<ConnectionPool<TestConnection>>, Vec<Probe>) {
        let probes: Vec<Probe> = (0..count).map(|_| Probe::new()).collect();
        let mut remaining = probes.clone().into_iter();
        let pool = ConnectionPoolFactory::create_with(count, move || {
            TestConnection::new(remaining.next().unwrap())
        });
        (pool, probes)
    }

    #[test]
    fn test_construct_starts_all_idle() {
        let (pool, _probes) = pool_with_probes(3);

        assert_eq!(pool.size(), 3);
        assert_eq!(pool.size_idle(), 3);
        assert_eq!(pool.size_busy(), 0);

        let stats = pool.stats();
        assert_eq!(stats.size, 3);
        assert_eq!(stats.idle, 3);
        assert_eq!(stats.busy, 0);
    }

    #[test]
    fn test_checkout_moves_one_connection_to_busy() {
        let (pool, _probes) = pool_with_probes(3);

        let handle = pool.checkout().unwrap();
        assert!(handle.valid());
        assert!(handle.get().is_healthy());
        assert_eq!(pool.size_idle(), 2);
        assert_eq!(pool.size_busy(), 1);
        assert_eq!(pool.size(), 3);
    }

    #[test]
    fn test_checkout_connects_unconnected_connection() {
        let (pool, probes) = pool_with_probes(1);

        let handle = pool.checkout().unwrap();
        assert!(handle.get().is_healthy());
        assert_eq!(probes[0].connect_calls(), 1);
    }

    #[test]
    fn test_checkout_returns_none_when_idle_empty() {
        let (pool, _probes) = pool_with_probes(1);

        let _handle = pool.checkout().unwrap();
        assert!(pool.checkout().is_none());
    }

    #[test]
    fn test_checkout_skips_unusable_and_leaves_them_idle() {
        let (pool, probes) = pool_with_probes(3);
        for probe in &probes {
            probe.refuse_connect();
        }

        assert!(pool.checkout().is_none());

        // Every entry got exactly one reconnect attempt and stayed idle.
        assert_eq!(pool.size_idle(), 3);
        assert_eq!(pool.size_busy(), 0);
        for probe in &probes {
            assert_eq!(probe.connect_calls(), 1);
        }
    }

    #[test]
    fn test_explicit_release_returns_connection_to_idle() {
        let (pool, _probes) = pool_with_probes(2);

        let handle = pool.checkout().unwrap();
        assert_eq!(pool.size_busy(), 1);

        pool.release(handle);
        assert_eq!(pool.size_busy(), 0);
        assert_eq!(pool.size_idle(), 2);
    }

    #[test]
    fn test_dropped_handle_returns_connection_to_idle() {
        let (pool, _probes) = pool_with_probes(2);

        {
            let _handle = pool.checkout().unwrap();
            assert_eq!(pool.size_idle(), 1);
        }

        assert_eq!(pool.size_idle(), 2);
        assert_eq!(pool.size_busy(), 0);
    }

    #[test]
    fn test_release_reconnects_before_return() {
        let (pool, probes) = pool_with_probes(1);

        let mut handle = pool.checkout().unwrap();
        assert_eq!(probes[0].connect_calls(), 1);

        // Sever the connection while it is borrowed; release should make
        // one reconnect attempt on the way back to idle.
        handle.get_mut().disconnect();
        drop(handle);

        assert_eq!(probes[0].connect_calls(), 2);
        assert_eq!(pool.size_idle(), 1);
    }

    #[test]
    fn test_unusable_connection_still_returns_to_idle() {
        let (pool, probes) = pool_with_probes(1);

        let mut handle = pool.checkout().unwrap();
        handle.get_mut().disconnect();
        probes[0].refuse_connect();
        drop(handle);

        // Back in idle despite failing the release-time reconnect.
        assert_eq!(pool.size_idle(), 1);
        assert_eq!(pool.size_busy(), 0);

        // And a later checkout retries it lazily, without success here.
        assert!(pool.checkout().is_none());
        assert_eq!(pool.size_idle(), 1);
    }

    #[test]
    fn test_heartbeat_sweep_probes_idle_only() {
        let (pool, probes) = pool_with_probes(2);

        let handle = pool.checkout().unwrap();
        pool.heartbeat_sweep();

        let total: usize = probes.iter().map(|p| p.heartbeats()).sum();
        assert_eq!(total, 1);
        assert_eq!(handle.get().heartbeats(), 0);
    }

    #[test]
    fn test_heartbeat_sweep_covers_every_idle_connection() {
        let (pool, probes) = pool_with_probes(4);

        pool.heartbeat_sweep();
        for probe in &probes {
            assert_eq!(probe.heartbeats(), 1);
        }
    }

    #[test]
    fn test_partition_counts_stay_consistent() {
        let (pool, _probes) = pool_with_probes(3);

        let h1 = pool.checkout().unwrap();
        let h2 = pool.checkout().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.size, stats.idle + stats.busy);
        assert_eq!(stats.busy, 2);

        drop(h1);
        drop(h2);
        let stats = pool.stats();
        assert_eq!(stats.size, stats.idle + stats.busy);
        assert_eq!(stats.busy, 0);
    }

    #[test]
    fn test_pool_teardown_disconnects_idle_connections() {
        let (pool, probes) = pool_with_probes(2);

        drop(pool);
        for probe in &probes {
            assert_eq!(probe.disconnects.load(Ordering::Relaxed), 1);
        }
    }
}
