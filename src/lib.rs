#![deny(warnings)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Connection Pool
//!
//! A thread-safe pool of reusable stateful connections.
//!
//! The pool owns a fixed set of connections and partitions them into idle
//! and busy. Callers borrow a connection with [`ConnectionPool::checkout`],
//! use it through the returned [`ConnectionHandle`], and the connection
//! returns to the pool when the handle goes out of scope, on every exit
//! path, exactly once. Checkout never blocks: when no usable idle
//! connection exists it returns `None` and the caller decides what to do.
//!
//! Concrete resources plug in by implementing the [`Connection`] capability
//! (connect / disconnect / health check / heartbeat); pools are built
//! through [`ConnectionPoolFactory`], the only construction path.
//!
//! ```
//! use connection_pool::{Connection, ConnectionPoolFactory};
//!
//! #[derive(Default)]
//! struct MemoryConnection {
//!     connected: bool,
//! }
//!
//! impl Connection for MemoryConnection {
//!     fn connect(&mut self) -> bool {
//!         self.connected = true;
//!         true
//!     }
//!
//!     fn disconnect(&mut self) {
//!         self.connected = false;
//!     }
//!
//!     fn is_healthy(&self) -> bool {
//!         self.connected
//!     }
//!
//!     fn heartbeat(&mut self) -> bool {
//!         self.connected
//!     }
//! }
//!
//! let pool = ConnectionPoolFactory::<MemoryConnection>::create(4);
//! assert_eq!(pool.size_idle(), 4);
//!
//! let handle = pool.checkout().expect("a fresh pool has usable connections");
//! assert!(handle.get().is_healthy());
//! assert_eq!(pool.size_busy(), 1);
//!
//! drop(handle);
//! assert_eq!(pool.size_idle(), 4);
//! ```

/// The connection capability implemented by concrete pooled resources
pub mod connection;

/// The pool core: registry, scoped borrow handle, and construction factory
pub mod pool;

pub use connection::{Connection, ConnectionId};
pub use pool::{ConnectionHandle, ConnectionPool, ConnectionPoolFactory, PoolStats};
