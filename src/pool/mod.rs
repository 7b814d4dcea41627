//! Connection pooling: the registry, the scoped borrow handle, and the
//! construction factory.
//!
//! - [`ConnectionPool`] owns the connections and the idle/busy partition
//! - [`ConnectionHandle`] represents one checkout and releases on drop
//! - [`ConnectionPoolFactory`] is the only way to build a pool

pub mod factory;
pub mod handle;
pub mod registry;

// Re-export key types
pub use factory::ConnectionPoolFactory;
pub use handle::ConnectionHandle;
pub use registry::{ConnectionPool, PoolStats};
