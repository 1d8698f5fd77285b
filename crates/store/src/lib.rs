//! Versioned key/value store boundary.
//!
//! The concurrency controllers consume state through the [`VersionedStore`]
//! trait: a key/value store that maintains a monotonically increasing
//! version counter per address, incremented on every successful write.
//! Durability is the implementor's concern; the engine only relies on the
//! version counters being monotonic and on calls being synchronous.
//!
//! [`InMemoryStore`] is the reference implementation used by the executor
//! and throughout the test suites.

mod memory;

pub use memory::InMemoryStore;

use magnitude_types::{Address, Version};

/// Versioned key/value store consumed by the concurrency controllers.
///
/// Implementations must be safe to call from multiple worker threads; all
/// methods take `&self` and synchronize internally.
pub trait VersionedStore: Send + Sync {
    /// Read the current value of `address`, if present.
    fn get(&self, address: &Address) -> Option<Vec<u8>>;

    /// Write `data` to `address`, incrementing its version.
    fn store(&self, address: &Address, data: Vec<u8>);

    /// Delete `address`, incrementing its version.
    ///
    /// The version counter survives the deletion so a stale read of the
    /// removed value is still detectable.
    fn remove(&self, address: &Address);

    /// Current version counter for `address`.
    ///
    /// An address that has never been written reads [`Version::INITIAL`].
    fn version(&self, address: &Address) -> Version;
}
