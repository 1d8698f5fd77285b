//! In-memory versioned store.

use crate::VersionedStore;
use magnitude_types::{Address, Version};
use parking_lot::RwLock;
use std::collections::HashMap;

/// One stored value plus its version counter.
///
/// `value` is `None` after a remove; the slot itself stays so the counter
/// keeps counting across delete/recreate cycles.
#[derive(Debug, Clone)]
struct ValueSlot {
    value: Option<Vec<u8>>,
    version: Version,
}

/// Reference [`VersionedStore`] backed by a `HashMap`.
///
/// A single reader/writer lock guards the map; reads take the shared lock.
/// This is the store used by the executor in tests and simulations.
/// Production deployments put a persistent implementation behind the same
/// trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: RwLock<HashMap<Address, ValueSlot>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addresses holding a live (non-removed) value.
    pub fn live_len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.value.is_some())
            .count()
    }
}

impl VersionedStore for InMemoryStore {
    fn get(&self, address: &Address) -> Option<Vec<u8>> {
        self.slots
            .read()
            .get(address)
            .and_then(|slot| slot.value.clone())
    }

    fn store(&self, address: &Address, data: Vec<u8>) {
        let mut slots = self.slots.write();
        let slot = slots.entry(*address).or_insert(ValueSlot {
            value: None,
            version: Version::INITIAL,
        });
        slot.value = Some(data);
        slot.version = slot.version.next();
    }

    fn remove(&self, address: &Address) {
        let mut slots = self.slots.write();
        // Removing an address that was never written is a no-op: there is
        // no value to delete and no read to invalidate.
        if let Some(slot) = slots.get_mut(address) {
            slot.value = None;
            slot.version = slot.version.next();
        }
    }

    fn version(&self, address: &Address) -> Version {
        self.slots
            .read()
            .get(address)
            .map(|slot| slot.version)
            .unwrap_or(Version::INITIAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnitude_types::test_utils::test_address;

    #[test]
    fn test_get_store_roundtrip() {
        let store = InMemoryStore::new();
        let addr = test_address(1);

        assert_eq!(store.get(&addr), None);
        store.store(&addr, b"hello".to_vec());
        assert_eq!(store.get(&addr), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_version_increments_on_every_write() {
        let store = InMemoryStore::new();
        let addr = test_address(2);

        assert_eq!(store.version(&addr), Version(0));
        store.store(&addr, b"a".to_vec());
        assert_eq!(store.version(&addr), Version(1));
        store.store(&addr, b"b".to_vec());
        assert_eq!(store.version(&addr), Version(2));
        store.remove(&addr);
        assert_eq!(store.version(&addr), Version(3));
    }

    #[test]
    fn test_version_survives_removal() {
        let store = InMemoryStore::new();
        let addr = test_address(3);

        store.store(&addr, b"a".to_vec());
        store.remove(&addr);
        assert_eq!(store.get(&addr), None);
        assert_eq!(store.version(&addr), Version(2));

        // Recreating the value keeps counting rather than restarting.
        store.store(&addr, b"c".to_vec());
        assert_eq!(store.version(&addr), Version(3));
        assert_eq!(store.get(&addr), Some(b"c".to_vec()));
    }

    #[test]
    fn test_unknown_address_reads_initial_version() {
        let store = InMemoryStore::new();
        let addr = test_address(4);

        assert_eq!(store.version(&addr), Version::INITIAL);
        // Removing an address that was never stored changes nothing.
        store.remove(&addr);
        assert_eq!(store.version(&addr), Version::INITIAL);
        assert_eq!(store.get(&addr), None);
    }

    #[test]
    fn test_live_len_counts_present_values() {
        let store = InMemoryStore::new();
        store.store(&test_address(5), b"a".to_vec());
        store.store(&test_address(6), b"b".to_vec());
        assert_eq!(store.live_len(), 2);

        store.remove(&test_address(5));
        assert_eq!(store.live_len(), 1);
    }
}
