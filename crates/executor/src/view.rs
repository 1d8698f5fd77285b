//! Transaction-local view of the store.

use std::fmt;

use magnitude_store::VersionedStore;
use magnitude_types::{Address, ModifyMap, WriteEffect};

/// Read-your-writes view handed to a transaction during speculative
/// execution.
///
/// Every access is recorded into a [`ModifyMap`]: reads that reach the
/// underlying store log a LOAD at the live version, writes log STORE or
/// REMOVE. Reads of an address this transaction already wrote are served
/// from the pending write and log nothing, so a transaction never
/// invalidates itself.
///
/// Nothing touches the store until the controller validates and applies
/// the finished map.
pub struct SpeculativeView<'a> {
    store: &'a dyn VersionedStore,
    changes: ModifyMap,
}

impl fmt::Debug for SpeculativeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeculativeView")
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}

impl<'a> SpeculativeView<'a> {
    pub fn new(store: &'a dyn VersionedStore) -> Self {
        Self {
            store,
            changes: ModifyMap::new(),
        }
    }

    /// Read a value, preferring this transaction's own pending write.
    ///
    /// A read that reaches the store records a LOAD at the version it
    /// observed, including version 0 for an address the store has never
    /// seen, so a conflicting first write still fails validation.
    pub fn get(&mut self, address: &Address) -> Option<Vec<u8>> {
        if let Some(effect) = self.changes.final_effect(address) {
            return match effect {
                WriteEffect::Store(data) => Some(data.to_vec()),
                WriteEffect::Remove => None,
            };
        }
        let version = self.store.version(address);
        self.changes.record_load(*address, version);
        self.store.get(address)
    }

    /// Record a speculative write.
    pub fn store(&mut self, address: Address, data: Vec<u8>) {
        self.changes.record_store(address, data);
    }

    /// Record a speculative removal.
    pub fn remove(&mut self, address: Address) {
        self.changes.record_remove(address);
    }

    /// Operations recorded so far.
    pub fn changes(&self) -> &ModifyMap {
        &self.changes
    }

    /// Finish execution and take the recorded change list.
    pub fn into_changes(self) -> ModifyMap {
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnitude_store::InMemoryStore;
    use magnitude_types::test_utils::test_address;
    use magnitude_types::{Operation, Version};

    fn load_count(changes: &ModifyMap, address: &Address) -> usize {
        changes
            .operations(address)
            .map(|ops| ops.iter().filter(|op| op.is_load()).count())
            .unwrap_or(0)
    }

    #[test]
    fn test_read_records_live_version() {
        let store = InMemoryStore::new();
        let addr = test_address(1);
        store.store(&addr, b"a".to_vec());
        store.store(&addr, b"b".to_vec());

        let mut view = SpeculativeView::new(&store);
        assert_eq!(view.get(&addr), Some(b"b".to_vec()));

        let changes = view.into_changes();
        assert_eq!(
            changes.operations(&addr),
            Some(&[Operation::Load {
                version: Version(2)
            }][..])
        );
    }

    #[test]
    fn test_read_of_absent_address_records_initial_version() {
        let store = InMemoryStore::new();
        let addr = test_address(2);

        let mut view = SpeculativeView::new(&store);
        assert_eq!(view.get(&addr), None);

        let changes = view.into_changes();
        assert_eq!(
            changes.operations(&addr),
            Some(&[Operation::Load {
                version: Version(0)
            }][..])
        );
    }

    #[test]
    fn test_read_your_own_write_skips_store() {
        let store = InMemoryStore::new();
        let addr = test_address(3);
        store.store(&addr, b"old".to_vec());

        let mut view = SpeculativeView::new(&store);
        view.store(addr, b"new".to_vec());
        assert_eq!(view.get(&addr), Some(b"new".to_vec()));

        // No LOAD was recorded, so the map is a blind write.
        let changes = view.into_changes();
        assert_eq!(load_count(&changes, &addr), 0);
        assert!(changes.has_write(&addr));
    }

    #[test]
    fn test_read_after_own_remove_sees_nothing() {
        let store = InMemoryStore::new();
        let addr = test_address(4);
        store.store(&addr, b"x".to_vec());

        let mut view = SpeculativeView::new(&store);
        view.remove(addr);
        assert_eq!(view.get(&addr), None);
        assert_eq!(load_count(view.changes(), &addr), 0);
    }

    #[test]
    fn test_read_modify_write_keeps_operation_order() {
        let store = InMemoryStore::new();
        let addr = test_address(5);
        store.store(&addr, b"1".to_vec());

        let mut view = SpeculativeView::new(&store);
        let current = view.get(&addr);
        assert_eq!(current, Some(b"1".to_vec()));
        view.store(addr, b"2".to_vec());

        let changes = view.into_changes();
        let ops = changes.operations(&addr).expect("address was touched");
        assert_eq!(ops.len(), 2);
        assert!(ops[0].is_load());
        assert!(ops[1].is_write());
        assert_eq!(
            changes.final_effect(&addr),
            Some(WriteEffect::Store(b"2".as_slice()))
        );
    }
}
