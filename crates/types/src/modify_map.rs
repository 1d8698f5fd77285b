//! Per-transaction operation log.

use crate::{Address, Operation, Version, WriteEffect};
use std::collections::HashMap;

/// Record of everything one transaction read and wrote.
///
/// Maps each touched address to its operations in program (execution)
/// order. Produced once per transaction by the execution layer and treated
/// as immutable after being pushed into a concurrency controller: the
/// controller owns it for the duration of the commit window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyMap {
    operations: HashMap<Address, Vec<Operation>>,
}

impl ModifyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read of `address` at the observed store version.
    pub fn record_load(&mut self, address: Address, version: Version) {
        self.operations
            .entry(address)
            .or_default()
            .push(Operation::Load { version });
    }

    /// Record a write of `data` to `address`.
    pub fn record_store(&mut self, address: Address, data: Vec<u8>) {
        self.operations
            .entry(address)
            .or_default()
            .push(Operation::Store { data });
    }

    /// Record a deletion of `address`.
    pub fn record_remove(&mut self, address: Address) {
        self.operations
            .entry(address)
            .or_default()
            .push(Operation::Remove);
    }

    /// Whether no address was touched.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of addresses touched.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Operations recorded for `address`, in program order.
    pub fn operations(&self, address: &Address) -> Option<&[Operation]> {
        self.operations.get(address).map(Vec::as_slice)
    }

    /// All touched addresses.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.operations.keys()
    }

    /// All (address, operations) entries.
    pub fn entries(&self) -> impl Iterator<Item = (&Address, &[Operation])> {
        self.operations.iter().map(|(a, ops)| (a, ops.as_slice()))
    }

    /// Whether `address` has at least one STORE/REMOVE operation.
    ///
    /// An address touched only by LOADs is a pure read dependency.
    pub fn has_write(&self, address: &Address) -> bool {
        self.operations
            .get(address)
            .is_some_and(|ops| ops.iter().any(Operation::is_write))
    }

    /// Addresses with at least one STORE/REMOVE operation.
    pub fn write_addresses(&self) -> impl Iterator<Item = &Address> {
        self.operations
            .iter()
            .filter(|(_, ops)| ops.iter().any(Operation::is_write))
            .map(|(a, _)| a)
    }

    /// Resolve the final effect on `address`: the last STORE or REMOVE in
    /// program order wins; trailing LOADs are skipped. Returns `None` for
    /// an address touched only by LOADs.
    pub fn final_effect(&self, address: &Address) -> Option<WriteEffect<'_>> {
        let ops = self.operations.get(address)?;
        ops.iter().rev().find_map(|op| match op {
            Operation::Store { data } => Some(WriteEffect::Store(data)),
            Operation::Remove => Some(WriteEffect::Remove),
            Operation::Load { .. } => None,
        })
    }

    /// Final effects for every written address.
    pub fn final_effects(&self) -> impl Iterator<Item = (&Address, WriteEffect<'_>)> {
        self.operations
            .keys()
            .filter_map(|a| self.final_effect(a).map(|e| (a, e)))
    }
}
