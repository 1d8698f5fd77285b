//! Per-address pending-writer index for the two-phase variants.

use crate::Partitioner;
use magnitude_types::{Address, CommitId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Tracks which commit ids have a pending write on each address.
///
/// The index answers one question: is a given commit id the *earliest*
/// pending writer of an address? Keeping the whole pending set (not just
/// the minimum) means that when the earliest writer commits or is removed,
/// the next-earliest becomes visible without rebuilding anything.
///
/// Storage is striped: the partitioner maps an address to a stripe, and
/// each stripe has its own reader/writer lock. Lookups take a shared lock,
/// structural updates take the exclusive lock, so concurrent `check_commit`
/// calls across disjoint commit ids proceed in parallel.
pub(crate) struct WriterIndex {
    stripes: Vec<RwLock<HashMap<Address, BTreeSet<CommitId>>>>,
    partitioner: Arc<dyn Partitioner>,
}

impl WriterIndex {
    pub(crate) fn new(stripe_count: usize, partitioner: Arc<dyn Partitioner>) -> Self {
        let stripes = (0..stripe_count).map(|_| RwLock::new(HashMap::new())).collect();
        Self {
            stripes,
            partitioner,
        }
    }

    fn stripe_for(&self, address: &Address) -> usize {
        (self.partitioner.partition(address) % self.stripes.len() as u64) as usize
    }

    /// Register `commit_id` as a pending writer of `address`.
    pub(crate) fn register(&self, address: &Address, commit_id: CommitId) {
        let mut stripe = self.stripes[self.stripe_for(address)].write();
        stripe.entry(*address).or_default().insert(commit_id);
    }

    /// Drop `commit_id` from the pending writers of `address`.
    pub(crate) fn release(&self, address: &Address, commit_id: CommitId) {
        let mut stripe = self.stripes[self.stripe_for(address)].write();
        if let Some(writers) = stripe.get_mut(address) {
            writers.remove(&commit_id);
            if writers.is_empty() {
                stripe.remove(address);
            }
        }
    }

    /// Earliest pending writer of `address`, if any.
    pub(crate) fn earliest(&self, address: &Address) -> Option<CommitId> {
        let stripe = self.stripes[self.stripe_for(address)].read();
        stripe
            .get(address)
            .and_then(|writers| writers.first().copied())
    }

    /// Drop every registration.
    pub(crate) fn clear(&self) {
        for stripe in &self.stripes {
            stripe.write().clear();
        }
    }

    /// Snapshot of the pending sets, for diagnostics and tests.
    pub(crate) fn pending(&self) -> BTreeMap<Address, BTreeSet<CommitId>> {
        let mut out = BTreeMap::new();
        for stripe in &self.stripes {
            for (address, writers) in stripe.read().iter() {
                out.insert(*address, writers.clone());
            }
        }
        out
    }
}

impl std::fmt::Debug for WriterIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterIndex")
            .field("stripes", &self.stripes.len())
            .finish_non_exhaustive()
    }
}
