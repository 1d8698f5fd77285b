//! Commit window: a fixed-capacity ring of change-list slots.

use crate::PushError;
use magnitude_types::{CommitId, ModifyMap};
use parking_lot::RwLock;

/// Contents of one occupied window slot.
#[derive(Debug)]
struct SlotEntry {
    commit_id: CommitId,
    changes: ModifyMap,
    /// Set once the commit id has been queued for redo; deduplicates
    /// repeated redo requests for the same slot.
    redo_requested: bool,
}

/// Fixed-capacity circular arena of change-list slots.
///
/// Slot index is `commit_id % window_size`. Each slot has its own
/// reader/writer lock, so pushes into distinct slots never contend and no
/// global lock guards unrelated slots.
///
/// Occupancy rules: an empty slot accepts any in-range commit id; a slot
/// holding the *same* commit id is replaced in place (redo re-submission);
/// a slot holding a *different* commit id rejects the push, and the earlier
/// occupant must be removed or the window cleared first.
#[derive(Debug)]
pub(crate) struct CommitWindow {
    slots: Vec<RwLock<Option<SlotEntry>>>,
}

impl CommitWindow {
    /// Create a window with `size` slots. `size` must be non-zero
    /// (enforced by `ControllerConfig::validate`).
    pub(crate) fn new(size: usize) -> Self {
        let slots = (0..size).map(|_| RwLock::new(None)).collect();
        Self { slots }
    }

    /// Number of slots.
    pub(crate) fn size(&self) -> usize {
        self.slots.len()
    }

    /// Slot index for a commit id.
    pub(crate) fn slot_index(&self, commit_id: CommitId) -> usize {
        (commit_id.value() % self.slots.len() as u64) as usize
    }

    /// Store a change list in its slot.
    ///
    /// Returns the previous change list when the slot already held the
    /// same commit id (replacement); the caller uses it to release any
    /// secondary index entries derived from the old map.
    pub(crate) fn push(
        &self,
        commit_id: CommitId,
        changes: ModifyMap,
    ) -> Result<Option<ModifyMap>, PushError> {
        let index = self.slot_index(commit_id);
        let mut slot = self.slots[index].write();
        if let Some(entry) = slot.as_ref() {
            if entry.commit_id != commit_id {
                return Err(PushError::DuplicateCommitSlot {
                    slot: index,
                    occupant: entry.commit_id,
                    pushed: commit_id,
                });
            }
        }
        let previous = slot.replace(SlotEntry {
            commit_id,
            changes,
            redo_requested: false,
        });
        Ok(previous.map(|entry| entry.changes))
    }

    /// Run `f` against the change list held for `commit_id`.
    ///
    /// Returns `None` when the slot is empty or occupied by a different
    /// commit id. The slot's read lock is held for the duration of `f`, so
    /// the map cannot be replaced or removed mid-read.
    pub(crate) fn with_changes<R>(
        &self,
        commit_id: CommitId,
        f: impl FnOnce(&ModifyMap) -> R,
    ) -> Option<R> {
        let slot = self.slots[self.slot_index(commit_id)].read();
        match slot.as_ref() {
            Some(entry) if entry.commit_id == commit_id => Some(f(&entry.changes)),
            _ => None,
        }
    }

    /// Clone the change list held for `commit_id`.
    pub(crate) fn change_list(&self, commit_id: CommitId) -> Option<ModifyMap> {
        self.with_changes(commit_id, ModifyMap::clone)
    }

    /// Flag the slot for redo. Returns true only the first time the flag
    /// is set for the current occupant; false when already flagged, or
    /// when no change list is held for `commit_id`.
    pub(crate) fn mark_redo(&self, commit_id: CommitId) -> bool {
        let mut slot = self.slots[self.slot_index(commit_id)].write();
        match slot.as_mut() {
            Some(entry) if entry.commit_id == commit_id && !entry.redo_requested => {
                entry.redo_requested = true;
                true
            }
            _ => false,
        }
    }

    /// Reset the redo flag so a later failure can queue the id again.
    pub(crate) fn reset_redo(&self, commit_id: CommitId) {
        let mut slot = self.slots[self.slot_index(commit_id)].write();
        if let Some(entry) = slot.as_mut() {
            if entry.commit_id == commit_id {
                entry.redo_requested = false;
            }
        }
    }

    /// Release the slot, returning its change list.
    pub(crate) fn remove(&self, commit_id: CommitId) -> Option<ModifyMap> {
        let mut slot = self.slots[self.slot_index(commit_id)].write();
        let held = slot
            .as_ref()
            .is_some_and(|entry| entry.commit_id == commit_id);
        if held {
            slot.take().map(|entry| entry.changes)
        } else {
            None
        }
    }

    /// Reset every slot to empty.
    pub(crate) fn clear(&self) {
        for slot in &self.slots {
            *slot.write() = None;
        }
    }

    /// Number of occupied slots.
    pub(crate) fn occupied(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.read().is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnitude_types::test_utils::{store_only_map, test_address};

    fn window() -> CommitWindow {
        CommitWindow::new(8)
    }

    #[test]
    fn test_push_and_read_back() {
        let w = window();
        let map = store_only_map(test_address(1), b"x");
        assert!(w.push(CommitId(3), map.clone()).is_ok());

        assert_eq!(w.change_list(CommitId(3)), Some(map));
        assert_eq!(w.change_list(CommitId(4)), None);
        assert_eq!(w.occupied(), 1);
    }

    #[test]
    fn test_reject_different_id_in_occupied_slot() {
        let w = window();
        w.push(CommitId(3), store_only_map(test_address(1), b"x"))
            .unwrap();

        // 11 % 8 == 3 % 8, so it lands on the occupied slot.
        let err = w
            .push(CommitId(11), store_only_map(test_address(2), b"y"))
            .unwrap_err();
        assert_eq!(
            err,
            PushError::DuplicateCommitSlot {
                slot: 3,
                occupant: CommitId(3),
                pushed: CommitId(11),
            }
        );
        // Original occupant untouched.
        assert!(w.change_list(CommitId(3)).is_some());
    }

    #[test]
    fn test_same_id_replaces_in_place() {
        let w = window();
        let first = store_only_map(test_address(1), b"x");
        let second = store_only_map(test_address(2), b"y");
        w.push(CommitId(3), first.clone()).unwrap();

        let replaced = w.push(CommitId(3), second.clone()).unwrap();
        assert_eq!(replaced, Some(first));
        assert_eq!(w.change_list(CommitId(3)), Some(second));
    }

    #[test]
    fn test_replace_resets_redo_flag() {
        let w = window();
        w.push(CommitId(3), store_only_map(test_address(1), b"x"))
            .unwrap();
        assert!(w.mark_redo(CommitId(3)));

        w.push(CommitId(3), store_only_map(test_address(1), b"y"))
            .unwrap();
        // A fresh push can be flagged again.
        assert!(w.mark_redo(CommitId(3)));
    }

    #[test]
    fn test_mark_redo_deduplicates() {
        let w = window();
        w.push(CommitId(5), store_only_map(test_address(1), b"x"))
            .unwrap();

        assert!(w.mark_redo(CommitId(5)));
        assert!(!w.mark_redo(CommitId(5)));

        w.reset_redo(CommitId(5));
        assert!(w.mark_redo(CommitId(5)));
    }

    #[test]
    fn test_mark_redo_without_record_is_refused() {
        let w = window();
        assert!(!w.mark_redo(CommitId(2)));
    }

    #[test]
    fn test_remove_releases_slot() {
        let w = window();
        let map = store_only_map(test_address(1), b"x");
        w.push(CommitId(3), map.clone()).unwrap();

        assert_eq!(w.remove(CommitId(3)), Some(map));
        assert_eq!(w.remove(CommitId(3)), None);

        // Slot is free for a different id now.
        assert!(w
            .push(CommitId(11), store_only_map(test_address(2), b"y"))
            .is_ok());
    }

    #[test]
    fn test_clear_empties_every_slot() {
        let w = window();
        for id in 0..8u64 {
            w.push(CommitId(id), store_only_map(test_address(id as u8), b"x"))
                .unwrap();
        }
        assert_eq!(w.occupied(), 8);

        w.clear();
        assert_eq!(w.occupied(), 0);

        // Clearing twice leaves the same state, and pushes succeed after.
        w.clear();
        for id in 0..8u64 {
            assert!(w
                .push(CommitId(id), store_only_map(test_address(id as u8), b"x"))
                .is_ok());
        }
    }
}
