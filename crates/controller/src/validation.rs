//! Shared validation and application rules.

use crate::AbortReason;
use magnitude_store::VersionedStore;
use magnitude_types::{ModifyMap, Operation, WriteEffect};

/// Compare every recorded LOAD against the live store version.
///
/// Any mismatch means a conflicting write landed on that address after the
/// transaction read it. Addresses touched only by STORE/REMOVE carry no
/// recorded version and are not checked: blind writes always pass.
pub(crate) fn check_observed_versions(
    store: &dyn VersionedStore,
    changes: &ModifyMap,
) -> Result<(), AbortReason> {
    for (address, operations) in changes.entries() {
        for operation in operations {
            if let Operation::Load { version } = operation {
                let live = store.version(address);
                if live != *version {
                    return Err(AbortReason::VersionConflict {
                        address: *address,
                        observed: *version,
                        live,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Apply the final effect of every written address to the store.
///
/// Per address, the last STORE or REMOVE in program order wins; everything
/// before it (and any trailing LOADs) is informational only.
pub(crate) fn apply_final_effects(store: &dyn VersionedStore, changes: &ModifyMap) {
    for (address, effect) in changes.final_effects() {
        match effect {
            WriteEffect::Store(data) => store.store(address, data.to_vec()),
            WriteEffect::Remove => store.remove(address),
        }
    }
}
