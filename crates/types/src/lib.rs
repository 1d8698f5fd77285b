//! Core types for the Magnitude concurrency engine.
//!
//! This crate provides the foundational types shared by the store,
//! controller, and executor layers:
//!
//! - **Address**: opaque 256-bit key identifying a storage slot
//! - **Identifiers**: CommitId, Version
//! - **Operation log**: Operation, WriteEffect, ModifyMap
//!
//! # Design Philosophy
//!
//! This crate is self-contained with no dependencies. It does not depend on
//! any other workspace crates, making it the foundation layer.

mod address;
mod identifiers;
mod modify_map;
mod operation;

pub use address::Address;
pub use identifiers::{CommitId, Version};
pub use modify_map::ModifyMap;
pub use operation::{Operation, WriteEffect};

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// Create a test address from a seed byte.
    pub fn test_address(seed: u8) -> Address {
        Address([seed; 32])
    }

    /// Create a test address with a distinguishing prefix byte.
    pub fn address_with_prefix(prefix: u8, seed: u8) -> Address {
        let mut bytes = [seed; 32];
        bytes[0] = prefix;
        Address(bytes)
    }

    /// Create a ModifyMap holding a single LOAD of `address` at `version`.
    pub fn load_only_map(address: Address, version: Version) -> ModifyMap {
        let mut map = ModifyMap::new();
        map.record_load(address, version);
        map
    }

    /// Create a ModifyMap holding a single STORE of `data` to `address`.
    pub fn store_only_map(address: Address, data: &[u8]) -> ModifyMap {
        let mut map = ModifyMap::new();
        map.record_store(address, data.to_vec());
        map
    }
}
