//! Address partitioning seam.

use magnitude_types::Address;

/// Maps addresses onto partition keys.
///
/// The controller uses the key to pick a writer-index lock stripe; a
/// sharded deployment can plug in its own partitioner so stripe locality
/// matches shard locality.
pub trait Partitioner: Send + Sync {
    /// Partition key for `address`. The caller reduces it modulo its
    /// partition count.
    fn partition(&self, address: &Address) -> u64;
}

/// Default partitioner: folds the 32 address bytes into a u64 by XOR-ing
/// its four 8-byte words.
///
/// Addresses are hash-distributed by the execution layer, so folding
/// spreads them evenly without another hash pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldPartitioner;

impl Partitioner for FoldPartitioner {
    fn partition(&self, address: &Address) -> u64 {
        let bytes = address.as_bytes();
        let mut key = 0u64;
        for chunk in bytes.chunks_exact(8) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            key ^= u64::from_le_bytes(word);
        }
        key
    }
}
