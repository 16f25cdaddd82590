use crate::hashing;
use serde::{Deserialize, Serialize};
use stake_hashes::Hash;
use stake_utils::mem_size::MemSizeEstimator;

/// A plain block header. The `hash` field caches the hash of all other fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Cached hash
    pub hash: Hash,
    pub version: u32,
    pub hash_prev_block: Hash,
    pub hash_merkle_root: Hash,
    /// Timestamp is in seconds
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u32,
}

impl Header {
    pub fn new_finalized(version: u32, hash_prev_block: Hash, hash_merkle_root: Hash, timestamp: u64, bits: u32, nonce: u32) -> Self {
        let mut header = Self {
            hash: Default::default(), // Temp init before the finalize below
            version,
            hash_prev_block,
            hash_merkle_root,
            timestamp,
            bits,
            nonce,
        };
        header.finalize();
        header
    }

    /// Finalizes the header and recomputes the header hash
    pub fn finalize(&mut self) {
        self.hash = hashing::header::hash(self);
    }
}

impl MemSizeEstimator for Header {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>()
    }
}
