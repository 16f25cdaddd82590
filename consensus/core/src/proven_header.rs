use crate::{block::BlockSignature, header::Header, tx::Transaction};
use serde::{Deserialize, Serialize};
use stake_hashes::Hash;
use stake_merkle::MerkleBranch;
use stake_utils::mem_size::MemSizeEstimator;
use std::mem::size_of;

/// A block header carrying everything a headers-only peer needs in order to validate the
/// proof-of-stake of the block: the coinstake transaction, a merkle branch proving the coinstake is
/// committed to by the header merkle root, and the block signature.
///
/// The hash of a proven header is the hash of its base header, so two proven headers synthesized
/// for the same block always agree on their hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenBlockHeader {
    pub header: Header,
    pub merkle_proof: MerkleBranch,
    pub coinstake: Transaction,
    pub signature: BlockSignature,
}

impl ProvenBlockHeader {
    pub fn new(header: Header, merkle_proof: MerkleBranch, coinstake: Transaction, signature: BlockSignature) -> Self {
        Self { header, merkle_proof, coinstake, signature }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    /// Checks that the embedded coinstake is committed to by the header merkle root
    pub fn verify(&self) -> bool {
        self.merkle_proof.verify(self.coinstake.hash(), self.header.hash_merkle_root)
    }
}

impl MemSizeEstimator for ProvenBlockHeader {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>()
            + self.merkle_proof.hashes.len() * size_of::<Hash>()
            + self.coinstake.serialized_size_estimate()
            + self.signature.len()
    }
}
