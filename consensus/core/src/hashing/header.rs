use crate::header::Header;
use stake_hashes::{Hash, HasherBase};

/// Returns the header hash. Only the base header fields are committed to, so any proof
/// attached to the header never changes its hash.
pub fn hash(header: &Header) -> Hash {
    let mut hasher = stake_hashes::BlockHash::new();
    hasher
        .update(header.version.to_le_bytes())
        .update(header.hash_prev_block)
        .update(header.hash_merkle_root)
        .update(header.timestamp.to_le_bytes())
        .update(header.bits.to_le_bytes())
        .update(header.nonce.to_le_bytes());
    hasher.finalize()
}
