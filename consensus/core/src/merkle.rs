use crate::tx::Transaction;
use stake_hashes::Hash;
use stake_merkle::{MerkleBranch, calc_merkle_root, create_merkle_branch};

/// Computes the block merkle root over the full transaction hashes
pub fn calc_hash_merkle_root<'a>(txs: impl ExactSizeIterator<Item = &'a Transaction>) -> Hash {
    calc_merkle_root(txs.map(Transaction::hash))
}

/// Builds the branch proving the transaction at `index` against the block merkle root
pub fn create_tx_merkle_branch<'a>(txs: impl ExactSizeIterator<Item = &'a Transaction>, index: usize) -> Option<MerkleBranch> {
    create_merkle_branch(txs.map(Transaction::hash), index)
}
