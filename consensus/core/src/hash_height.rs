use crate::BlockHeight;
use serde::{Deserialize, Serialize};
use stake_hashes::Hash;
use std::fmt::Display;

/// A block hash together with the height it lives at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashHeightPair {
    pub hash: Hash,
    pub height: BlockHeight,
}

impl HashHeightPair {
    pub fn new(hash: Hash, height: BlockHeight) -> Self {
        Self { hash, height }
    }
}

impl Display for HashHeightPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.height, self.hash)
    }
}
