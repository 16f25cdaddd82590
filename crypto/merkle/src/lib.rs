use serde::{Deserialize, Serialize};
use stake_hashes::{Hash, HasherBase, MerkleBranchHash, ZERO_HASH};

pub fn calc_merkle_root(hashes: impl ExactSizeIterator<Item = Hash>) -> Hash {
    match hashes.len() {
        0 => ZERO_HASH,
        _ => {
            let levels = build_levels(hashes);
            levels.last().and_then(|root| root[0]).unwrap_or(ZERO_HASH)
        }
    }
}

pub fn merkle_hash(left: Hash, right: Hash) -> Hash {
    let mut hasher = MerkleBranchHash::new();
    hasher.update(left).update(right);
    hasher.finalize()
}

/// A merkle branch proving that a leaf at `index` is committed to by some merkle root.
/// `hashes` holds the sibling at each level, from the leaf level upwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleBranch {
    pub index: u32,
    pub hashes: Vec<Hash>,
}

impl MerkleBranch {
    /// Folds `leaf` up through the branch and returns the implied root
    pub fn root_for(&self, leaf: Hash) -> Hash {
        let mut index = self.index;
        let mut current = leaf;
        for sibling in self.hashes.iter().copied() {
            current = if index & 1 == 0 { merkle_hash(current, sibling) } else { merkle_hash(sibling, current) };
            index >>= 1;
        }
        current
    }

    pub fn verify(&self, leaf: Hash, root: Hash) -> bool {
        self.root_for(leaf) == root
    }

    pub fn depth(&self) -> usize {
        self.hashes.len()
    }
}

/// Builds the branch for the leaf at `index`. Returns `None` if `index` is out of range.
pub fn create_merkle_branch(hashes: impl ExactSizeIterator<Item = Hash>, index: usize) -> Option<MerkleBranch> {
    if index >= hashes.len() {
        return None;
    }
    let levels = build_levels(hashes);
    let mut position = index;
    let mut siblings = Vec::with_capacity(levels.len().saturating_sub(1));
    // The last level is the root itself
    for level in levels.iter().take(levels.len() - 1) {
        siblings.push(level.get(position ^ 1).copied().flatten().unwrap_or(ZERO_HASH));
        position >>= 1;
    }
    Some(MerkleBranch { index: index as u32, hashes: siblings })
}

/// Builds all tree levels bottom up. Missing right nodes are replaced by `ZERO_HASH` when hashing,
/// and a pair with no left node stays empty on the next level.
fn build_levels(hashes: impl ExactSizeIterator<Item = Hash>) -> Vec<Vec<Option<Hash>>> {
    let next_pot = hashes.len().next_power_of_two();
    let mut level = vec![None; next_pot];
    for (i, hash) in hashes.enumerate() {
        level[i] = Some(hash);
    }
    let mut levels = vec![level];
    while let Some(last) = levels.last().filter(|level| level.len() > 1) {
        let next = last.chunks(2).map(|pair| pair[0].map(|left| merkle_hash(left, pair[1].unwrap_or(ZERO_HASH)))).collect();
        levels.push(next);
    }
    levels
}
