use crate::{header::Header, tx::Transaction};
use serde::{Deserialize, Serialize};
use stake_hashes::Hash;
use std::sync::Arc;

/// The producer signature over a proof-of-stake block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSignature(pub Vec<u8>);

impl BlockSignature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Whether a block was mined or staked. Only staked blocks carry a signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockVariant {
    ProofOfWork,
    ProofOfStake(BlockSignature),
}

/// A fully accepted block
#[derive(Debug, Clone)]
pub struct Block {
    pub header: Arc<Header>,
    pub transactions: Arc<Vec<Transaction>>,
    pub variant: BlockVariant,
}

impl Block {
    pub fn new(header: Header, txs: Vec<Transaction>, variant: BlockVariant) -> Self {
        Self::from_arcs(Arc::new(header), Arc::new(txs), variant)
    }

    pub fn from_arcs(header: Arc<Header>, transactions: Arc<Vec<Transaction>>, variant: BlockVariant) -> Self {
        Self { header, transactions, variant }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn is_proof_of_stake(&self) -> bool {
        matches!(self.variant, BlockVariant::ProofOfStake(_))
    }

    pub fn signature(&self) -> Option<&BlockSignature> {
        match &self.variant {
            BlockVariant::ProofOfStake(signature) => Some(signature),
            BlockVariant::ProofOfWork => None,
        }
    }
}
