use stake_consensus_core::{
    block::{Block, BlockSignature, BlockVariant},
    config::params::Params,
    errors::synthesis::{SynthesisError, SynthesisResult},
    header::Header,
    merkle::{calc_hash_merkle_root, create_tx_merkle_branch},
    proven_header::ProvenBlockHeader,
    tx::Transaction,
};
use std::sync::Arc;

/// Derives a proven header from a fully accepted block
pub trait ProvenHeaderSynthesizer: Send + Sync {
    /// Pure and deterministic: the same block under the same params always yields an identical proven header
    fn synthesize(&self, block: &Block) -> SynthesisResult<ProvenBlockHeader>;
}

impl<T: ProvenHeaderSynthesizer + ?Sized> ProvenHeaderSynthesizer for Arc<T> {
    fn synthesize(&self, block: &Block) -> SynthesisResult<ProvenBlockHeader> {
        (**self).synthesize(block)
    }
}

#[derive(Clone)]
pub struct ProofSynthesizer {
    max_block_signature_len: usize,
    coinstake_index: usize,
    require_coinbase_first: bool,
}

impl ProofSynthesizer {
    pub fn new(params: &Params) -> Self {
        Self {
            max_block_signature_len: params.max_block_signature_len,
            coinstake_index: params.coinstake_index,
            require_coinbase_first: params.require_coinbase_first,
        }
    }

    fn check_signature<'a>(&self, block: &'a Block) -> SynthesisResult<&'a BlockSignature> {
        let BlockVariant::ProofOfStake(signature) = &block.variant else {
            return Err(SynthesisError::NotProofOfStake(block.hash()));
        };
        if signature.is_empty() {
            return Err(SynthesisError::EmptySignature(block.hash()));
        }
        if signature.len() > self.max_block_signature_len {
            return Err(SynthesisError::SignatureTooLong(block.hash(), signature.len(), self.max_block_signature_len));
        }
        Ok(signature)
    }

    fn check_coinstake<'a>(&self, block: &'a Block) -> SynthesisResult<&'a Transaction> {
        let txs = &block.transactions;
        let coinstake = txs
            .get(self.coinstake_index)
            .ok_or(SynthesisError::CoinstakeNotInBlock(block.hash(), txs.len(), self.coinstake_index))?;
        if !coinstake.is_coinstake() {
            return Err(SynthesisError::InvalidCoinstake(block.hash(), coinstake.id(), self.coinstake_index));
        }
        if self.require_coinbase_first && !txs.first().is_some_and(Transaction::is_coinbase) {
            return Err(SynthesisError::MissingCoinbase(block.hash()));
        }
        Ok(coinstake)
    }

    fn check_merkle_root(&self, block: &Block) -> SynthesisResult<()> {
        let calculated = calc_hash_merkle_root(block.transactions.iter());
        if calculated != block.header.hash_merkle_root {
            return Err(SynthesisError::MerkleRootMismatch(block.hash(), block.header.hash_merkle_root, calculated));
        }
        Ok(())
    }
}

impl ProvenHeaderSynthesizer for ProofSynthesizer {
    fn synthesize(&self, block: &Block) -> SynthesisResult<ProvenBlockHeader> {
        let signature = self.check_signature(block)?;
        let coinstake = self.check_coinstake(block)?;
        self.check_merkle_root(block)?;

        let merkle_proof = create_tx_merkle_branch(block.transactions.iter(), self.coinstake_index)
            .ok_or(SynthesisError::CoinstakeNotInBlock(block.hash(), block.transactions.len(), self.coinstake_index))?;
        let header: &Header = &block.header;
        Ok(ProvenBlockHeader::new(header.clone(), merkle_proof, coinstake.clone(), signature.clone()))
    }
}
