use stake_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("block {0} is not a proof-of-stake block")]
    NotProofOfStake(Hash),

    #[error("block {0} has an empty signature")]
    EmptySignature(Hash),

    #[error("block {0} signature length {1} exceeds the maximum of {2}")]
    SignatureTooLong(Hash, usize, usize),

    #[error("block {0} has {1} transactions but the coinstake is expected at index {2}")]
    CoinstakeNotInBlock(Hash, usize, usize),

    #[error("transaction {1} at index {2} of block {0} is not a coinstake")]
    InvalidCoinstake(Hash, Hash, usize),

    #[error("block {0} does not start with a coinbase transaction")]
    MissingCoinbase(Hash),

    #[error("block {0} merkle root {1} does not match the calculated root {2}")]
    MerkleRootMismatch(Hash, Hash, Hash),
}

pub type SynthesisResult<T> = std::result::Result<T, SynthesisError>;
