//! A minimal UTXO transaction model, rich enough to recognize coinbase and coinstake transactions.

use crate::hashing;
use serde::{Deserialize, Serialize};
use stake_hashes::{Hash, ZERO_HASH};
use std::fmt::Display;

pub type TransactionId = Hash;

/// Represents a transaction outpoint
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }

    /// The outpoint referenced by coinbase inputs
    pub const fn null() -> Self {
        Self { transaction_id: ZERO_HASH, index: u32::MAX }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// Represents a transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u32) -> Self {
        Self { previous_outpoint, signature_script, sequence }
    }
}

/// Represents a transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: Vec<u8>,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: Vec<u8>) -> Self {
        Self { value, script_public_key }
    }

    /// An output with no value and no script. Coinstake transactions start with one.
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script_public_key.is_empty()
    }
}

/// Represents a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(version: u32, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u32) -> Self {
        Self { version, inputs, outputs, lock_time }
    }

    /// A coinbase spends a single null outpoint
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_outpoint.is_null()
    }

    /// A coinstake spends at least one real outpoint, has at least two outputs and its first output is empty
    pub fn is_coinstake(&self) -> bool {
        !self.inputs.is_empty() && !self.inputs[0].previous_outpoint.is_null() && self.outputs.len() >= 2 && self.outputs[0].is_empty()
    }

    /// Returns the transaction ID, which does not commit to signature scripts
    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    /// Returns the full transaction hash, which is the merkle tree leaf of this transaction
    pub fn hash(&self) -> Hash {
        hashing::tx::hash(self)
    }

    pub fn serialized_size_estimate(&self) -> usize {
        size_of::<Self>()
            + self.inputs.iter().map(|input| size_of::<TransactionInput>() + input.signature_script.len()).sum::<usize>()
            + self.outputs.iter().map(|output| size_of::<TransactionOutput>() + output.script_public_key.len()).sum::<usize>()
    }
}
