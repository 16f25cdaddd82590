use super::constants::consensus::{COINSTAKE_TX_INDEX, MAX_BLOCK_SIGNATURE_LEN};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Regtest,
}

impl Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "mainnet"),
            NetworkType::Testnet => write!(f, "testnet"),
            NetworkType::Regtest => write!(f, "regtest"),
        }
    }
}

/// Consensus parameters. Contains settings and configurations which are consensus-sensitive.
/// Changing one of these on a network node would exclude and prevent it from reaching consensus
/// with the other unmodified nodes.
#[derive(Clone, Debug)]
pub struct Params {
    pub net: NetworkType,

    /// Maximal length in bytes of a proof-of-stake block signature
    pub max_block_signature_len: usize,

    /// Index of the coinstake transaction inside a proof-of-stake block
    pub coinstake_index: usize,

    /// Whether the first transaction of a proof-of-stake block must be a coinbase
    pub require_coinbase_first: bool,
}

impl Params {
    pub fn network_name(&self) -> String {
        self.net.to_string()
    }
}

pub const MAINNET_PARAMS: Params = Params {
    net: NetworkType::Mainnet,
    max_block_signature_len: MAX_BLOCK_SIGNATURE_LEN,
    coinstake_index: COINSTAKE_TX_INDEX,
    require_coinbase_first: true,
};

pub const TESTNET_PARAMS: Params = Params {
    net: NetworkType::Testnet,
    max_block_signature_len: MAX_BLOCK_SIGNATURE_LEN,
    coinstake_index: COINSTAKE_TX_INDEX,
    require_coinbase_first: true,
};

/// Local testing network. Blocks are not required to start with a coinbase.
pub const REGTEST_PARAMS: Params = Params {
    net: NetworkType::Regtest,
    max_block_signature_len: MAX_BLOCK_SIGNATURE_LEN,
    coinstake_index: COINSTAKE_TX_INDEX,
    require_coinbase_first: false,
};
