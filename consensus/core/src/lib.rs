//! Consensus data model shared between the proven header stores, the proof synthesizer and the
//! block-acceptance pipeline.

pub mod block;
pub mod chained_header;
pub mod config;
pub mod errors;
pub mod hash_height;
pub mod hashing;
pub mod header;
pub mod merkle;
pub mod proven_header;
pub mod tx;

/// Height of a block on the active chain, genesis is at height zero
pub type BlockHeight = u64;
