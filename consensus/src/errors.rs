use stake_consensus_core::errors::{header_slot::HeaderSlotError, synthesis::SynthesisError};
use stake_database::prelude::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvenHeaderError {
    #[error("proven header synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("proven header store failure: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    HeaderSlot(#[from] HeaderSlotError),

    #[error("the downstream block store stage is disconnected")]
    ForwarderDisconnected,

    #[error("the proven header processor exited before handling the block")]
    ProcessorExited,
}

pub type ProvenHeaderProcessResult<T> = std::result::Result<T, ProvenHeaderError>;
