use crate::BlockHeight;
use stake_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderSlotError {
    #[error("proven header {1} cannot occupy the slot of chained header {0} at height {2}")]
    HashMismatch(Hash, Hash, BlockHeight),
}

pub type HeaderSlotResult<T> = std::result::Result<T, HeaderSlotError>;
