//! The proven header pipeline of a proof-of-stake node.
//!
//! Every block accepted onto the active chain is handed to the
//! [`ProvenHeaderProcessor`](pipeline::proven_header_processor::ProvenHeaderProcessor), which keeps the
//! proven header store consistent with the active chain:
//!
//! ```text
//! for every height H signaled at least once, once all pending writes at H are flushed,
//! the stored proven header hash equals the hash of the block most recently signaled at H
//! ```
//!
//! Reorgs are the events threatening this property, since they change the block occupying a height
//! without informing the store. The processor detects such stale entries on the next signal at that
//! height and resynthesizes the proof.
//!
//! Writes are staged in the store pending batch and persisted by the
//! [`ProvenHeaderFlushProcessor`](pipeline::flush_processor::ProvenHeaderFlushProcessor) on its own schedule.

pub mod consensus;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod processes;
pub mod test_helpers;
