extern crate self as stake_core;

pub mod log;

// Library crates log through these re-exports of the `log` facade macros
pub use ::log::{debug, error, info, trace, warn};
