pub mod proven_headers;

pub use stake_database;
pub use stake_database::prelude::DB;
