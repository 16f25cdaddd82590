pub mod header_slot;
pub mod synthesis;
