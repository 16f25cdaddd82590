pub mod proof_synthesis;
