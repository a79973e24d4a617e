//! Consensus module - Block structure, admission checks and fork choice

mod block;
mod validation;
mod fork_choice;

pub use block::*;
pub use validation::*;
pub use fork_choice::*;
