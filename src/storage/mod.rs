//! Storage module - Block tree, name ledger and chain state management

mod chain;
mod ledger;
mod state;

pub use chain::*;
pub use ledger::*;
pub use state::*;
