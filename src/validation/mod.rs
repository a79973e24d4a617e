//! Validation module - Name-binding transactions

mod transaction;

pub use transaction::*;
