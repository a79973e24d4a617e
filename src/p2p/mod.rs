//! P2P module - Announce envelopes and the relay into the consensus actor

mod protocol;
mod relay;

pub use protocol::*;
pub use relay::*;
