mod cancel;
mod connection;
mod failover;
mod statement;
mod strategy;

pub use cancel::*;
pub use connection::*;
pub use hatch_core::*;
pub use statement::*;
pub use strategy::*;
