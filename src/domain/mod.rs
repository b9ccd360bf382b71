//! Domain types and the ports the engine depends on.

pub mod account;
pub mod machine;
pub mod ports;
pub mod record;
