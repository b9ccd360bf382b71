//! Application layer: the charge orchestration, machine registry,
//! activation protocol, and the keypad session state machine.

pub mod activation;
pub mod engine;
pub mod registry;
pub mod session;
