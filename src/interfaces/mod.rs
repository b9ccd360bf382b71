//! Adapters that talk to the outside world.

pub mod csv;
