//! Adapters with no external dependencies: in-memory stores for tests and
//! simulate mode, plus the simulated hardware bench.

pub mod in_memory;
pub mod simulated;
