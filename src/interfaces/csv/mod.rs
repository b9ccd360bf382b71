//! Durable CSV persistence for accounts and the transaction ledger.
//! Mirroring the files to a backup/export directory is an external
//! exporter's job, not the engine's.

pub mod account_store;
pub mod transaction_log;
