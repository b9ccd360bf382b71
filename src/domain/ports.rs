use super::account::{Account, Amount, Balance};
use super::record::TransactionRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable store of tenant accounts.
///
/// Implementations must serialize mutations so that concurrent charges on
/// the same account cannot produce lost updates; `debit` is an atomic
/// check-then-subtract with no side effect on failure.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<Account>>;
    async fn upsert(&self, code: &str, name: &str, balance: Balance) -> Result<Account>;
    /// Returns the new balance, or `EngineError::InsufficientFunds` /
    /// `EngineError::UnknownAccount` without touching the account.
    async fn debit(&self, code: &str, amount: Amount) -> Result<Balance>;
    /// Reverses a debit (compensation) or applies a top-up.
    async fn credit(&self, code: &str, amount: Amount) -> Result<Balance>;
    async fn all(&self) -> Result<Vec<Account>>;
}

/// Append-only ledger of charge attempts.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Assigns the next sequence number and persists the record.
    async fn append(&self, record: TransactionRecord) -> Result<TransactionRecord>;
    /// The last `n` records, oldest first.
    async fn recent(&self, n: usize) -> Result<Vec<TransactionRecord>>;
}

/// ON/OFF control of a machine's relay. Must be safely callable when the
/// relay is already in the requested state.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn set_state(&self, actuator_ref: &str, on: bool) -> Result<()>;
}

/// Digital input bound to a machine. Returns the raw input level; the
/// registry applies the configured polarity to decide busy vs available.
#[async_trait]
pub trait Sensor: Send + Sync {
    async fn read(&self, sensor_ref: &str) -> Result<bool>;
}

/// Voice/TTS prompt sink. Fire-and-forget: implementations swallow their
/// own failures so a broken speaker can never affect a transaction.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, message: &str);
}

pub type SharedAccountStore = Arc<dyn AccountStore>;
pub type SharedTransactionLog = Arc<dyn TransactionLog>;
pub type SharedActuator = Arc<dyn Actuator>;
pub type SharedSensor = Arc<dyn Sensor>;
pub type SharedAnnouncer = Arc<dyn Announcer>;
