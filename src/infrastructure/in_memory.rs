use crate::domain::account::{Account, Amount, Balance};
use crate::domain::ports::{AccountStore, TransactionLog};
use crate::domain::record::TransactionRecord;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory account store.
///
/// The single write lock serializes all mutations, which is what makes
/// `debit` an atomic check-then-subtract under concurrent charges.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, code: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(code).cloned())
    }

    async fn upsert(&self, code: &str, name: &str, balance: Balance) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        let mut account = Account::new(code, name, balance);
        account.updated_utc = Some(Utc::now());
        accounts.insert(code.to_string(), account.clone());
        Ok(account)
    }

    async fn debit(&self, code: &str, amount: Amount) -> Result<Balance> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(code)
            .ok_or_else(|| EngineError::UnknownAccount(code.to_string()))?;
        account.debit(amount)?;
        Ok(account.balance)
    }

    async fn credit(&self, code: &str, amount: Amount) -> Result<Balance> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(code)
            .ok_or_else(|| EngineError::UnknownAccount(code.to_string()))?;
        account.credit(amount);
        Ok(account.balance)
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }
}

/// In-memory append-only ledger. Sequence numbers start at 1.
#[derive(Default, Clone)]
pub struct InMemoryTransactionLog {
    records: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn append(&self, mut record: TransactionRecord) -> Result<TransactionRecord> {
        let mut records = self.records.write().await;
        record.seq = records.len() as u64 + 1;
        records.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, n: usize) -> Result<Vec<TransactionRecord>> {
        let records = self.records.read().await;
        let start = records.len().saturating_sub(n);
        Ok(records[start..].to_vec())
    }
}
