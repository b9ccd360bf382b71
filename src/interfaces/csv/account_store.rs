use crate::domain::account::{Account, Amount, Balance};
use crate::domain::ports::AccountStore;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

/// Durable account store backed by `accounts.csv`.
///
/// The full account set is held in memory and rewritten on every mutation
/// through a temp file in the same directory, renamed over the original so
/// a crash mid-write never leaves a truncated ledger. The single write
/// lock serializes all mutations, making `debit` atomic.
pub struct CsvAccountStore {
    path: PathBuf,
    accounts: RwLock<HashMap<String, Account>>,
}

impl CsvAccountStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut accounts = HashMap::new();
        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(&path)?;
            for row in reader.deserialize() {
                let account: Account = row?;
                accounts.insert(account.code.clone(), account);
            }
            info!(path = %path.display(), count = accounts.len(), "accounts loaded");
        }
        let store = Self {
            path,
            accounts: RwLock::new(accounts),
        };
        Ok(store)
    }

    fn write_all(path: &Path, accounts: &HashMap<String, Account>) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            let mut sorted: Vec<&Account> = accounts.values().collect();
            sorted.sort_by(|a, b| a.code.cmp(&b.code));
            for account in sorted {
                writer.serialize(account)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| EngineError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for CsvAccountStore {
    async fn get(&self, code: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(code).cloned())
    }

    async fn upsert(&self, code: &str, name: &str, balance: Balance) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        let mut account = Account::new(code, name, balance);
        account.updated_utc = Some(Utc::now());
        accounts.insert(code.to_string(), account.clone());
        Self::write_all(&self.path, &accounts)?;
        Ok(account)
    }

    async fn debit(&self, code: &str, amount: Amount) -> Result<Balance> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(code)
            .ok_or_else(|| EngineError::UnknownAccount(code.to_string()))?;
        account.debit(amount)?;
        let balance = account.balance;
        Self::write_all(&self.path, &accounts)?;
        Ok(balance)
    }

    async fn credit(&self, code: &str, amount: Amount) -> Result<Balance> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(code)
            .ok_or_else(|| EngineError::UnknownAccount(code.to_string()))?;
        account.credit(amount);
        let balance = account.balance;
        Self::write_all(&self.path, &accounts)?;
        Ok(balance)
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }
}
