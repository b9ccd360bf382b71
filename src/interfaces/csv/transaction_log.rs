use crate::domain::ports::TransactionLog;
use crate::domain::record::TransactionRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::info;

const HEADER: &str =
    "seq,timestamp,account_code,machine_id,price_charged,minutes_granted,outcome,simulated";

/// Append-only ledger backed by `transactions.csv`.
///
/// Rows are only ever appended, never rewritten. The next sequence number
/// is recovered from the tail of the existing file on open, so sequence
/// numbers stay strictly increasing across restarts.
pub struct CsvTransactionLog {
    path: PathBuf,
    next_seq: AtomicU64,
    // Serializes appends so interleaved writers cannot corrupt a row.
    write: Mutex<()>,
}

impl CsvTransactionLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut next_seq = 1;
        if path.exists() {
            for record in Self::read_all(&path)? {
                next_seq = next_seq.max(record.seq + 1);
            }
            info!(path = %path.display(), next_seq, "transaction ledger opened");
        }
        Ok(Self {
            path,
            next_seq: AtomicU64::new(next_seq),
            write: Mutex::new(()),
        })
    }

    fn read_all(path: &Path) -> Result<Vec<TransactionRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

#[async_trait]
impl TransactionLog for CsvTransactionLog {
    async fn append(&self, mut record: TransactionRecord) -> Result<TransactionRecord> {
        let _write = self.write.lock().await;
        record.seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let fresh = !self.path.exists() || std::fs::metadata(&self.path)?.len() == 0;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        {
            use std::io::Write;
            let mut file = file;
            if fresh {
                writeln!(file, "{HEADER}")?;
            }
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut file);
            writer.serialize(&record)?;
            writer.flush()?;
            drop(writer);
            file.sync_all()?;
        }
        Ok(record)
    }

    async fn recent(&self, n: usize) -> Result<Vec<TransactionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let records = Self::read_all(&self.path)?;
        let start = records.len().saturating_sub(n);
        Ok(records[start..].to_vec())
    }
}
