use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown account {0}")]
    UnknownAccount(String),
    #[error("unknown machine {0}")]
    UnknownMachine(u8),
    #[error("insufficient funds: balance {balance} < price {price}")]
    InsufficientFunds { balance: Decimal, price: Decimal },
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
