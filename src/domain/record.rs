use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Terminal verdict of a single charge attempt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    InsufficientFunds,
    MachineBusy,
    MachineDisabled,
    ActivationTimeout,
    Error,
}

impl Outcome {
    /// Only a successful charge carries a debit; every other outcome
    /// implies zero net balance change.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// One row of the append-only transaction ledger.
///
/// `seq` is assigned by the ledger on append and is strictly increasing.
/// Records are never mutated or deleted by the engine.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub account_code: String,
    pub machine_id: u8,
    pub price_charged: Decimal,
    pub minutes_granted: u32,
    pub outcome: Outcome,
    pub simulated: bool,
}

impl TransactionRecord {
    /// A record awaiting its sequence number from the ledger.
    pub fn new(
        account_code: impl Into<String>,
        machine_id: u8,
        price_charged: Decimal,
        minutes_granted: u32,
        outcome: Outcome,
        simulated: bool,
    ) -> Self {
        Self {
            seq: 0,
            timestamp: Utc::now(),
            account_code: account_code.into(),
            machine_id,
            price_charged,
            minutes_granted,
            outcome,
            simulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&Outcome::InsufficientFunds).unwrap(),
            "\"insufficient_funds\""
        );
        assert_eq!(
            serde_json::to_string(&Outcome::ActivationTimeout).unwrap(),
            "\"activation_timeout\""
        );
    }

    #[test]
    fn test_only_success_implies_debit() {
        assert!(Outcome::Success.is_success());
        for outcome in [
            Outcome::InsufficientFunds,
            Outcome::MachineBusy,
            Outcome::MachineDisabled,
            Outcome::ActivationTimeout,
            Outcome::Error,
        ] {
            assert!(!outcome.is_success());
        }
    }

    #[test]
    fn test_record_csv_round_trip() {
        let record = TransactionRecord::new("123456", 1, dec!(5.0), 30, Outcome::Success, true);

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(&record).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let parsed: TransactionRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(parsed.account_code, "123456");
        assert_eq!(parsed.outcome, Outcome::Success);
        assert!(parsed.simulated);
    }
}
