use crate::error::EngineError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Represents a tenant's prepaid balance.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific rules
/// and provide type safety for the money arithmetic in the charge path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount (a cycle price or a top-up).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A tenant account keyed by its keypad code.
///
/// The code is a fixed-length numeric string, unique and immutable. The balance
/// is only ever mutated through the account store's debit/credit/upsert
/// operations; it must never go negative.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub code: String,
    pub name: String,
    pub balance: Balance,
    /// Timestamp of the last balance mutation, kept for the panel/export.
    pub updated_utc: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(code: impl Into<String>, name: impl Into<String>, balance: Balance) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            balance,
            updated_utc: None,
        }
    }

    /// Atomic check-then-subtract. Fails without side effect if the balance
    /// does not cover the amount.
    pub fn debit(&mut self, amount: Amount) -> Result<(), EngineError> {
        let price: Balance = amount.into();
        if self.balance >= price {
            self.balance -= price;
            self.updated_utc = Some(Utc::now());
            Ok(())
        } else {
            Err(EngineError::InsufficientFunds {
                balance: self.balance.0,
                price: amount.value(),
            })
        }
    }

    /// Adds funds back (compensation) or tops up.
    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
        self.updated_utc = Some(Utc::now());
    }
}
