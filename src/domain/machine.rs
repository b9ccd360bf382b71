use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    Washer,
    Dryer,
}

/// Static configuration for a single laundry machine.
///
/// The actuator/sensor refs are opaque handles resolved by whichever
/// hardware adapter is wired in; the engine never interprets them.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub id: u8,
    pub kind: MachineKind,
    pub enabled: bool,
    pub default_minutes: u32,
    pub default_price: Decimal,
    /// Per-machine price override; takes precedence over the kind default.
    pub price_override: Option<Decimal>,
    pub actuator_ref: String,
    pub sensor_ref: String,
}

impl Machine {
    /// Price precedence: per-call override > per-machine override > kind default.
    pub fn effective_price(&self, call_override: Option<Decimal>) -> Decimal {
        call_override
            .or(self.price_override)
            .unwrap_or(self.default_price)
    }

    /// Minutes precedence: per-call override > machine default.
    pub fn effective_minutes(&self, call_override: Option<u32>) -> u32 {
        call_override.unwrap_or(self.default_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn washer() -> Machine {
        Machine {
            id: 1,
            kind: MachineKind::Washer,
            enabled: true,
            default_minutes: 30,
            default_price: dec!(5.0),
            price_override: None,
            actuator_ref: "relay_1".into(),
            sensor_ref: "di_1".into(),
        }
    }

    #[test]
    fn test_price_precedence() {
        let mut m = washer();
        assert_eq!(m.effective_price(None), dec!(5.0));

        m.price_override = Some(dec!(6.5));
        assert_eq!(m.effective_price(None), dec!(6.5));
        assert_eq!(m.effective_price(Some(dec!(2.0))), dec!(2.0));
    }

    #[test]
    fn test_minutes_precedence() {
        let m = washer();
        assert_eq!(m.effective_minutes(None), 30);
        assert_eq!(m.effective_minutes(Some(45)), 45);
    }
}
