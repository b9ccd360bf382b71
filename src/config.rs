//! Configuration loading.
//!
//! The options file follows the add-on style `options.json`: a flat object
//! with per-kind defaults plus a `machines` list binding each machine id to
//! its relay/sensor handles. Every field has a default so a missing or
//! partial file still yields a runnable configuration.

use crate::domain::machine::{Machine, MachineKind};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    pub simulate: bool,
    pub code_length: usize,
    pub code_entry_timeout_s: u64,
    pub activation_confirm_timeout_s: u64,
    pub poll_interval_ms: u64,
    /// Flip the raw sensor level before interpreting it as busy. Wiring
    /// varies between installations.
    pub invert_sensor: bool,
    pub washing_minutes: u32,
    pub dryer_minutes: u32,
    pub price_washing: Decimal,
    pub price_dryer: Decimal,
    pub machines: Vec<MachineOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineOptions {
    pub id: u8,
    pub kind: MachineKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub actuator: Option<String>,
    #[serde(default)]
    pub sensor: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for Options {
    fn default() -> Self {
        Self {
            simulate: false,
            code_length: 6,
            code_entry_timeout_s: 30,
            activation_confirm_timeout_s: 15,
            poll_interval_ms: 500,
            invert_sensor: false,
            washing_minutes: 30,
            dryer_minutes: 60,
            price_washing: dec!(5.0),
            price_dryer: dec!(5.0),
            machines: (1..=6)
                .map(|id| MachineOptions {
                    id,
                    kind: if id <= 3 {
                        MachineKind::Washer
                    } else {
                        MachineKind::Dryer
                    },
                    enabled: true,
                    minutes: None,
                    price: None,
                    actuator: None,
                    sensor: None,
                })
                .collect(),
        }
    }
}

impl Options {
    /// Reads options from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "options file missing, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let options: Options = serde_json::from_str(&raw)?;
        options.validate()?;
        info!(
            path = %path.display(),
            simulate = options.simulate,
            machines = options.machines.len(),
            "configuration loaded"
        );
        Ok(options)
    }

    fn validate(&self) -> Result<()> {
        if self.code_length == 0 {
            return Err(EngineError::Config("code_length must be > 0".into()));
        }
        if self.machines.is_empty() {
            return Err(EngineError::Config("no machines configured".into()));
        }
        let mut ids: Vec<u8> = self.machines.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.machines.len() {
            return Err(EngineError::Config("duplicate machine ids".into()));
        }
        Ok(())
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.activation_confirm_timeout_s)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.code_entry_timeout_s)
    }

    /// Resolves the machine list, filling in kind defaults and the
    /// conventional `relay_N` / `di_N` handles where not bound explicitly.
    pub fn build_machines(&self) -> Vec<Machine> {
        let mut machines: Vec<Machine> = self
            .machines
            .iter()
            .map(|m| {
                let (kind_minutes, kind_price) = match m.kind {
                    MachineKind::Washer => (self.washing_minutes, self.price_washing),
                    MachineKind::Dryer => (self.dryer_minutes, self.price_dryer),
                };
                Machine {
                    id: m.id,
                    kind: m.kind,
                    enabled: m.enabled,
                    default_minutes: m.minutes.unwrap_or(kind_minutes),
                    default_price: kind_price,
                    price_override: m.price,
                    actuator_ref: m
                        .actuator
                        .clone()
                        .unwrap_or_else(|| format!("relay_{}", m.id)),
                    sensor_ref: m.sensor.clone().unwrap_or_else(|| format!("di_{}", m.id)),
                }
            })
            .collect();
        machines.sort_by_key(|m| m.id);
        machines
    }
}
