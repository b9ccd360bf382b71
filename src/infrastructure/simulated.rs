//! Simulated hardware bench and announcer implementations.
//!
//! `SimulatedHardware` stands in for the relay bank and digital inputs when
//! no real adapter is wired (bench testing, demo runs). An optional
//! relay-to-input link models a machine that reports busy as soon as its
//! relay closes.

use crate::domain::ports::{Actuator, Announcer, Sensor};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

#[derive(Default)]
pub struct SimulatedHardware {
    relays: RwLock<HashMap<String, bool>>,
    inputs: RwLock<HashMap<String, bool>>,
    links: RwLock<HashMap<String, String>>,
    on_commands: AtomicUsize,
    fail_actuator: AtomicBool,
    fail_sensor: AtomicBool,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Couples an actuator ref to a sensor ref: the input follows the relay.
    pub fn link(&self, actuator_ref: &str, sensor_ref: &str) {
        self.links
            .write()
            .unwrap()
            .insert(actuator_ref.to_string(), sensor_ref.to_string());
    }

    pub fn set_input(&self, sensor_ref: &str, active: bool) {
        self.inputs
            .write()
            .unwrap()
            .insert(sensor_ref.to_string(), active);
    }

    pub fn relay(&self, actuator_ref: &str) -> bool {
        self.relays
            .read()
            .unwrap()
            .get(actuator_ref)
            .copied()
            .unwrap_or(false)
    }

    /// Number of ON commands issued so far.
    pub fn on_commands(&self) -> usize {
        self.on_commands.load(Ordering::SeqCst)
    }

    /// Makes every subsequent actuator command fail.
    pub fn fail_actuator(&self, fail: bool) {
        self.fail_actuator.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent input read fail.
    pub fn fail_sensor(&self, fail: bool) {
        self.fail_sensor.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Actuator for SimulatedHardware {
    async fn set_state(&self, actuator_ref: &str, on: bool) -> Result<()> {
        if self.fail_actuator.load(Ordering::SeqCst) {
            return Err(EngineError::Hardware(format!(
                "simulated actuator failure for {actuator_ref}"
            )));
        }
        if on {
            self.on_commands.fetch_add(1, Ordering::SeqCst);
        }
        self.relays
            .write()
            .unwrap()
            .insert(actuator_ref.to_string(), on);
        if let Some(sensor_ref) = self.links.read().unwrap().get(actuator_ref).cloned() {
            self.set_input(&sensor_ref, on);
        }
        Ok(())
    }
}

#[async_trait]
impl Sensor for SimulatedHardware {
    async fn read(&self, sensor_ref: &str) -> Result<bool> {
        if self.fail_sensor.load(Ordering::SeqCst) {
            return Err(EngineError::Hardware(format!(
                "simulated sensor failure for {sensor_ref}"
            )));
        }
        Ok(self
            .inputs
            .read()
            .unwrap()
            .get(sensor_ref)
            .copied()
            .unwrap_or(false))
    }
}

/// Swallows every prompt. Used where no speaker is configured.
#[derive(Default)]
pub struct NullAnnouncer;

#[async_trait]
impl Announcer for NullAnnouncer {
    async fn announce(&self, _message: &str) {}
}

/// Writes prompts to the log, the closest a headless process gets to TTS.
#[derive(Default)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn announce(&self, message: &str) {
        info!(prompt = message, "announce");
    }
}

/// Captures prompts so tests can assert on what the tenant would hear.
#[derive(Default)]
pub struct RecordingAnnouncer {
    messages: RwLock<Vec<String>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.read().unwrap().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, message: &str) {
        self.messages.write().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_linked_input_follows_relay() {
        let hw = SimulatedHardware::new();
        hw.link("relay_1", "di_1");

        hw.set_state("relay_1", true).await.unwrap();
        assert!(hw.relay("relay_1"));
        assert!(hw.read("di_1").await.unwrap());

        hw.set_state("relay_1", false).await.unwrap();
        assert!(!hw.read("di_1").await.unwrap());
        assert_eq!(hw.on_commands(), 1);
    }

    #[tokio::test]
    async fn test_actuator_failure() {
        let hw = SimulatedHardware::new();
        hw.fail_actuator(true);
        assert!(hw.set_state("relay_1", true).await.is_err());
        assert!(!hw.relay("relay_1"));
    }

    #[tokio::test]
    async fn test_sensor_failure() {
        let hw = SimulatedHardware::new();
        hw.set_input("di_1", true);
        hw.fail_sensor(true);
        assert!(hw.read("di_1").await.is_err());

        hw.fail_sensor(false);
        assert!(hw.read("di_1").await.unwrap());
    }
}
