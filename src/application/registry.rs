use crate::domain::machine::Machine;
use crate::domain::ports::SharedSensor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

/// Exclusive claim on a machine for the duration of one charge attempt.
/// Dropping the guard releases the machine.
pub type MachineGuard = OwnedMutexGuard<()>;

/// Holds the configured machines, their per-machine locks, and the bound
/// sensor capability.
///
/// The locks are process-local `tokio` mutexes, reset on restart; exactly
/// one in-flight activation per machine at a time. `try_lock` is atomic
/// with respect to concurrent callers, so a race of two charges on the
/// same machine resolves without ever consulting the sensor twice.
pub struct MachineRegistry {
    machines: Vec<Machine>,
    locks: HashMap<u8, Arc<Mutex<()>>>,
    sensor: SharedSensor,
    invert_sensor: bool,
}

impl MachineRegistry {
    pub fn new(machines: Vec<Machine>, sensor: SharedSensor, invert_sensor: bool) -> Self {
        let locks = machines
            .iter()
            .map(|m| (m.id, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            machines,
            locks,
            sensor,
            invert_sensor,
        }
    }

    pub fn get(&self, id: u8) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.get(id).is_some()
    }

    /// Machines sorted by id, for the panel surface.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Claims the machine, or `None` if another charge is in flight.
    pub fn try_lock(&self, id: u8) -> Option<MachineGuard> {
        let lock = self.locks.get(&id)?;
        Arc::clone(lock).try_lock_owned().ok()
    }

    /// Reads the bound sensor and interprets it through the configured
    /// polarity. Disabled machines are never available, and a sensor read
    /// failure is treated as busy.
    pub async fn is_available(&self, id: u8) -> bool {
        let Some(machine) = self.get(id) else {
            return false;
        };
        if !machine.enabled {
            return false;
        }
        match self.sensor.read(&machine.sensor_ref).await {
            Ok(raw) => !(raw ^ self.invert_sensor),
            Err(e) => {
                warn!(machine = id, error = %e, "sensor read failed, treating as busy");
                false
            }
        }
    }

    /// Whether the input currently reads busy, polarity applied.
    pub async fn reads_busy(&self, machine: &Machine) -> bool {
        match self.sensor.read(&machine.sensor_ref).await {
            Ok(raw) => raw ^ self.invert_sensor,
            Err(e) => {
                warn!(machine = machine.id, error = %e, "sensor read failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::machine::MachineKind;
    use crate::infrastructure::simulated::SimulatedHardware;
    use rust_decimal_macros::dec;

    fn machine(id: u8) -> Machine {
        Machine {
            id,
            kind: MachineKind::Washer,
            enabled: true,
            default_minutes: 30,
            default_price: dec!(5.0),
            price_override: None,
            actuator_ref: format!("relay_{id}"),
            sensor_ref: format!("di_{id}"),
        }
    }

    #[tokio::test]
    async fn test_try_lock_is_exclusive() {
        let hw = Arc::new(SimulatedHardware::new());
        let registry = MachineRegistry::new(vec![machine(1)], hw, false);

        let guard = registry.try_lock(1);
        assert!(guard.is_some());
        assert!(registry.try_lock(1).is_none());

        drop(guard);
        assert!(registry.try_lock(1).is_some());
    }

    #[tokio::test]
    async fn test_unknown_machine_has_no_lock() {
        let hw = Arc::new(SimulatedHardware::new());
        let registry = MachineRegistry::new(vec![machine(1)], hw, false);
        assert!(registry.try_lock(9).is_none());
        assert!(!registry.is_available(9).await);
    }

    #[tokio::test]
    async fn test_availability_follows_sensor_polarity() {
        let hw = Arc::new(SimulatedHardware::new());
        hw.set_input("di_1", true);

        let registry = MachineRegistry::new(vec![machine(1)], Arc::clone(&hw) as _, false);
        assert!(!registry.is_available(1).await);

        let inverted = MachineRegistry::new(vec![machine(1)], hw, true);
        assert!(inverted.is_available(1).await);
    }

    #[tokio::test]
    async fn test_sensor_read_failure_reads_busy() {
        let hw = Arc::new(SimulatedHardware::new());
        hw.fail_sensor(true);
        let registry = MachineRegistry::new(vec![machine(1)], hw, false);
        assert!(!registry.is_available(1).await);
    }

    #[tokio::test]
    async fn test_disabled_machine_never_available() {
        let hw = Arc::new(SimulatedHardware::new());
        let mut m = machine(1);
        m.enabled = false;
        let registry = MachineRegistry::new(vec![m], hw, false);
        assert!(!registry.is_available(1).await);
    }
}
