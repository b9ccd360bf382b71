use crate::application::registry::MachineRegistry;
use crate::domain::machine::Machine;
use crate::domain::ports::SharedActuator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{error, info, warn};

/// Result of one activation attempt.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Verdict {
    Confirmed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// Maximum wait for the sensor to confirm after commanding ON.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    /// Wall-clock length of one granted minute.
    pub minute: Duration,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(500),
            minute: Duration::from_secs(60),
        }
    }
}

/// Drives the relay ON, waits for the machine to confirm busy, and owns the
/// deferred OFF task for the granted cycle time.
///
/// The deferred OFF is independent of the requesting session: it fires at
/// most once per confirmed activation and is not cancellable by later
/// charges. An administrative `deactivate` turns the relay off early and
/// invalidates the pending OFF, so a cycle started afterwards on the same
/// machine runs its full granted time.
pub struct ActivationController {
    actuator: SharedActuator,
    registry: Arc<MachineRegistry>,
    config: ActivationConfig,
    /// Cycle deadlines per machine, monotonic. Process-local: a restart
    /// drops pending OFFs (see DESIGN.md).
    cycles: Arc<RwLock<HashMap<u8, Instant>>>,
}

impl ActivationController {
    pub fn new(
        actuator: SharedActuator,
        registry: Arc<MachineRegistry>,
        config: ActivationConfig,
    ) -> Self {
        Self {
            actuator,
            registry,
            config,
            cycles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Commands the relay ON and polls the sensor until it reads busy or the
    /// confirmation window elapses. The first busy reading confirms; the
    /// controller does not re-validate afterwards.
    ///
    /// Only the requesting machine's lock is held by the caller while this
    /// polls; other machines remain operable.
    pub async fn activate(&self, machine: &Machine, minutes: u32) -> Verdict {
        if let Err(e) = self.actuator.set_state(&machine.actuator_ref, true).await {
            // Distinct from a plain confirmation timeout in the logs, but the
            // caller treats both as a failed activation.
            error!(machine = machine.id, error = %e, "actuator ON command failed");
            self.command_off(machine).await;
            return Verdict::TimedOut;
        }
        info!(machine = machine.id, minutes, "relay ON, awaiting confirmation");

        let started = Instant::now();
        let mut confirmed = false;
        while started.elapsed() < self.config.confirm_timeout {
            if self.registry.reads_busy(machine).await {
                confirmed = true;
                break;
            }
            sleep(self.config.poll_interval).await;
        }

        if !confirmed {
            warn!(
                machine = machine.id,
                timeout_s = self.config.confirm_timeout.as_secs_f64(),
                "activation not confirmed, releasing relay"
            );
            self.command_off(machine).await;
            return Verdict::TimedOut;
        }

        self.schedule_off(machine, minutes).await;
        Verdict::Confirmed
    }

    /// Administrative early OFF. Safe to call at any time; a still-pending
    /// deferred OFF will later command OFF again, which is a no-op.
    pub async fn deactivate(&self, machine: &Machine) {
        self.command_off(machine).await;
        self.cycles.write().await.remove(&machine.id);
    }

    /// Seconds until the current cycle ends, 0 when no cycle is running.
    pub async fn remaining_seconds(&self, id: u8) -> u64 {
        let cycles = self.cycles.read().await;
        cycles
            .get(&id)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_secs())
            .unwrap_or(0)
    }

    async fn schedule_off(&self, machine: &Machine, minutes: u32) {
        let deadline = Instant::now() + self.config.minute * minutes;
        self.cycles.write().await.insert(machine.id, deadline);

        let actuator = Arc::clone(&self.actuator);
        let cycles = Arc::clone(&self.cycles);
        let actuator_ref = machine.actuator_ref.clone();
        let id = machine.id;
        tokio::spawn(async move {
            sleep_until(deadline).await;
            {
                // The deadline doubles as the cycle's token: a deactivate or
                // a newer activation leaves this timer stale, and a stale
                // timer must not touch the relay.
                let mut cycles = cycles.write().await;
                if cycles.get(&id) != Some(&deadline) {
                    return;
                }
                cycles.remove(&id);
            }
            info!(machine = id, "cycle complete, releasing relay");
            if let Err(e) = actuator.set_state(&actuator_ref, false).await {
                warn!(machine = id, error = %e, "deferred OFF failed");
            }
        });
    }

    async fn command_off(&self, machine: &Machine) {
        if let Err(e) = self.actuator.set_state(&machine.actuator_ref, false).await {
            warn!(machine = machine.id, error = %e, "actuator OFF command failed");
        }
    }
}
