use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use washpay::application::activation::{ActivationConfig, ActivationController};
use washpay::application::engine::ChargeEngine;
use washpay::application::registry::MachineRegistry;
use washpay::config::Options;
use washpay::domain::account::Balance;
use washpay::domain::ports::AccountStore;
use washpay::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransactionLog};
use washpay::infrastructure::simulated::{RecordingAnnouncer, SimulatedHardware};

pub struct Bench {
    pub engine: Arc<ChargeEngine>,
    pub hardware: Arc<SimulatedHardware>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub announcer: Arc<RecordingAnnouncer>,
}

/// Millisecond-scale activation timings so tests run fast.
pub fn fast_activation() -> ActivationConfig {
    ActivationConfig {
        confirm_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(10),
        minute: Duration::from_millis(20),
    }
}

/// Builds an engine over in-memory stores and the simulated bench, seeded
/// with account 123456 holding 20.0. With `link` set, each machine reports
/// busy as soon as its relay closes (a healthy machine).
pub async fn bench(simulate: bool, link: bool) -> Bench {
    let options = Options::default();
    let machines = options.build_machines();

    let hardware = Arc::new(SimulatedHardware::new());
    if link {
        for machine in &machines {
            hardware.link(&machine.actuator_ref, &machine.sensor_ref);
        }
    }

    let registry = Arc::new(MachineRegistry::new(
        machines,
        Arc::clone(&hardware) as Arc<dyn washpay::domain::ports::Sensor>,
        false,
    ));
    let activation = Arc::new(ActivationController::new(
        Arc::clone(&hardware) as Arc<dyn washpay::domain::ports::Actuator>,
        Arc::clone(&registry),
        fast_activation(),
    ));

    let accounts = Arc::new(InMemoryAccountStore::new());
    accounts
        .upsert("123456", "Tenant One", Balance::new(dec!(20.0)))
        .await
        .unwrap();

    let announcer = Arc::new(RecordingAnnouncer::new());
    let engine = Arc::new(ChargeEngine::new(
        Arc::clone(&accounts) as Arc<dyn AccountStore>,
        Arc::new(InMemoryTransactionLog::new()),
        registry,
        activation,
        Arc::clone(&announcer) as Arc<dyn washpay::domain::ports::Announcer>,
        simulate,
        options.code_length,
    ));

    Bench {
        engine,
        hardware,
        accounts,
        announcer,
    }
}
