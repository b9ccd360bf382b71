use crate::application::activation::{ActivationController, Verdict};
use crate::application::registry::MachineRegistry;
use crate::domain::account::{Account, Amount, Balance};
use crate::domain::machine::{Machine, MachineKind};
use crate::domain::ports::{SharedAccountStore, SharedAnnouncer, SharedTransactionLog};
use crate::domain::record::{Outcome, TransactionRecord};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Snapshot of one machine for the panel surface.
#[derive(Debug, Serialize, Clone)]
pub struct MachineStatus {
    pub id: u8,
    pub kind: MachineKind,
    pub enabled: bool,
    pub price: Decimal,
    pub default_minutes: u32,
    pub state: MachineState,
    pub remaining_seconds: u64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Available,
    Busy,
    Disabled,
}

/// The transaction orchestrator.
///
/// Every `charge` call resolves to exactly one appended ledger record;
/// the taxonomy failures (busy, disabled, insufficient funds, timeout,
/// unknown account) are outcomes, not errors. Only infrastructure write
/// failures propagate as `Err`.
pub struct ChargeEngine {
    accounts: SharedAccountStore,
    log: SharedTransactionLog,
    registry: Arc<MachineRegistry>,
    activation: Arc<ActivationController>,
    announcer: SharedAnnouncer,
    simulate: bool,
    code_length: usize,
}

impl ChargeEngine {
    pub fn new(
        accounts: SharedAccountStore,
        log: SharedTransactionLog,
        registry: Arc<MachineRegistry>,
        activation: Arc<ActivationController>,
        announcer: SharedAnnouncer,
        simulate: bool,
        code_length: usize,
    ) -> Self {
        Self {
            accounts,
            log,
            registry,
            activation,
            announcer,
            simulate,
            code_length,
        }
    }

    pub fn accounts(&self) -> &SharedAccountStore {
        &self.accounts
    }

    pub fn registry(&self) -> &Arc<MachineRegistry> {
        &self.registry
    }

    /// Charges an account for one machine cycle.
    ///
    /// Steps, each a terminal exit with no side effect on earlier steps:
    /// resolve machine (disabled?), per-machine lock, sensor availability,
    /// resolve account, debit, activate. An activation timeout after the
    /// debit is compensated by crediting the price back, so every outcome
    /// but `Success` nets to zero balance change.
    ///
    /// In simulate mode the lock, sensor and hardware steps are skipped and
    /// activation is treated as immediately confirmed; the ledger path runs
    /// in full and the record is marked `simulated`.
    pub async fn charge(
        &self,
        code: &str,
        machine_id: u8,
        price_override: Option<Decimal>,
        minutes_override: Option<u32>,
    ) -> Result<TransactionRecord> {
        let Some(machine) = self.registry.get(machine_id).cloned() else {
            warn!(machine = machine_id, "charge for unknown machine");
            self.announce(&format!("Machine {machine_id} is currently disabled."))
                .await;
            return self
                .commit(code, machine_id, Decimal::ZERO, 0, Outcome::MachineDisabled)
                .await;
        };
        if !machine.enabled {
            self.announce(&format!("Machine {machine_id} is currently disabled."))
                .await;
            return self
                .commit(code, machine_id, Decimal::ZERO, 0, Outcome::MachineDisabled)
                .await;
        }

        let price = machine.effective_price(price_override);
        let minutes = machine.effective_minutes(minutes_override);
        let amount = match Amount::new(price) {
            Ok(amount) => amount,
            Err(e) => {
                error!(machine = machine_id, %price, error = %e, "price not defined");
                return self
                    .commit(code, machine_id, Decimal::ZERO, 0, Outcome::Error)
                    .await;
            }
        };

        if self.simulate {
            return self.charge_simulated(code, &machine, amount, minutes).await;
        }

        // Held through activation and the ledger append; serializes all
        // further steps for this machine.
        let Some(_guard) = self.registry.try_lock(machine.id) else {
            self.announce(&format!(
                "Machine {machine_id} is busy. Please choose another machine."
            ))
            .await;
            return self
                .commit(code, machine_id, Decimal::ZERO, 0, Outcome::MachineBusy)
                .await;
        };

        if !self.registry.is_available(machine.id).await {
            self.announce(&format!(
                "Machine {machine_id} is busy. Please choose another machine."
            ))
            .await;
            return self
                .commit(code, machine_id, Decimal::ZERO, 0, Outcome::MachineBusy)
                .await;
        }

        // The session validates the code, but manual/panel callers may not.
        if self.accounts.get(code).await?.is_none() {
            warn!(code, "charge for unknown account");
            self.announce("User not found.").await;
            return self
                .commit(code, machine_id, Decimal::ZERO, 0, Outcome::Error)
                .await;
        }

        // Money is checked before hardware is touched.
        match self.accounts.debit(code, amount).await {
            Ok(balance) => {
                info!(code, machine = machine_id, %price, new_balance = %balance, "debit applied");
            }
            Err(EngineError::InsufficientFunds { balance, price }) => {
                info!(code, machine = machine_id, %balance, %price, "insufficient funds");
                self.announce("Insufficient balance.").await;
                return self
                    .commit(code, machine_id, Decimal::ZERO, 0, Outcome::InsufficientFunds)
                    .await;
            }
            Err(EngineError::UnknownAccount(_)) => {
                self.announce("User not found.").await;
                return self
                    .commit(code, machine_id, Decimal::ZERO, 0, Outcome::Error)
                    .await;
            }
            Err(e) => return Err(e),
        }

        match self.activation.activate(&machine, minutes).await {
            Verdict::Confirmed => {
                self.announce(&format!("Machine {machine_id} started for {minutes} minutes."))
                    .await;
                self.commit(code, machine_id, price, minutes, Outcome::Success)
                    .await
            }
            Verdict::TimedOut => {
                // Compensate: the machine never started, the money goes back.
                let balance = self.accounts.credit(code, amount).await?;
                error!(
                    code,
                    machine = machine_id,
                    %price,
                    restored_balance = %balance,
                    "activation timed out, debit compensated"
                );
                self.announce("Operation failed.").await;
                self.commit(code, machine_id, Decimal::ZERO, 0, Outcome::ActivationTimeout)
                    .await
            }
        }
    }

    async fn charge_simulated(
        &self,
        code: &str,
        machine: &Machine,
        amount: Amount,
        minutes: u32,
    ) -> Result<TransactionRecord> {
        if self.accounts.get(code).await?.is_none() {
            self.announce("User not found.").await;
            return self
                .commit(code, machine.id, Decimal::ZERO, 0, Outcome::Error)
                .await;
        }
        match self.accounts.debit(code, amount).await {
            Ok(balance) => {
                info!(
                    code,
                    machine = machine.id,
                    price = %amount.value(),
                    new_balance = %balance,
                    "simulated charge"
                );
                self.announce(&format!(
                    "Machine {} started for {minutes} minutes.",
                    machine.id
                ))
                .await;
                self.commit(code, machine.id, amount.value(), minutes, Outcome::Success)
                    .await
            }
            Err(EngineError::InsufficientFunds { .. }) => {
                self.announce("Insufficient balance.").await;
                self.commit(code, machine.id, Decimal::ZERO, 0, Outcome::InsufficientFunds)
                    .await
            }
            Err(EngineError::UnknownAccount(_)) => {
                self.commit(code, machine.id, Decimal::ZERO, 0, Outcome::Error)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Administrative early OFF for a machine. Idempotent; does not cancel
    /// the pending deferred OFF (a second OFF is tolerated).
    pub async fn deactivate(&self, machine_id: u8) -> Result<()> {
        let machine = self
            .registry
            .get(machine_id)
            .cloned()
            .ok_or(EngineError::UnknownMachine(machine_id))?;
        self.activation.deactivate(&machine).await;
        Ok(())
    }

    pub async fn list_machines(&self) -> Vec<MachineStatus> {
        let mut out = Vec::new();
        for machine in self.registry.machines() {
            let remaining_seconds = self.activation.remaining_seconds(machine.id).await;
            let state = if !machine.enabled {
                MachineState::Disabled
            } else if remaining_seconds > 0 || !self.registry.is_available(machine.id).await {
                MachineState::Busy
            } else {
                MachineState::Available
            };
            out.push(MachineStatus {
                id: machine.id,
                kind: machine.kind,
                enabled: machine.enabled,
                price: machine.effective_price(None),
                default_minutes: machine.default_minutes,
                state,
                remaining_seconds,
            });
        }
        out
    }

    pub async fn recent_transactions(&self, n: usize) -> Result<Vec<TransactionRecord>> {
        self.log.recent(n).await
    }

    pub async fn upsert_account(
        &self,
        code: &str,
        name: &str,
        balance: Balance,
    ) -> Result<Account> {
        // A code the keypad cannot produce would strand the account.
        if code.len() != self.code_length || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::Validation(format!(
                "account code must be {} digits, got {code:?}",
                self.code_length
            )));
        }
        self.accounts.upsert(code, name, balance).await
    }

    pub async fn account(&self, code: &str) -> Result<Option<Account>> {
        self.accounts.get(code).await
    }

    async fn commit(
        &self,
        code: &str,
        machine_id: u8,
        price_charged: Decimal,
        minutes_granted: u32,
        outcome: Outcome,
    ) -> Result<TransactionRecord> {
        let record = TransactionRecord::new(
            code,
            machine_id,
            price_charged,
            minutes_granted,
            outcome,
            self.simulate,
        );
        let record = self.log.append(record).await?;
        info!(
            seq = record.seq,
            code,
            machine = machine_id,
            outcome = ?outcome,
            "transaction recorded"
        );
        Ok(record)
    }

    pub async fn announce(&self, message: &str) {
        self.announcer.announce(message).await;
    }
}
