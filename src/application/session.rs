use crate::application::engine::ChargeEngine;
use crate::domain::record::TransactionRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// One keypad event, already translated from scan codes upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Enter,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    EnteringCode,
    SelectingMachine,
    AwaitingConfirm,
}

#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub code_length: usize,
    pub idle_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            code_length: 6,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-keypad session state machine.
///
/// Keys arrive one at a time from a single serialized input stream, so the
/// session itself needs no internal locking. Flow: accumulate the code,
/// Enter validates the account, a digit picks the machine, Enter confirms
/// and dispatches to the charge engine. Cancel resets from any state; an
/// idle gap longer than the policy timeout abandons the session on the next
/// keypress, with no side effect on any in-flight charge.
pub struct KeypadSession {
    engine: Arc<ChargeEngine>,
    policy: SessionPolicy,
    phase: Phase,
    buffer: String,
    selected_machine: Option<u8>,
    last_input: Instant,
}

impl KeypadSession {
    pub fn new(engine: Arc<ChargeEngine>, policy: SessionPolicy) -> Self {
        Self {
            engine,
            policy,
            phase: Phase::Idle,
            buffer: String::new(),
            selected_machine: None,
            last_input: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Feeds one key into the state machine. Returns the transaction record
    /// when a charge was dispatched and resolved.
    pub async fn press(&mut self, key: Key) -> Option<TransactionRecord> {
        let now = Instant::now();
        if self.phase != Phase::Idle && now.duration_since(self.last_input) > self.policy.idle_timeout
        {
            info!("keypad session abandoned after idle timeout");
            self.reset();
            self.announce("Timeout. Please enter your code.").await;
        }
        self.last_input = now;

        if key == Key::Cancel {
            if self.phase != Phase::Idle {
                self.announce("Cancelled.").await;
            }
            self.reset();
            return None;
        }

        match self.phase {
            Phase::Idle => {
                if let Key::Digit(d) = key {
                    self.phase = Phase::EnteringCode;
                    self.buffer.push(char::from(b'0' + d));
                    self.announce(&format!(
                        "Enter your {} digit code.",
                        self.policy.code_length
                    ))
                    .await;
                }
                None
            }
            Phase::EnteringCode => match key {
                Key::Digit(d) => {
                    if self.buffer.len() < self.policy.code_length {
                        self.buffer.push(char::from(b'0' + d));
                    }
                    None
                }
                Key::Enter => {
                    if self.buffer.len() != self.policy.code_length {
                        self.announce(&format!(
                            "Code must be {} digits.",
                            self.policy.code_length
                        ))
                        .await;
                        self.reset();
                        return None;
                    }
                    let known = matches!(self.engine.account(&self.buffer).await, Ok(Some(_)));
                    if !known {
                        debug!("keypad code rejected");
                        self.announce("Invalid code.").await;
                        self.reset();
                        return None;
                    }
                    self.phase = Phase::SelectingMachine;
                    self.announce("Code accepted. Please select a machine.").await;
                    None
                }
                Key::Cancel => unreachable!("cancel handled above"),
            },
            Phase::SelectingMachine => {
                if let Key::Digit(d) = key {
                    if self.engine.registry().contains(d) {
                        self.selected_machine = Some(d);
                        self.phase = Phase::AwaitingConfirm;
                        self.announce(&format!(
                            "Machine {d} selected. Press enter to confirm."
                        ))
                        .await;
                    } else {
                        self.announce("Please select a machine.").await;
                    }
                }
                None
            }
            Phase::AwaitingConfirm => {
                if key != Key::Enter {
                    return None;
                }
                let code = std::mem::take(&mut self.buffer);
                let Some(machine_id) = self.selected_machine.take() else {
                    self.reset();
                    return None;
                };
                self.reset();

                // Blocks this keypad until the verdict; the engine announces
                // the outcome itself.
                match self.engine.charge(&code, machine_id, None, None).await {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::error!(error = %e, "charge dispatch failed");
                        self.announce("Operation failed.").await;
                        None
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.buffer.clear();
        self.selected_machine = None;
        self.last_input = Instant::now();
    }

    async fn announce(&self, message: &str) {
        self.engine.announce(message).await;
    }
}
