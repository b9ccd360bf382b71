mod common;

use common::bench;
use rust_decimal_macros::dec;
use std::time::Duration;
use washpay::application::session::{Key, KeypadSession, Phase, SessionPolicy};
use washpay::domain::account::Balance;
use washpay::domain::ports::AccountStore;
use washpay::domain::record::Outcome;

async fn type_digits(session: &mut KeypadSession, digits: &[u8]) {
    for &d in digits {
        session.press(Key::Digit(d)).await;
    }
}

#[tokio::test]
async fn test_full_flow_dispatches_a_charge() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(b.engine.clone(), SessionPolicy::default());

    type_digits(&mut session, &[1, 2, 3, 4, 5, 6]).await;
    assert_eq!(session.phase(), Phase::EnteringCode);

    assert!(session.press(Key::Enter).await.is_none());
    assert_eq!(session.phase(), Phase::SelectingMachine);

    assert!(session.press(Key::Digit(1)).await.is_none());
    assert_eq!(session.phase(), Phase::AwaitingConfirm);

    let record = session.press(Key::Enter).await.unwrap();
    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.account_code, "123456");
    assert_eq!(record.machine_id, 1);
    assert_eq!(session.phase(), Phase::Idle);

    let account = b.accounts.get("123456").await.unwrap().unwrap();
    assert_eq!(account.balance, Balance::new(dec!(15.0)));
}

#[tokio::test]
async fn test_unknown_code_is_rejected() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(b.engine.clone(), SessionPolicy::default());

    type_digits(&mut session, &[9, 9, 9, 9, 9, 9]).await;
    assert!(session.press(Key::Enter).await.is_none());
    assert_eq!(session.phase(), Phase::Idle);
    assert!(b.announcer.messages().contains(&"Invalid code.".to_string()));
}

#[tokio::test]
async fn test_short_code_resets_the_session() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(b.engine.clone(), SessionPolicy::default());

    type_digits(&mut session, &[1, 2, 3]).await;
    assert!(session.press(Key::Enter).await.is_none());
    assert_eq!(session.phase(), Phase::Idle);
    assert!(
        b.announcer
            .messages()
            .contains(&"Code must be 6 digits.".to_string())
    );
}

#[tokio::test]
async fn test_extra_digits_beyond_code_length_are_ignored() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(b.engine.clone(), SessionPolicy::default());

    type_digits(&mut session, &[1, 2, 3, 4, 5, 6, 7, 8]).await;
    assert!(session.press(Key::Enter).await.is_none());
    assert_eq!(session.phase(), Phase::SelectingMachine);
}

#[tokio::test]
async fn test_cancel_resets_from_any_phase() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(b.engine.clone(), SessionPolicy::default());

    type_digits(&mut session, &[1, 2, 3, 4, 5, 6]).await;
    session.press(Key::Enter).await;
    session.press(Key::Digit(2)).await;
    assert_eq!(session.phase(), Phase::AwaitingConfirm);

    assert!(session.press(Key::Cancel).await.is_none());
    assert_eq!(session.phase(), Phase::Idle);
    assert!(b.announcer.messages().contains(&"Cancelled.".to_string()));

    // Nothing was charged.
    let account = b.accounts.get("123456").await.unwrap().unwrap();
    assert_eq!(account.balance, Balance::new(dec!(20.0)));
}

#[tokio::test]
async fn test_out_of_range_machine_digit_reprompts() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(b.engine.clone(), SessionPolicy::default());

    type_digits(&mut session, &[1, 2, 3, 4, 5, 6]).await;
    session.press(Key::Enter).await;

    session.press(Key::Digit(9)).await;
    assert_eq!(session.phase(), Phase::SelectingMachine);

    session.press(Key::Digit(2)).await;
    let record = session.press(Key::Enter).await.unwrap();
    assert_eq!(record.machine_id, 2);
    assert_eq!(record.outcome, Outcome::Success);
}

#[tokio::test]
async fn test_idle_gap_abandons_the_entry() {
    let b = bench(true, false).await;
    let mut session = KeypadSession::new(
        b.engine.clone(),
        SessionPolicy {
            code_length: 6,
            idle_timeout: Duration::from_millis(30),
        },
    );

    type_digits(&mut session, &[9, 9, 9]).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The stale buffer is dropped; this press starts a fresh code.
    type_digits(&mut session, &[1, 2, 3, 4, 5, 6]).await;
    assert!(session.press(Key::Enter).await.is_none());
    assert_eq!(session.phase(), Phase::SelectingMachine);
    assert!(
        b.announcer
            .messages()
            .contains(&"Timeout. Please enter your code.".to_string())
    );
}
