use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use washpay::application::activation::{ActivationConfig, ActivationController};
use washpay::application::engine::ChargeEngine;
use washpay::application::registry::MachineRegistry;
use washpay::application::session::{Key, KeypadSession, SessionPolicy};
use washpay::config::Options;
use washpay::domain::account::Balance;
use washpay::infrastructure::simulated::{LogAnnouncer, SimulatedHardware};
use washpay::interfaces::csv::account_store::CsvAccountStore;
use washpay::interfaces::csv::transaction_log::CsvTransactionLog;

#[derive(Parser)]
#[command(author, version, about = "Keypad-driven laundry machine payment engine")]
struct Cli {
    /// Directory holding accounts.csv, transactions.csv and options.json
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Options file (defaults to <data-dir>/options.json)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Force simulate mode regardless of the options file
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a keypad stream from stdin (0-9, '#' = enter, '*' = cancel)
    Keypad,
    /// Charge an account for one machine cycle (admin/panel path)
    Charge {
        #[arg(long)]
        code: String,
        #[arg(long)]
        machine: u8,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// List machines with their current state
    Machines,
    /// Force a machine's relay off ahead of its cycle deadline
    Deactivate {
        #[arg(long)]
        machine: u8,
    },
    /// Show the most recent ledger entries
    History {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Create or replace an account
    Upsert {
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        balance: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options_path = cli
        .options
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("options.json"));
    let mut options = Options::load(&options_path).into_diagnostic()?;
    if cli.simulate {
        options.simulate = true;
    }

    let engine = build_engine(&options, &cli.data_dir).into_diagnostic()?;

    match cli.command {
        Command::Keypad => run_keypad(engine, &options).await.into_diagnostic()?,
        Command::Charge {
            code,
            machine,
            price,
            minutes,
        } => {
            let record = engine
                .charge(&code, machine, price, minutes)
                .await
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&record).into_diagnostic()?
            );
        }
        Command::Machines => {
            let machines = engine.list_machines().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&machines).into_diagnostic()?
            );
        }
        Command::Deactivate { machine } => {
            engine.deactivate(machine).await.into_diagnostic()?;
            println!("machine {machine} deactivated");
        }
        Command::History { limit } => {
            let records = engine.recent_transactions(limit).await.into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&records).into_diagnostic()?
            );
        }
        Command::Upsert {
            code,
            name,
            balance,
        } => {
            let account = engine
                .upsert_account(&code, &name, Balance::new(balance))
                .await
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&account).into_diagnostic()?
            );
        }
    }

    Ok(())
}

fn build_engine(options: &Options, data_dir: &std::path::Path) -> washpay::error::Result<Arc<ChargeEngine>> {
    std::fs::create_dir_all(data_dir)?;
    let accounts = Arc::new(CsvAccountStore::open(data_dir.join("accounts.csv"))?);
    let log = Arc::new(CsvTransactionLog::open(data_dir.join("transactions.csv"))?);

    // No hub adapter is wired into this binary; the simulated bench stands
    // in for the relay bank, with each input following its relay.
    let hardware = Arc::new(SimulatedHardware::new());
    let machines = options.build_machines();
    for machine in &machines {
        hardware.link(&machine.actuator_ref, &machine.sensor_ref);
    }

    let registry = Arc::new(MachineRegistry::new(
        machines,
        Arc::clone(&hardware) as _,
        options.invert_sensor,
    ));
    let activation = Arc::new(ActivationController::new(
        Arc::clone(&hardware) as _,
        Arc::clone(&registry),
        ActivationConfig {
            confirm_timeout: options.confirm_timeout(),
            poll_interval: options.poll_interval(),
            ..ActivationConfig::default()
        },
    ));

    Ok(Arc::new(ChargeEngine::new(
        accounts,
        log,
        registry,
        activation,
        Arc::new(LogAnnouncer),
        options.simulate,
        options.code_length,
    )))
}

async fn run_keypad(engine: Arc<ChargeEngine>, options: &Options) -> washpay::error::Result<()> {
    let mut session = KeypadSession::new(
        engine,
        SessionPolicy {
            code_length: options.code_length,
            idle_timeout: options.idle_timeout(),
        },
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        for c in line.chars() {
            let key = match c {
                '0'..='9' => Key::Digit(c as u8 - b'0'),
                '#' => Key::Enter,
                '*' => Key::Cancel,
                c if c.is_whitespace() => continue,
                other => {
                    warn!(key = %other, "unmapped key ignored");
                    continue;
                }
            };
            if let Some(record) = session.press(key).await {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
    }
    Ok(())
}
