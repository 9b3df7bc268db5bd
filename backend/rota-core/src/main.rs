// src/main.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rota_core::{
    cell_states, dates::date_range, find_rate_card_for_date, streaks::longest_streaks, ActorRole,
    EngineConfig, InvoiceDraft, InvoiceStore, MemoryInvoiceStore, ScheduleAnalytics, Snapshot,
};

// --- CLI Definition ---

#[derive(Parser)]
#[command(name = "rota")]
#[command(version)]
#[command(about = "Driver scheduling analytics and daily invoice composition")]
struct Cli {
    /// JSON snapshot with drivers, schedules, rate cards, incentives and deductions
    #[arg(long, short = 's', global = true, default_value = "snapshot.json")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consecutive-day streak counter per driver and scheduled day
    Streaks,
    /// Rest-day continuity class ("1", "2", "3") per driver and candidate day
    Continuity {
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,
    },
    /// Scheduling-grid cell states combining rate cards and continuity
    Cells {
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,
        /// Service evaluated for unscheduled cells
        #[arg(long, default_value = "Standard Parcel")]
        service: String,
    },
    /// Compose and submit the invoice for one scheduled cell
    Invoice {
        #[arg(long)]
        driver: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        /// Override the scheduled service
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        miles: Option<Decimal>,
        /// Act as an admin-level user
        #[arg(long)]
        privileged: bool,
    },
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

// --- Helpers ---

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    info!(
        "Loaded snapshot: {} drivers, {} schedule entries, {} rate cards",
        snapshot.drivers.len(),
        snapshot.schedules.len(),
        snapshot.rate_cards.len()
    );
    Ok(snapshot)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn checked_range(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
    if to < from {
        bail!("--to ({}) is before --from ({})", to, from);
    }
    Ok(date_range(from, to))
}

// --- Commands ---

fn run_invoice(
    snapshot: &Snapshot,
    config: &EngineConfig,
    driver_id: &str,
    date: NaiveDate,
    service: Option<String>,
    miles: Option<Decimal>,
    privileged: bool,
) -> Result<()> {
    let driver = snapshot
        .drivers
        .iter()
        .find(|d| d.id == driver_id)
        .ok_or_else(|| anyhow!("Unknown driver {}", driver_id))?;
    let mut entry = snapshot
        .schedules
        .iter()
        .find(|s| s.driver_id == driver_id && s.day == date)
        .cloned()
        .ok_or_else(|| anyhow!("Driver {} is not scheduled on {}", driver_id, date))?;
    if let Some(service) = service {
        entry.service = service;
    }

    let card = find_rate_card_for_date(date, &snapshot.rate_cards, &entry.service, driver);
    let actor = if privileged {
        ActorRole::Privileged
    } else {
        ActorRole::Standard
    };
    let mut draft = InvoiceDraft::for_entry(
        &entry,
        card,
        &snapshot.incentives,
        &snapshot.deductions,
        actor,
        config,
    )?;
    if let Some(miles) = miles {
        draft.set_miles(miles)?;
    }

    let issues = draft.issues();
    if !issues.is_empty() {
        warn!("Draft is not submittable yet");
        print_json(&draft)?;
    }
    let submitted = draft.submit()?;
    let store = MemoryInvoiceStore::new();
    store.save(submitted.clone())?;
    print_json(&submitted)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(EngineConfig::log_level_from_env()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = EngineConfig::from_env().context("Invalid engine configuration")?;

    let cli = Cli::parse();
    let snapshot = load_snapshot(&cli.snapshot)?;
    let analytics = ScheduleAnalytics::new(&config)?;

    match cli.command {
        Commands::Streaks => {
            let streaks = analytics.streaks(&snapshot.drivers, &snapshot.schedules)?;
            info!("Longest streaks: {:?}", longest_streaks(&streaks));
            print_json(&*streaks)
        }
        Commands::Continuity { from, to } => {
            let candidates = checked_range(from, to)?;
            let continuity =
                analytics.continuity(&snapshot.drivers, &snapshot.schedules, &candidates)?;
            print_json(&*continuity)
        }
        Commands::Cells { from, to, service } => {
            let candidates = checked_range(from, to)?;
            let cells = cell_states(
                analytics.continuity_engine(),
                &snapshot.drivers,
                &snapshot.schedules,
                &snapshot.rate_cards,
                &candidates,
                &service,
            )?;
            print_json(&cells)
        }
        Commands::Invoice {
            driver,
            date,
            service,
            miles,
            privileged,
        } => run_invoice(&snapshot, &config, &driver, date, service, miles, privileged),
    }
}
