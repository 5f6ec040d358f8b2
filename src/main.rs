use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use finops_datagen::calendar::CalendarDay;
use finops_datagen::config::{AppConfig, LoggingConfig};
use finops_datagen::domain::Domain;
use finops_datagen::schedule::{builtin, AnomalySchedule};

#[derive(Parser)]
#[command(
    name = "finops-datagen",
    about = "Synthetic FinOps demo data generator for retail cloud workloads",
    version,
    long_about = None
)]
struct Cli {
    /// TOML config file (falls back to $FINOPS_DATAGEN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a year of metrics, incidents and problems
    Generate {
        /// Workload domain: pos or ecommerce
        #[arg(long)]
        domain: Option<Domain>,

        /// Calendar year to generate
        #[arg(long)]
        year: Option<i32>,

        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Clear existing rows before writing
        #[arg(long)]
        reset: bool,

        /// Generate but do not write anything
        #[arg(long)]
        dry_run: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Show the compiled anomaly schedule
    Schedule {
        /// Workload domain (defaults to the configured one)
        #[arg(long)]
        domain: Option<Domain>,

        /// Only show entries in this year
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        json: bool,
    },

    /// Show calendar attributes of a date
    Calendar {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        #[arg(long)]
        domain: Option<Domain>,

        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Generate {
            domain,
            year,
            db,
            seed,
            reset,
            dry_run,
            json,
        } => {
            if let Some(domain) = domain {
                config.generation.domain = domain;
            }
            if let Some(year) = year {
                config.generation.year = year;
            }
            if let Some(db) = db {
                config.storage.database = db;
            }
            if seed.is_some() {
                config.generation.seed = seed;
            }
            config.storage.reset |= reset;

            let report = finops_datagen::run(config, dry_run).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "\nFinOps demo data: {} {} (seed {})",
                    report.domain, report.year, report.seed
                );
                println!(
                    "{:<16} | {:>8} | {:>12} | {:>12} | {:>9} | {:>8}",
                    "Location", "Samples", "Transactions", "Cost", "Incidents", "Problems"
                );
                println!(
                    "{:-<16}-|-{:->8}-|-{:->12}-|-{:->12}-|-{:->9}-|-{:->8}",
                    "", "", "", "", "", ""
                );
                for loc in &report.locations {
                    println!(
                        "{:<16} | {:>8} | {:>12} | {:>12.2} | {:>9} | {:>8}",
                        loc.location,
                        loc.samples,
                        loc.transactions,
                        loc.cost,
                        loc.incidents,
                        loc.problems
                    );
                }
                match (&report.persisted, &report.database) {
                    (Some(p), Some(db)) => println!(
                        "\nWrote {} samples, {} incidents, {} problems to {} ({} batches, {} retries)",
                        p.metric_samples,
                        p.incidents,
                        p.problems,
                        db.display(),
                        p.batches,
                        p.retries
                    ),
                    _ => println!("\nDry run: nothing written."),
                }
            }
        }
        Commands::Schedule { domain, year, json } => {
            let domain = domain.unwrap_or(config.generation.domain);
            let source = if !config.anomalies.is_empty() {
                config.anomalies.clone()
            } else {
                builtin::events(domain)
            };
            let events: Vec<_> = source
                .into_iter()
                .filter(|e| e.category.domain() == domain)
                .filter(|e| year.map_or(true, |y| chrono::Datelike::year(&e.date) == y))
                .collect();
            let schedule = AnomalySchedule::compile(&events);

            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if schedule.is_empty() {
                println!("No anomalies scheduled.");
            } else {
                println!("{:<10} | {:<16} | {:<5} | Categories", "Date", "Location", "Hour");
                println!("{:-<10}-|-{:-<16}-|-{:-<5}-|-{:-<30}", "", "", "", "");
                for (date, location, cell) in schedule.cells() {
                    let hour = cell.hour.map_or_else(|| "-".to_string(), |h| h.to_string());
                    let names: Vec<_> = cell.categories.iter().map(|c| c.name()).collect();
                    println!(
                        "{:<10} | {:<16} | {:<5} | {}",
                        date,
                        location,
                        hour,
                        names.join(", ")
                    );
                }
            }
        }
        Commands::Calendar { date, domain, json } => {
            let domain = domain.unwrap_or(config.generation.domain);
            let day = CalendarDay::new(domain, date);
            if json {
                println!("{}", serde_json::to_string_pretty(&day)?);
            } else {
                println!("Date:        {}", day.date);
                println!("Domain:      {}", domain);
                println!("Weekend:     {}", day.is_weekend);
                println!("Holiday:     {}", day.is_holiday);
                println!("Weekly tier: {}", day.weekly_tier);
            }
        }
    }

    Ok(())
}
