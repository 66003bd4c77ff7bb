use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use custjob::cli::{Cli, Command, CustomerCommand, ExcludeCommand, OutputFormat};
use custjob::config::Config;
use custjob::pipeline;
use custstore::{Customer, CustomerStore, RunStatus};

const SAMPLE_CUSTOMERS: &[(&str, &str, &str, &str, &str, &str)] = &[
    ("Ann", "Lee", "ann@example.com", "010-1111-2222", "KR", "1990-01-01"),
    ("Bo", "Kim", "bo@example.com", "010-2222-3333", "US", "1985-05-05"),
    ("Chris", "Park", "chris@example.com", "010-3333-4444", "JP", "1978-11-23"),
    ("Dana", "Choi", "dana@example.com", "010-4444-5555", "US", "1994-02-14"),
    ("Eli", "Jung", "eli@example.com", "010-5555-6666", "DE", "1988-07-30"),
];

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(database = %config.database_path.display(), "custjob starting");

    match cli.command {
        Command::Init => cmd_init(&config),
        Command::Seed => cmd_seed(&config),
        Command::Customer { command } => cmd_customer(&config, command),
        Command::Exclude { command } => cmd_exclude(&config, command),
        Command::Run { output, chunk_size } => cmd_run(&config, output, chunk_size),
        Command::Runs { limit, format } => cmd_runs(&config, limit, format),
    }
}

fn cmd_init(config: &Config) -> Result<()> {
    let store = CustomerStore::open(&config.database_path)?;
    println!("{} Initialized store at {}", "✓".green(), store.path().display());
    Ok(())
}

fn cmd_seed(config: &Config) -> Result<()> {
    let store = CustomerStore::open(&config.database_path)?;
    for (firstname, lastname, email, contact_number, country, dob) in SAMPLE_CUSTOMERS {
        store.insert_customer(&Customer {
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            email: email.to_string(),
            contact_number: contact_number.to_string(),
            country: country.to_string(),
            dob: dob.parse().context("Invalid sample date")?,
        })?;
    }
    println!(
        "{} Seeded {} customers ({} total)",
        "✓".green(),
        SAMPLE_CUSTOMERS.len(),
        store.customer_count()?
    );
    Ok(())
}

fn cmd_customer(config: &Config, command: CustomerCommand) -> Result<()> {
    let store = CustomerStore::open(&config.database_path)?;
    match command {
        CustomerCommand::Add {
            firstname,
            lastname,
            email,
            contact_number,
            country,
            dob,
        } => {
            store.insert_customer(&Customer {
                firstname,
                lastname,
                email,
                contact_number,
                country,
                dob,
            })?;
            println!("{} Added customer ({} total)", "✓".green(), store.customer_count()?);
        }
        CustomerCommand::Count => {
            println!("{}", store.customer_count()?);
        }
    }
    Ok(())
}

fn cmd_exclude(config: &Config, command: ExcludeCommand) -> Result<()> {
    let store = CustomerStore::open(&config.database_path)?;
    match command {
        ExcludeCommand::Add { countries } => {
            for country in &countries {
                store.add_excluded(country)?;
            }
            println!("{} Excluded: {}", "✓".green(), countries.join(", ").cyan());
        }
        ExcludeCommand::Remove { country } => {
            if store.remove_excluded(&country)? {
                println!("{} Removed {}", "✓".green(), country.cyan());
            } else {
                println!("{} not in exclusion list", country);
            }
        }
        ExcludeCommand::List => {
            let countries = store.list_excluded()?;
            if countries.is_empty() {
                println!("No excluded countries");
            } else {
                for country in countries {
                    println!("{}", country);
                }
            }
        }
    }
    Ok(())
}

fn cmd_run(config: &Config, output: Option<PathBuf>, chunk_size: Option<usize>) -> Result<()> {
    let store = CustomerStore::open(&config.database_path)?;
    let output = output.unwrap_or_else(|| config.output_path.clone());
    let chunk_size = chunk_size.unwrap_or(config.chunk_size);

    let summary = pipeline::run(&store, &output, chunk_size)?;
    println!(
        "{} run {}: {} read, {} excluded, {} written in {} chunks -> {}",
        "✓".green(),
        summary.run_id.to_string().cyan(),
        summary.read,
        summary.excluded,
        summary.written,
        summary.chunks,
        output.display()
    );
    Ok(())
}

fn cmd_runs(config: &Config, limit: usize, format: OutputFormat) -> Result<()> {
    let store = CustomerStore::open(&config.database_path)?;
    let runs = store.list_runs(limit)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&runs)?),
        OutputFormat::Text => {
            if runs.is_empty() {
                println!("No runs recorded");
            }
            for run in runs {
                let status = match run.status {
                    RunStatus::Complete => "complete".green(),
                    RunStatus::Failed => "failed".red(),
                    RunStatus::Running => "running".yellow(),
                };
                let error = run.error.map(|e| format!(" ({})", e)).unwrap_or_default();
                println!(
                    "#{} {} started={} read={} written={}{}",
                    run.run_id,
                    status,
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    run.read_count,
                    run.written_count,
                    error.dimmed()
                );
            }
        }
    }
    Ok(())
}
