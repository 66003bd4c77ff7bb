//! CLI argument parsing for custjob

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cj")]
#[command(author, version, about = "Customer export batch job", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema if it does not exist
    Init,

    /// Load a small built-in sample customer set
    Seed,

    /// Manage source customers
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },

    /// Manage the excluded-country list
    Exclude {
        #[command(subcommand)]
        command: ExcludeCommand,
    },

    /// Execute one export run
    Run {
        /// Output file path (defaults to the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Records per chunk (default: 10)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Show run history
    Runs {
        /// Maximum runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// Insert one customer row
    Add {
        #[arg(long)]
        firstname: String,

        #[arg(long)]
        lastname: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        contact_number: String,

        #[arg(long)]
        country: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: NaiveDate,
    },

    /// Show how many customers are stored
    Count,
}

#[derive(Subcommand, Debug)]
pub enum ExcludeCommand {
    /// Add countries to the exclusion list
    Add {
        /// Country identifiers, matched verbatim
        #[arg(required = true)]
        countries: Vec<String>,
    },

    /// Remove a country from the exclusion list
    Remove {
        country: String,
    },

    /// List excluded countries
    List,
}

/// Output format for run history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_run_command_parses() {
        let cli = Cli::try_parse_from(["cj", "run", "--output", "out.csv", "--chunk-size", "5"]).unwrap();
        match cli.command {
            Command::Run { output, chunk_size } => {
                assert_eq!(output, Some(PathBuf::from("out.csv")));
                assert_eq!(chunk_size, Some(5));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_customer_add_parses_dob() {
        let cli = Cli::try_parse_from([
            "cj", "customer", "add", "--firstname", "Bo", "--lastname", "Kim", "--email", "bo@x.com",
            "--contact-number", "222", "--country", "US", "--dob", "1985-05-05",
        ])
        .unwrap();
        match cli.command {
            Command::Customer {
                command: CustomerCommand::Add { dob, country, .. },
            } => {
                assert_eq!(dob, NaiveDate::from_ymd_opt(1985, 5, 5).unwrap());
                assert_eq!(country, "US");
            }
            _ => panic!("expected customer add command"),
        }
    }
}
