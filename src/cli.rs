//! Command-line interface for salesboard
//!
//! Without `--batch` the dashboard opens, optionally preloading FILE.
//!
//! ```bash
//! # Dashboard
//! salesboard vendas.csv
//!
//! # Headless summary of 2023 for two clients, plus a spreadsheet
//! salesboard --batch vendas.csv --since 01/01/2023 --until 31/12/2023 \
//!     --client Alfa --client Beta --export vendas.xlsx
//! ```

use crate::data::dates::parse_user_date;
use crate::data::SalesFilter;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Sales dashboard for loosely formatted CSV exports
#[derive(Parser, Debug, Clone)]
#[command(name = "salesboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// CSV file to open
    pub file: Option<PathBuf>,

    /// Print the summary to stdout instead of opening the dashboard
    #[arg(long)]
    pub batch: bool,

    /// Write the filtered table to an .xlsx file (implies --batch)
    #[arg(long, value_name = "OUT.xlsx")]
    pub export: Option<PathBuf>,

    /// Number of clients in the ranking
    #[arg(long)]
    pub top: Option<usize>,

    /// Keep sales on or after this date (DD/MM/YYYY or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub since: Option<NaiveDate>,

    /// Keep sales on or before this date (DD/MM/YYYY or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub until: Option<NaiveDate>,

    /// Keep only this client; repeat for several
    #[arg(long = "client", value_name = "NAME")]
    pub clients: Vec<String>,

    /// JSON configuration file (default: ./salesboard.json when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show informational output
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn is_batch(&self) -> bool {
        self.batch || self.export.is_some()
    }

    /// Table filter built from `--since`, `--until` and `--client`.
    pub fn filter(&self) -> Result<SalesFilter, String> {
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(format!(
                    "--since {} is after --until {}",
                    since.format("%d/%m/%Y"),
                    until.format("%d/%m/%Y")
                ));
            }
        }

        let mut filter = SalesFilter::new();
        if let Some(since) = self.since {
            filter = filter.with_since(since);
        }
        if let Some(until) = self.until {
            filter = filter.with_until(until);
        }
        if !self.clients.is_empty() {
            filter = filter.with_entities(self.clients.iter().cloned());
        }
        Ok(filter)
    }
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_user_date(s).ok_or_else(|| format!("invalid date '{}': use DD/MM/YYYY or YYYY-MM-DD", s))
}
