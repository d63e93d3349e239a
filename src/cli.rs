use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sales_report::loader::{load_csv, LoadOptions, MalformedPolicy};
use sales_report::output::{export_report, period_rows, print_report, render_table};
use sales_report::period::PeriodKey;
use sales_report::reports::{all_scopes, available_periods, generate_month_report, Scope};
use sales_report::util::{format_int, NumberFormat};
use std::path::PathBuf;
use tracing::{info, Level};

/// Monthly sales KPIs and breakdown tables from a sales CSV
#[derive(Parser)]
#[command(name = "sales-report")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Sales file with a header row
    #[arg(short, long, default_value = "supermarket_sales.csv")]
    file: PathBuf,

    /// Field delimiter
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Decimal separator used by Total and Rating
    #[arg(long, default_value_t = ',')]
    decimal: char,

    /// Thousands separator used by Total and Rating, if any
    #[arg(long)]
    thousands: Option<char>,

    /// Skip rows that cannot be parsed instead of stopping at the first one
    #[arg(long)]
    skip_malformed: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the months present in the file
    Periods,

    /// KPIs and breakdowns for one month
    Report {
        /// Month as YYYY-MM or Mon/YYYY (defaults to the earliest month)
        #[arg(short, long)]
        period: Option<PeriodKey>,

        /// Add a breakdown for this city (repeatable)
        #[arg(long = "city")]
        cities: Vec<String>,

        /// Add a breakdown for every city in the file
        #[arg(long)]
        all_scopes: bool,

        /// Print the report as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Also write CSV tables and report.json into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Prefix for monetary values
        #[arg(long, default_value = "R$")]
        currency: String,

        /// Rows shown per breakdown table
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    fn load_options(&self) -> anyhow::Result<LoadOptions> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got '{}'", self.delimiter);
        }
        Ok(LoadOptions {
            delimiter: self.delimiter as u8,
            number_format: NumberFormat {
                decimal: self.decimal,
                thousands: self.thousands,
            },
            policy: if self.skip_malformed {
                MalformedPolicy::Skip
            } else {
                MalformedPolicy::Abort
            },
        })
    }

    pub fn run(self) -> anyhow::Result<()> {
        let opts = self.load_options()?;
        let (records, load_report) = load_csv(&self.file, &opts)
            .with_context(|| format!("failed to load {}", self.file.display()))?;
        info!(
            "processed dataset ({} rows loaded, {} skipped)",
            format_int(load_report.accepted),
            format_int(load_report.rejected.len())
        );

        let periods = available_periods(&records);
        match self.command {
            Commands::Periods => {
                println!("{}", render_table(&period_rows(&records, &periods), usize::MAX));
                Ok(())
            }
            Commands::Report {
                period,
                cities,
                all_scopes: every_city,
                json,
                out_dir,
                currency,
                rows,
            } => {
                let Some(period) = period.or_else(|| periods.first().copied()) else {
                    bail!("no records loaded from {}", self.file.display());
                };

                let scopes = if every_city {
                    all_scopes(&records)
                } else {
                    std::iter::once(Scope::AllCities)
                        .chain(cities.into_iter().map(Scope::City))
                        .collect()
                };

                let report = generate_month_report(&records, period, &scopes)
                    .with_context(|| format!("cannot report on {}", period.label()))?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_report(&report, &currency, rows);
                }

                if let Some(dir) = out_dir {
                    let written = export_report(&dir, &report, &currency)?;
                    info!(dir = %dir.display(), files = written.len(), "exported report");
                }
                Ok(())
            }
        }
    }
}
