use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::models::record::EndpointKind;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (tick_ingestor.toml). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one symbol over a date range
    Fetch {
        #[arg(long)]
        symbol: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Fetch several symbols and align them on one time axis
    Multi {
        /// Comma-separated list of symbols (e.g. "AAPL,MSFT")
        #[arg(long)]
        symbols: String,

        /// Carry each symbol's last value into rows where it has no record
        #[arg(long)]
        forward_fill: bool,

        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args)]
pub struct RequestArgs {
    /// Endpoint to page through
    #[arg(long, value_enum, default_value_t = Endpoint::Trades)]
    pub kind: Endpoint,

    /// First calendar date, e.g. 2024-03-04
    #[arg(long, conflicts_with = "dates", requires = "end")]
    pub start: Option<NaiveDate>,

    /// Last calendar date, inclusive
    #[arg(long, conflicts_with = "dates")]
    pub end: Option<NaiveDate>,

    /// Comma-separated explicit dates, e.g. "2024-03-04,2024-03-06"
    #[arg(long)]
    pub dates: Option<String>,

    /// Output file (JSON Lines)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Records per page; overrides the config file
    #[arg(long)]
    pub page_limit: Option<u32>,

    /// Concurrent days; overrides the config file
    #[arg(long)]
    pub workers: Option<usize>,

    /// Minutes per aggregate bar; overrides the config file
    #[arg(long)]
    pub agg_period: Option<u32>,

    /// Fail the whole request when any day fails
    #[arg(long)]
    pub all_or_nothing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Endpoint {
    Trades,
    Quotes,
    Bars,
}

impl From<Endpoint> for EndpointKind {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Trades => EndpointKind::Trades,
            Endpoint::Quotes => EndpointKind::Quotes,
            Endpoint::Bars => EndpointKind::MinuteBars,
        }
    }
}
