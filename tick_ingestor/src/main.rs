use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tick_ingestor::{Error, TickHistory};
use tick_ingestor::calendar::UsHolidayCalendar;
use tick_ingestor::cli::commands::{Cli, Commands, RequestArgs};
use tick_ingestor::cli::params::{apply_overrides, parse_symbols, resolve_dates};
use tick_ingestor::config::{IngestorConfig, load_config_path};
use tick_ingestor::io::sink::{DataSink, JsonLinesSink};
use tick_ingestor::models::{
    bar::Bar, quote::Quote, record::EndpointKind, record::TickRecord, trade::Trade,
};
use tick_ingestor::providers::PageSource;
use tick_ingestor::providers::polygon_rest::PolygonProvider;
use tick_ingestor::requests::historical::{DaySummary, FillPolicy, UnitFailure};
use tracing_subscriber::EnvFilter;

type History = TickHistory<PolygonProvider, UsHolidayCalendar>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_history(config_path: Option<&Path>, args: &RequestArgs) -> Result<History, Error> {
    let config = match config_path {
        Some(path) => load_config_path(path)?,
        None => IngestorConfig::default(),
    };
    let config = apply_overrides(config, args)?;
    let provider = PolygonProvider::from_env(&config.polygon)?;
    let calendar = UsHolidayCalendar::from_config(&config.calendar);
    Ok(TickHistory::from_config(Arc::new(provider), calendar, &config))
}

// Paths go to stdout; everything meant for humans goes to stderr.
fn report(days: &[DaySummary], failures: &[UnitFailure], rows: usize) {
    for failure in failures {
        eprintln!("ERROR: {} - {}", failure.unit, failure.error);
    }
    let mut anomalies = 0;
    for day in days.iter().filter(|d| d.stop.is_convergence_anomaly()) {
        eprintln!(
            "WARNING: {} stopped after {} pages without new records",
            day.unit, day.pages
        );
        anomalies += 1;
    }
    eprintln!(
        "SUMMARY: {} days ok, {} failed, {} anomalies, {} rows",
        days.len(),
        failures.len(),
        anomalies,
        rows
    );
}

async fn fetch_one<R>(history: &History, symbol: &str, args: &RequestArgs) -> Result<(), Error>
where
    R: TickRecord + Serialize,
    PolygonProvider: PageSource<R>,
{
    let dates = resolve_dates(args)?;
    let batch = history.fetch_range::<R>(symbol, &dates).await?;
    let sink = JsonLinesSink::new(&args.output);
    let written = sink.write(batch.result_set.records()).await?;
    println!("{}", written.path.display());
    report(&batch.days, &batch.failures, written.rows);
    Ok(())
}

async fn fetch_many<R>(
    history: &History,
    symbols: &[String],
    fill: FillPolicy,
    args: &RequestArgs,
) -> Result<(), Error>
where
    R: TickRecord + Serialize,
    PolygonProvider: PageSource<R>,
{
    let dates = resolve_dates(args)?;
    let multi = history.fetch_range_multi::<R>(symbols, &dates, fill).await?;
    let written = JsonLinesSink::new(&args.output)
        .write_aligned(&multi.aligned)
        .await?;
    println!("{}", written.path.display());
    report(&multi.days, &multi.failures, written.rows);
    Ok(())
}

async fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Commands::Fetch { symbol, request } => {
            let history = build_history(cli.config.as_deref(), request)?;
            let symbol = symbol.trim().to_uppercase();
            match EndpointKind::from(request.kind) {
                EndpointKind::Trades => fetch_one::<Trade>(&history, &symbol, request).await,
                EndpointKind::Quotes => fetch_one::<Quote>(&history, &symbol, request).await,
                EndpointKind::MinuteBars => fetch_one::<Bar>(&history, &symbol, request).await,
            }
        }

        Commands::Multi {
            symbols,
            forward_fill,
            request,
        } => {
            let history = build_history(cli.config.as_deref(), request)?;
            let symbols = parse_symbols(symbols);
            let fill = if *forward_fill {
                FillPolicy::Forward
            } else {
                FillPolicy::None
            };
            match EndpointKind::from(request.kind) {
                EndpointKind::Trades => fetch_many::<Trade>(&history, &symbols, fill, request).await,
                EndpointKind::Quotes => fetch_many::<Quote>(&history, &symbols, fill, request).await,
                EndpointKind::MinuteBars => {
                    fetch_many::<Bar>(&history, &symbols, fill, request).await
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(&cli).await?;
    Ok(())
}
