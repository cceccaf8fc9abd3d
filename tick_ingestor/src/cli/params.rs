use std::num::{NonZeroU32, NonZeroUsize};

use chrono::NaiveDate;

use super::commands::RequestArgs;
use crate::calendar::expand_dates;
use crate::config::{ConfigError, IngestorConfig};
use crate::models::page::PageLimit;
use crate::requests::historical::FailurePolicy;

/// Splits a comma-separated symbol list, dropping blanks and upper-casing.
pub fn parse_symbols(symbols: &str) -> Vec<String> {
    symbols
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The calendar dates a request names, either listed or as an inclusive range.
pub fn resolve_dates(args: &RequestArgs) -> Result<Vec<NaiveDate>, ConfigError> {
    if let Some(list) = &args.dates {
        return list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<NaiveDate>()
                    .map_err(|e| ConfigError::Invalid(format!("invalid date {s:?}: {e}")))
            })
            .collect();
    }
    match (args.start, args.end) {
        (Some(start), Some(end)) if start <= end => Ok(expand_dates(start, end)),
        (Some(start), Some(end)) => Err(ConfigError::Invalid(format!(
            "start {start} is after end {end}"
        ))),
        _ => Err(ConfigError::Invalid(
            "either --dates or both --start and --end are required".to_string(),
        )),
    }
}

/// Applies command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    mut config: IngestorConfig,
    args: &RequestArgs,
) -> Result<IngestorConfig, ConfigError> {
    if let Some(limit) = args.page_limit {
        config.pagination.page_limit =
            PageLimit::new(limit).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }
    if let Some(workers) = args.workers {
        let workers = NonZeroUsize::new(workers)
            .ok_or_else(|| ConfigError::Invalid("--workers must be at least 1".to_string()))?;
        config.scheduler.max_workers = Some(workers);
    }
    if let Some(minutes) = args.agg_period {
        config.polygon.agg_period_minutes = NonZeroU32::new(minutes)
            .ok_or_else(|| ConfigError::Invalid("--agg-period must be at least 1".to_string()))?;
    }
    if args.all_or_nothing {
        config.scheduler.failure_policy = FailurePolicy::AllOrNothing;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::commands::Endpoint;

    fn args() -> RequestArgs {
        RequestArgs {
            kind: Endpoint::Trades,
            start: None,
            end: None,
            dates: None,
            output: PathBuf::from("out.jsonl"),
            page_limit: None,
            workers: None,
            agg_period: None,
            all_or_nothing: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(parse_symbols(" aapl, MSFT ,,"), ["AAPL", "MSFT"]);
    }

    #[test]
    fn range_is_inclusive() {
        let mut a = args();
        a.start = Some(date(2024, 3, 4));
        a.end = Some(date(2024, 3, 6));
        assert_eq!(resolve_dates(&a).unwrap().len(), 3);

        a.start = Some(date(2024, 3, 7));
        assert!(resolve_dates(&a).is_err());
    }

    #[test]
    fn explicit_dates_win() {
        let mut a = args();
        a.dates = Some("2024-03-04, 2024-03-08".to_string());
        assert_eq!(
            resolve_dates(&a).unwrap(),
            [date(2024, 3, 4), date(2024, 3, 8)]
        );
        a.dates = Some("2024-13-01".to_string());
        assert!(resolve_dates(&a).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut a = args();
        a.page_limit = Some(1000);
        a.workers = Some(3);
        a.agg_period = Some(5);
        a.all_or_nothing = true;
        let config = apply_overrides(IngestorConfig::default(), &a).unwrap();
        assert_eq!(config.pagination.page_limit.get(), 1000);
        assert_eq!(config.polygon.agg_period_minutes.get(), 5);
        assert_eq!(config.scheduler.worker_pool().capacity(), 3);
        assert_eq!(config.scheduler.failure_policy, FailurePolicy::AllOrNothing);

        a.workers = Some(0);
        assert!(apply_overrides(IngestorConfig::default(), &a).is_err());
    }

    #[test]
    fn zero_minute_bars_are_rejected() {
        let mut a = args();
        a.agg_period = Some(0);
        let err = apply_overrides(IngestorConfig::default(), &a).unwrap_err();
        assert!(err.to_string().contains("--agg-period"));
    }
}
