//! Trading-calendar filtering and exchange-local day boundaries.
//!
//! What this module provides:
//! - [`TradingCalendar`]: the predicate the scheduler filters dates through.
//!   Any `Fn(NaiveDate) -> bool` is a calendar.
//! - [`Weekdays`]: excludes Saturdays and Sundays only.
//! - [`UsHolidayCalendar`]: excludes weekends, a US holiday set
//!   ([`HolidayRules`]) and any configured extra closures.
//! - [`expand_dates`] / [`filter_trading_days`]: turn a calendar range into
//!   the sorted, de-duplicated list of eligible days.
//! - [`market_day_bounds`]: the UTC interval covered by one exchange-local
//!   (America/New_York) calendar day.
//!
//! Notes:
//! - Holidays falling on a Saturday are observed on the Friday before and
//!   holidays falling on a Sunday on the Monday after. Under
//!   [`HolidayRules::Nyse`] a Saturday New Year's Day is not observed.
//! - Exchange midnight never falls in a DST gap for New York, but the
//!   conversion still resolves gaps and ambiguities deterministically.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::{America::New_York, Tz};
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;

/// Decides which calendar dates are eligible trading days.
pub trait TradingCalendar: Send + Sync {
    fn is_trading_day(&self, date: NaiveDate) -> bool;
}

impl<F> TradingCalendar for F
where
    F: Fn(NaiveDate) -> bool + Send + Sync,
{
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every Monday through Friday is a trading day.
#[derive(Debug, Clone, Copy, Default)]
pub struct Weekdays;

impl TradingCalendar for Weekdays {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date)
    }
}

/// Which US holiday set to exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayRules {
    /// US federal holidays, including Columbus Day and Veterans Day.
    #[default]
    Federal,
    /// NYSE full-day closures (adds Good Friday, drops Columbus and Veterans Day).
    Nyse,
}

/// Weekends, US holidays and configured one-off closures are not trading days.
#[derive(Debug, Clone, Default)]
pub struct UsHolidayCalendar {
    rules: HolidayRules,
    extra_closures: BTreeSet<NaiveDate>,
}

impl UsHolidayCalendar {
    pub fn new(rules: HolidayRules) -> Self {
        Self {
            rules,
            extra_closures: BTreeSet::new(),
        }
    }

    /// Adds closures the rule set does not know about (e.g. national days of mourning).
    pub fn with_extra_closures(mut self, closures: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.extra_closures.extend(closures);
        self
    }

    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.rules).with_extra_closures(config.extra_closures.iter().copied())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        let year = date.year();
        holidays(year, self.rules).contains(&date)
            // a Saturday New Year's Day can be observed on Dec 31 of the year before
            || (date.month() == 12 && holidays(year + 1, self.rules).contains(&date))
    }
}

impl TradingCalendar for UsHolidayCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date) && !self.extra_closures.contains(&date)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// Saturday moves to Friday, Sunday moves to Monday.
fn observed(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Sat => date.pred_opt(),
        Weekday::Sun => date.succ_opt(),
        _ => Some(date),
    }
}

/// Anonymous Gregorian computus.
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

/// Holiday dates (actual and observed) for `year` under `rules`.
fn holidays(year: i32, rules: HolidayRules) -> BTreeSet<NaiveDate> {
    let mut out = BTreeSet::new();
    let mut fixed = |month: u32, day: u32, observe: bool| {
        if let Some(date) = ymd(year, month, day) {
            out.insert(date);
            if observe {
                out.extend(observed(date));
            }
        }
    };

    fixed(1, 1, rules == HolidayRules::Federal);
    // federal from 2021, exchange closures from 2022
    let juneteenth_from = match rules {
        HolidayRules::Federal => 2021,
        HolidayRules::Nyse => 2022,
    };
    if year >= juneteenth_from {
        fixed(6, 19, true);
    }
    fixed(7, 4, true);
    fixed(12, 25, true);
    if rules == HolidayRules::Federal {
        fixed(11, 11, true);
    }

    // NYSE observes a Sunday New Year's Day on Monday but skips a Saturday one.
    if rules == HolidayRules::Nyse {
        if let Some(new_year) = ymd(year, 1, 1) {
            if new_year.weekday() == Weekday::Sun {
                out.extend(new_year.succ_opt());
            }
        }
    }

    let mut floating = vec![
        nth_weekday(year, 2, Weekday::Mon, 3),
        last_weekday(year, 5, Weekday::Mon),
        nth_weekday(year, 9, Weekday::Mon, 1),
        nth_weekday(year, 11, Weekday::Thu, 4),
    ];
    if year >= 1986 {
        floating.push(nth_weekday(year, 1, Weekday::Mon, 3));
    }
    match rules {
        HolidayRules::Federal => floating.push(nth_weekday(year, 10, Weekday::Mon, 2)),
        HolidayRules::Nyse => {
            floating.push(easter_sunday(year).and_then(|d| d.checked_sub_signed(Duration::days(2))))
        }
    }
    out.extend(floating.into_iter().flatten());
    out
}

/// Every calendar date from `start` through `end`, inclusive. Empty when `start > end`.
pub fn expand_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

/// Keeps the dates `calendar` accepts, sorted ascending with duplicates removed.
pub fn filter_trading_days<C>(dates: &[NaiveDate], calendar: &C) -> Vec<NaiveDate>
where
    C: TradingCalendar + ?Sized,
{
    dates
        .iter()
        .copied()
        .filter(|date| calendar.is_trading_day(*date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Resolve a local wall time to UTC, taking the earliest instant when ambiguous
/// and shifting forward minute by minute (at most two hours) out of a DST gap.
fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let mut t = naive;
    for _ in 0..=120 {
        if let Some(dt) = tz.from_local_datetime(&t).earliest() {
            return dt.with_timezone(&Utc);
        }
        t += Duration::minutes(1);
    }
    Utc.from_utc_datetime(&naive)
}

/// UTC `[start, end)` covered by `day` on the New York exchange calendar.
pub fn market_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(day.and_time(chrono::NaiveTime::MIN), New_York);
    let end = match day.succ_opt() {
        Some(next) => local_to_utc(next.and_time(chrono::NaiveTime::MIN), New_York),
        None => start + Duration::days(1),
    };
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekends_are_never_trading_days() {
        // 2024-01-06 is a Saturday
        assert!(!Weekdays.is_trading_day(d(2024, 1, 6)));
        assert!(!Weekdays.is_trading_day(d(2024, 1, 7)));
        assert!(Weekdays.is_trading_day(d(2024, 1, 8)));
    }

    #[test]
    fn federal_holidays_2024() {
        let cal = UsHolidayCalendar::new(HolidayRules::Federal);
        for holiday in [
            d(2024, 1, 1),
            d(2024, 1, 15),
            d(2024, 2, 19),
            d(2024, 5, 27),
            d(2024, 6, 19),
            d(2024, 7, 4),
            d(2024, 9, 2),
            d(2024, 10, 14),
            d(2024, 11, 11),
            d(2024, 11, 28),
            d(2024, 12, 25),
        ] {
            assert!(!cal.is_trading_day(holiday), "{holiday} should be closed");
        }
        assert!(cal.is_trading_day(d(2024, 3, 29)), "Good Friday is not a federal holiday");
    }

    #[test]
    fn nyse_rules_swap_columbus_and_veterans_for_good_friday() {
        let cal = UsHolidayCalendar::new(HolidayRules::Nyse);
        assert!(!cal.is_trading_day(d(2024, 3, 29)));
        assert!(!cal.is_trading_day(d(2025, 4, 18)));
        assert!(cal.is_trading_day(d(2024, 10, 14)));
        assert!(cal.is_trading_day(d(2024, 11, 11)));
    }

    #[test]
    fn observed_days_shift_off_weekends() {
        let federal = UsHolidayCalendar::new(HolidayRules::Federal);
        // July 4 2020 was a Saturday, observed Friday July 3
        assert!(!federal.is_trading_day(d(2020, 7, 3)));
        // Christmas 2022 was a Sunday, observed Monday Dec 26
        assert!(!federal.is_trading_day(d(2022, 12, 26)));
        // New Year's Day 2022 was a Saturday, observed Friday Dec 31 2021
        assert!(!federal.is_trading_day(d(2021, 12, 31)));

        let nyse = UsHolidayCalendar::new(HolidayRules::Nyse);
        assert!(nyse.is_trading_day(d(2021, 12, 31)));
        // New Year's Day 2023 was a Sunday, observed Monday Jan 2
        assert!(!nyse.is_trading_day(d(2023, 1, 2)));
    }

    #[test]
    fn juneteenth_only_from_2021() {
        let cal = UsHolidayCalendar::new(HolidayRules::Federal);
        assert!(cal.is_trading_day(d(2019, 6, 19)));
        assert!(!cal.is_trading_day(d(2023, 6, 19)));
    }

    #[test]
    fn extra_closures_are_excluded() {
        let cal = UsHolidayCalendar::new(HolidayRules::Nyse).with_extra_closures([d(2025, 1, 9)]);
        assert!(!cal.is_trading_day(d(2025, 1, 9)));
        assert!(cal.is_trading_day(d(2025, 1, 10)));
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2024), Some(d(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(d(2025, 4, 20)));
        assert_eq!(easter_sunday(2000), Some(d(2000, 4, 23)));
    }

    #[test]
    fn expand_is_inclusive_and_empty_when_reversed() {
        let days = expand_dates(d(2024, 1, 5), d(2024, 1, 8));
        assert_eq!(days, vec![d(2024, 1, 5), d(2024, 1, 6), d(2024, 1, 7), d(2024, 1, 8)]);
        assert!(expand_dates(d(2024, 1, 8), d(2024, 1, 5)).is_empty());
    }

    #[test]
    fn filtering_sorts_and_dedupes() {
        let dates = [d(2024, 1, 9), d(2024, 1, 6), d(2024, 1, 8), d(2024, 1, 9)];
        let eligible = filter_trading_days(&dates, &Weekdays);
        assert_eq!(eligible, vec![d(2024, 1, 8), d(2024, 1, 9)]);
    }

    #[test]
    fn closures_are_calendars() {
        let only_mondays = |date: NaiveDate| date.weekday() == Weekday::Mon;
        let eligible = filter_trading_days(&expand_dates(d(2024, 1, 1), d(2024, 1, 14)), &only_mondays);
        assert_eq!(eligible, vec![d(2024, 1, 1), d(2024, 1, 8)]);
    }

    #[test]
    fn market_day_bounds_follow_new_york_offsets() {
        // EST: midnight local is 05:00Z
        let (start, end) = market_day_bounds(d(2024, 1, 15));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 15, 5, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 16, 5, 0, 0).unwrap());

        // spring-forward day is 23 hours long
        let (start, end) = market_day_bounds(d(2024, 3, 10));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 11, 4, 0, 0).unwrap());
        assert_eq!(end - start, Duration::hours(23));
    }
}
