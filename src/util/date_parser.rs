use chrono::{Datelike, NaiveDate, Weekday};

use crate::constants::DATE_FORMAT;
use crate::error::{InferenceError, Result};

/// Parses `YYYY-MM-DD`, also accepting the compact `YYYYMMDD` form
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .map_err(|_| InferenceError::InvalidDate(value.to_string()))
}

/// String key used to align per-date feature sources
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Weekends and listed exchange holidays are not trading days
pub fn is_holiday(date: NaiveDate, holidays: &[NaiveDate]) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || holidays.contains(&date)
}

/// Moves `days` business days forward (or backward when negative)
pub fn get_ahead_date(date: NaiveDate, days: i64, holidays: &[NaiveDate]) -> NaiveDate {
    let mut current = date;
    let mut remaining = days.unsigned_abs();
    while remaining > 0 {
        let next = if days > 0 {
            current.succ_opt()
        } else {
            current.pred_opt()
        };
        current = match next {
            Some(d) => d,
            None => return current,
        };
        if !is_holiday(current, holidays) {
            remaining -= 1;
        }
    }
    current
}

/// All business days in `[start, end]`
pub fn generate_date_list(
    start: NaiveDate,
    end: NaiveDate,
    holidays: &[NaiveDate],
) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !is_holiday(*d, holidays))
        .collect()
}
