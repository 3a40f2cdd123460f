// External imports
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

// Internal imports
use crate::types::PriceRecord;
use crate::util::date_parser::{date_key, generate_date_list};

/// Generate a random walk of daily bars with realistic OHLC relationships
pub fn generate_price_records(start: NaiveDate, num_rows: usize, seed: u64) -> Vec<PriceRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let end = start + chrono::Duration::days(num_rows as i64 * 2 + 7);
    let dates = generate_date_list(start, end, &[]);

    // Start with a base price around $100
    let mut current_price = 100.0 + rng.random::<f64>() * 50.0;

    dates
        .into_iter()
        .take(num_rows)
        .map(|date| {
            // Random price movement between -1% and +1%
            let movement = (rng.random::<f64>() * 2.0 - 1.0) * 0.01;
            current_price *= 1.0 + movement;

            let open = current_price * (1.0 + (rng.random::<f64>() * 0.01 - 0.005));
            let high = current_price.max(open) * (1.0 + rng.random::<f64>() * 0.005);
            let low = current_price.min(open) * (1.0 - rng.random::<f64>() * 0.005);
            let volume = rng.random_range(10_000..110_000) as f64;

            PriceRecord {
                date,
                open,
                high,
                low,
                close: current_price,
                volume,
                adjusted_close: current_price * 0.98,
            }
        })
        .collect()
}

/// Write records as a Yahoo-style CSV, newest row first
pub fn write_yahoo_csv(path: &Path, records: &[PriceRecord]) -> std::io::Result<()> {
    let mut body = String::from("Date,Open,High,Low,Close,Volume,Adj Close\n");
    for r in records.iter().rev() {
        let _ = writeln!(
            body,
            "{},{},{},{},{},{},{}",
            date_key(r.date),
            r.open,
            r.high,
            r.low,
            r.close,
            r.volume,
            r.adjusted_close
        );
    }
    std::fs::write(path, body)
}

/// Write a `Date,Value` series file for the given dates
pub fn write_series_csv(path: &Path, rows: &[(NaiveDate, f64)]) -> std::io::Result<()> {
    let mut body = String::from("Date,Value\n");
    for (date, value) in rows {
        let _ = writeln!(body, "{},{}", date_key(*date), value);
    }
    std::fs::write(path, body)
}

/// Create `{dir}/{symbol}.csv` with generated prices and return its path
pub fn write_symbol_file(
    dir: &Path,
    symbol: &str,
    start: NaiveDate,
    num_rows: usize,
    seed: u64,
) -> std::io::Result<(PathBuf, Vec<PriceRecord>)> {
    let records = generate_price_records(start, num_rows, seed);
    let path = dir.join(format!("{}.csv", symbol));
    write_yahoo_csv(&path, &records)?;
    Ok((path, records))
}
