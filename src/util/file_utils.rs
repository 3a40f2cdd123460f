// External crates
use chrono::NaiveDate;
use log::debug;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

// Local modules
use crate::error::{InferenceError, Result};
use crate::types::{LabeledPoint, PriceRecord};
use crate::util::date_parser::{date_key, parse_date};

/// Maps common price-file headers onto the standard lowercase names
fn standard_column_name(column_name: &str) -> Option<&'static str> {
    let name = match column_name.to_lowercase().as_str() {
        "open" | "o" | "op" | "openprice" | "open_price" => "open",
        "high" | "h" | "highprice" | "high_price" | "max" => "high",
        "low" | "l" | "lowprice" | "low_price" | "min" => "low",
        "close" | "c" | "cl" | "closeprice" | "close_price" => "close",
        "volume" | "vol" | "v" | "volumes" => "volume",
        "timestamp" | "time" | "date" | "t" | "datetime" | "dt" | "day" => "date",
        "adj close" | "adj_close" | "adjusted close" | "adjusted_close" | "adjclose" | "adj" => {
            "adjusted_close"
        }
        "value" | "val" | "rate" | "yield" => "value",
        _ => return None,
    };
    Some(name)
}

/// Reads a CSV file and renames its columns to the standard names
///
/// # Arguments
///
/// * `path` - Path to the CSV file
///
/// # Returns
///
/// Returns the DataFrame with standardized column names
pub fn read_standardized_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(InferenceError::FileNotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut df = CsvReader::new(file).finish()?;

    let renames: Vec<(String, &'static str)> = df
        .get_column_names()
        .iter()
        .filter_map(|name| {
            let name = name.to_string();
            standard_column_name(&name)
                .filter(|standard| *standard != name)
                .map(|standard| (name, standard))
        })
        .collect();

    for (old_name, new_name) in renames {
        // Keep the first column when two headers map onto the same name
        if df.schema().contains(new_name) {
            continue;
        }
        df.rename(&old_name, new_name.into())?;
    }

    debug!(
        "Read {} rows from {} with columns {:?}",
        df.height(),
        path.display(),
        df.get_column_names()
    );
    Ok(df)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| InferenceError::MissingColumn(name.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

fn date_column(df: &DataFrame) -> Result<Vec<Option<NaiveDate>>> {
    let series = df
        .column("date")
        .map_err(|_| InferenceError::MissingColumn("date".to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let dates = series
        .str()?
        .into_iter()
        .map(|value| value.and_then(|v| parse_date(v).ok()))
        .collect();
    Ok(dates)
}

/// Loads a daily price file into records sorted by ascending date
///
/// Rows with missing or non-finite prices are dropped, a missing volume
/// becomes zero and a missing adjusted close falls back to the close.
pub fn read_price_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PriceRecord>> {
    let df = read_standardized_csv(path)?;
    price_records_from_dataframe(&df)
}

pub fn price_records_from_dataframe(df: &DataFrame) -> Result<Vec<PriceRecord>> {
    let dates = date_column(df)?;
    let open = float_column(df, "open")?;
    let high = float_column(df, "high")?;
    let low = float_column(df, "low")?;
    let close = float_column(df, "close")?;
    let volume = if df.schema().contains("volume") {
        float_column(df, "volume")?
    } else {
        vec![Some(0.0); df.height()]
    };
    let adjusted = if df.schema().contains("adjusted_close") {
        float_column(df, "adjusted_close")?
    } else {
        close.clone()
    };

    let mut by_date = BTreeMap::new();
    for i in 0..df.height() {
        let (Some(date), Some(open), Some(high), Some(low), Some(close)) =
            (dates[i], open[i], high[i], low[i], close[i])
        else {
            continue;
        };
        if ![open, high, low, close].iter().all(|p| p.is_finite()) {
            continue;
        }
        let adjusted_close = adjusted[i].filter(|a| a.is_finite()).unwrap_or(close);
        by_date.insert(
            date,
            PriceRecord {
                date,
                open,
                high,
                low,
                close,
                volume: volume[i].unwrap_or(0.0),
                adjusted_close,
            },
        );
    }

    Ok(by_date.into_values().collect())
}

/// Reads a single per-date series, keyed by `YYYY-MM-DD`
///
/// The value column is `value`, then `adjusted_close`, then `close`.
pub fn read_series_csv<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, f64>> {
    let df = read_standardized_csv(path)?;
    let value_column = ["value", "adjusted_close", "close"]
        .into_iter()
        .find(|name| df.schema().contains(name))
        .ok_or_else(|| InferenceError::MissingColumn("value".to_string()))?;

    let dates = date_column(&df)?;
    let values = float_column(&df, value_column)?;
    let series = dates
        .into_iter()
        .zip(values)
        .filter_map(|(date, value)| match (date, value) {
            (Some(date), Some(value)) if value.is_finite() => Some((date_key(date), value)),
            _ => None,
        })
        .collect();
    Ok(series)
}

/// Builds a frame with a `date` column, one column per feature and the label
pub fn labeled_points_to_dataframe(
    points: &[LabeledPoint],
    feature_names: &[String],
) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(feature_names.len() + 2);
    let dates: Vec<String> = points.iter().map(|p| date_key(p.date)).collect();
    columns.push(Series::new("date".into(), dates).into_column());

    for (i, name) in feature_names.iter().enumerate() {
        let values: Vec<Option<f64>> = points.iter().map(|p| p.features.get(i).copied()).collect();
        columns.push(Series::new(name.as_str().into(), values).into_column());
    }

    let labels: Vec<f64> = points.iter().map(|p| p.label).collect();
    columns.push(Series::new("label".into(), labels).into_column());

    Ok(DataFrame::new(columns)?)
}

/// Writes `date,real,predicted` rows for plotting
pub fn write_predictions_csv<P: AsRef<Path>>(
    path: P,
    rows: &[(NaiveDate, f64, f64)],
) -> Result<()> {
    let dates: Vec<String> = rows.iter().map(|(d, _, _)| date_key(*d)).collect();
    let real: Vec<f64> = rows.iter().map(|(_, r, _)| *r).collect();
    let predicted: Vec<f64> = rows.iter().map(|(_, _, p)| *p).collect();
    let mut df = DataFrame::new(vec![
        Series::new("date".into(), dates).into_column(),
        Series::new("real".into(), real).into_column(),
        Series::new("predicted".into(), predicted).into_column(),
    ])?;
    write_dataframe_csv(path, &mut df)
}

pub fn write_dataframe_csv<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
