// External crates
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// Local modules
use crate::data_collection::base_class::{BaseClass, DatedRows};
use crate::error::{InferenceError, Result};
use crate::types::PriceRecord;
use crate::util::date_parser::date_key;

/// Technical indicator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    MacdSignal,
    Roc,
    Atr,
    BollingerWidth,
    VolumeSma,
}

impl IndicatorKind {
    fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::MacdSignal => "macd_signal",
            IndicatorKind::Roc => "roc",
            IndicatorKind::Atr => "atr",
            IndicatorKind::BollingerWidth => "bb_width",
            IndicatorKind::VolumeSma => "volume_sma",
        }
    }

    fn default_period(&self) -> usize {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::BollingerWidth => 20,
            IndicatorKind::VolumeSma => 20,
            IndicatorKind::Rsi | IndicatorKind::Atr => 14,
            IndicatorKind::Roc => 10,
            IndicatorKind::Macd | IndicatorKind::MacdSignal => 26,
        }
    }
}

/// An indicator with its look-back period, written `sma_20`, `rsi_14`, `macd`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub period: usize,
}

impl IndicatorSpec {
    pub fn new(kind: IndicatorKind, period: usize) -> Self {
        Self { kind, period }
    }

    /// Rows of history consumed before the first value is defined
    pub fn warm_up(&self) -> usize {
        match self.kind {
            IndicatorKind::Macd => 26,
            IndicatorKind::MacdSignal => 26 + 9,
            IndicatorKind::Rsi | IndicatorKind::Roc | IndicatorKind::Atr => self.period + 1,
            _ => self.period,
        }
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IndicatorKind::Macd | IndicatorKind::MacdSignal => f.write_str(self.kind.name()),
            _ => write!(f, "{}_{}", self.kind.name(), self.period),
        }
    }
}

impl FromStr for IndicatorSpec {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let (name, period) = match lower.rsplit_once('_') {
            Some((name, period)) if period.chars().all(|c| c.is_ascii_digit()) => {
                let period = period
                    .parse::<usize>()
                    .map_err(|_| InferenceError::UnknownIndicator(s.to_string()))?;
                (name.to_string(), Some(period))
            }
            _ => (lower.clone(), None),
        };
        let kind = match name.as_str() {
            "sma" => IndicatorKind::Sma,
            "ema" => IndicatorKind::Ema,
            "rsi" => IndicatorKind::Rsi,
            "macd" => IndicatorKind::Macd,
            "macd_signal" => IndicatorKind::MacdSignal,
            "roc" => IndicatorKind::Roc,
            "atr" => IndicatorKind::Atr,
            "bb_width" | "bollinger_width" => IndicatorKind::BollingerWidth,
            "volume_sma" => IndicatorKind::VolumeSma,
            _ => return Err(InferenceError::UnknownIndicator(s.to_string())),
        };
        let period = period.unwrap_or_else(|| kind.default_period());
        if period == 0 {
            return Err(InferenceError::UnknownIndicator(s.to_string()));
        }
        Ok(Self { kind, period })
    }
}

impl TryFrom<String> for IndicatorSpec {
    type Error = InferenceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<IndicatorSpec> for String {
    fn from(spec: IndicatorSpec) -> Self {
        spec.to_string()
    }
}

fn fixed_window(window: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: window,
        min_periods: window,
        center: false,
        weights: None,
        fn_params: None,
    }
}

fn series_values(series: &Series) -> Result<Vec<f64>> {
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Simple moving average via polars rolling mean
pub fn calculate_sma(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let series = Series::new("values".into(), values);
    let sma = series.rolling_mean(fixed_window(window))?;
    series_values(&sma)
}

fn ewm_options(window: usize) -> EWMOptions {
    EWMOptions {
        alpha: 2.0 / (window as f64 + 1.0),
        adjust: false,
        bias: false,
        min_periods: window,
        ignore_nulls: true,
    }
}

/// Exponential moving average with `alpha = 2 / (window + 1)`
pub fn calculate_ema(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let series = Series::new("values".into(), values);
    series_values(&ewm_mean(&series, ewm_options(window))?)
}

/// Rolling mean of `values[offset..]`, padded back to full length
fn sma_from(values: &[f64], offset: usize, window: usize) -> Result<Vec<f64>> {
    let mut result = vec![f64::NAN; offset.min(values.len())];
    if offset < values.len() {
        result.extend(calculate_sma(&values[offset..], window)?);
    }
    Ok(result)
}

/// Relative Strength Index from rolling mean gains and losses
pub fn calculate_rsi(close: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut gains = vec![0.0; close.len()];
    let mut losses = vec![0.0; close.len()];
    for i in 1..close.len() {
        let change = close[i] - close[i - 1];
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    // The first row has no previous close
    let avg_gain = sma_from(&gains, 1, window)?;
    let avg_loss = sma_from(&losses, 1, window)?;

    Ok(avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            if g.is_nan() || l.is_nan() {
                f64::NAN
            } else if *l == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect())
}

/// MACD line (EMA12 - EMA26) and its 9-day signal line
pub fn calculate_macd(close: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    let close = Series::new("close".into(), close);
    let ema12 = ewm_mean(&close, ewm_options(12))?;
    let ema26 = ewm_mean(&close, ewm_options(26))?;
    let macd = (&ema12 - &ema26)?.with_name("macd".into());
    let signal = ewm_mean(&macd, ewm_options(9))?;
    Ok((series_values(&macd)?, series_values(&signal)?))
}

/// Rate of change in percent over `window` rows
pub fn calculate_roc(close: &[f64], window: usize) -> Result<Vec<f64>> {
    let close = Series::new("close".into(), close);
    let shifted = close.shift(window as i64);
    let diff = (&close - &shifted)?;
    let roc = (&diff / &shifted)? * 100.0;
    series_values(&roc)
}

/// Average True Range, the rolling mean of the true range from the second row
pub fn calculate_atr(records: &[PriceRecord], window: usize) -> Result<Vec<f64>> {
    let high = Series::new("high".into(), records.iter().map(|r| r.high).collect::<Vec<_>>());
    let low = Series::new("low".into(), records.iter().map(|r| r.low).collect::<Vec<_>>());
    let close = Series::new("close".into(), records.iter().map(|r| r.close).collect::<Vec<_>>());
    let prev_close = close.shift(1);

    let high_low = (&high - &low)?;
    let high_close = (&high - &prev_close)?;
    let low_close = (&low - &prev_close)?;
    let true_range: Float64Chunked = high_low
        .f64()?
        .into_iter()
        .zip(high_close.f64()?)
        .zip(low_close.f64()?)
        .map(|((hl, hc), lc)| match (hl, hc, lc) {
            (Some(hl), Some(hc), Some(lc)) => Some(hl.max(hc.abs()).max(lc.abs())),
            _ => None,
        })
        .collect();
    let true_range = series_values(&true_range.into_series())?;
    sma_from(&true_range, 1, window)
}

/// Bollinger band width (upper - lower) / middle with two standard deviations
pub fn calculate_bollinger_width(close: &[f64], window: usize) -> Result<Vec<f64>> {
    let series = Series::new("close".into(), close);
    let sma = series_values(&series.rolling_mean(fixed_window(window))?)?;
    let std = series_values(&series.rolling_std(fixed_window(window))?)?;
    Ok(sma
        .iter()
        .zip(&std)
        .map(|(m, s)| if *m == 0.0 { f64::NAN } else { 4.0 * s / m })
        .collect())
}

/// Values of one indicator aligned with `records`
pub fn calculate_indicator(records: &[PriceRecord], spec: &IndicatorSpec) -> Result<Vec<f64>> {
    let close: Vec<f64> = records.iter().map(|r| r.close).collect();
    match spec.kind {
        IndicatorKind::Sma => calculate_sma(&close, spec.period),
        IndicatorKind::Ema => calculate_ema(&close, spec.period),
        IndicatorKind::Rsi => calculate_rsi(&close, spec.period),
        IndicatorKind::Macd => Ok(calculate_macd(&close)?.0),
        IndicatorKind::MacdSignal => Ok(calculate_macd(&close)?.1),
        IndicatorKind::Roc => calculate_roc(&close, spec.period),
        IndicatorKind::Atr => calculate_atr(records, spec.period),
        IndicatorKind::BollingerWidth => calculate_bollinger_width(&close, spec.period),
        IndicatorKind::VolumeSma => {
            let volume: Vec<f64> = records.iter().map(|r| r.volume).collect();
            calculate_sma(&volume, spec.period)
        }
    }
}

/// Date-keyed indicator values, skipping the undefined warm-up rows
pub fn indicator_by_date(
    records: &[PriceRecord],
    spec: &IndicatorSpec,
) -> Result<BTreeMap<String, f64>> {
    let values = calculate_indicator(records, spec)?;
    Ok(records
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(r, v)| (date_key(r.date), v))
        .collect())
}

impl BaseClass {
    /// Indicator columns for every feature date, read through the cache
    ///
    /// Indicators are computed over the full loaded history up to the true
    /// end date, so look-back rows before the start date warm them up.
    pub fn handle_indicator(&mut self, indicators: &[IndicatorSpec]) -> Result<Vec<Vec<f64>>> {
        let names: Vec<String> = indicators.iter().map(|i| i.to_string()).collect();
        let file_name = self.cache_name(&format!("indicator_{}", names.join("_")));
        if let Some(cached) = self.load_data_from_file::<Vec<Vec<f64>>>(&file_name)? {
            return Ok(cached);
        }

        let mut rows: DatedRows = self
            .feature_dates()?
            .into_iter()
            .map(|d| (d, Vec::with_capacity(indicators.len())))
            .collect();

        let history_end = self.start_index + self.stock_price.len();
        let history = &self.history[..history_end];
        for spec in indicators {
            let by_date = indicator_by_date(history, spec)?;
            rows = self.merge_info(rows, Some(&by_date));
        }

        let features: Vec<Vec<f64>> = rows.into_iter().map(|(_, v)| v).collect();
        self.save_data_to_file(&file_name, &features)?;
        Ok(features)
    }
}
