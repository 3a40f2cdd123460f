use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::MIN_MAX_EPSILON;
use crate::error::InferenceError;

/// One trading day of raw price data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub adjusted_close: f64,
}

impl PriceRecord {
    /// Open/high/low/close rescaled by the adjusted close ratio
    pub fn adjusted(&self) -> [f64; 4] {
        if self.close == 0.0 {
            return [self.open, self.high, self.low, self.adjusted_close];
        }
        let ratio = self.adjusted_close / self.close;
        [
            self.open * ratio,
            self.high * ratio,
            self.low * ratio,
            self.adjusted_close,
        ]
    }

    pub fn ohlc(&self, price_type: PriceType) -> [f64; 4] {
        match price_type {
            PriceType::AdjustedClose => self.adjusted(),
            PriceType::Close | PriceType::Open => [self.open, self.high, self.low, self.close],
        }
    }
}

/// Feature vector with its target, ready for regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub date: NaiveDate,
    pub features: Vec<f64>,
    pub label: f64,
    /// Next-day price before normalization
    pub real: f64,
}

/// Which price series the features are built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    #[default]
    Close,
    Open,
    AdjustedClose,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::Close => "close",
            PriceType::Open => "open",
            PriceType::AdjustedClose => "adj_close",
        }
    }
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceType {
    type Err = InferenceError;

    /// Anything unrecognised falls back to the close price
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "open" => PriceType::Open,
            "adj_close" | "adjusted_close" | "adj close" => PriceType::AdjustedClose,
            _ => PriceType::Close,
        })
    }
}

/// Next-day price used as the regression target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelInfo {
    #[default]
    Close,
    Open,
}

impl LabelInfo {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelInfo::Close => "close",
            LabelInfo::Open => "open",
        }
    }

    pub fn pick(&self, record: &PriceRecord) -> f64 {
        match self {
            LabelInfo::Close => record.close,
            LabelInfo::Open => record.open,
        }
    }
}

impl fmt::Display for LabelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label normalization, parameterised by the window's max and min price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    None,
    #[default]
    MinMax,
    Sigmoid,
}

impl NormalizationMethod {
    pub fn normalize(&self, price: f64, max_price: f64, min_price: f64) -> f64 {
        match self {
            NormalizationMethod::None => price,
            NormalizationMethod::MinMax => {
                if (max_price - min_price).abs() < MIN_MAX_EPSILON {
                    return 0.0;
                }
                (2.0 * price - (max_price + min_price)) / (max_price - min_price)
            }
            NormalizationMethod::Sigmoid => 1.0 / (1.0 + price.exp()),
        }
    }

    /// Maps a normalized value back onto the price scale
    pub fn de_normalize(&self, value: f64, max_price: f64, min_price: f64) -> f64 {
        match self {
            NormalizationMethod::None => value,
            NormalizationMethod::MinMax => {
                value * (max_price - min_price) / 2.0 + (max_price + min_price) / 2.0
            }
            NormalizationMethod::Sigmoid => {
                let y = value.clamp(f64::EPSILON, 1.0 - f64::EPSILON);
                (1.0 / y - 1.0).ln()
            }
        }
    }
}

impl FromStr for NormalizationMethod {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(NormalizationMethod::None),
            "min_max" | "minmax" => Ok(NormalizationMethod::MinMax),
            "sigmoid" => Ok(NormalizationMethod::Sigmoid),
            other => Err(InferenceError::UnknownNormalization(other.to_string())),
        }
    }
}
