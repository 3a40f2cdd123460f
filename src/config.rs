use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::constants::{
    CACHE_PATH, DATA_PATH, EXPERIMENT_PATH, MODEL_PATH, TRAIN_SPLIT_RATIO,
};
use crate::data_collection::RequiredInfo;
use crate::error::{InferenceError, Result};
use crate::regression::RegressionConfig;
use crate::types::{NormalizationMethod, PriceType};
use crate::util::date_parser::parse_date;

/// Settings for one prediction run, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    pub price_type: PriceType,
    pub normalization: NormalizationMethod,
    pub required_info: RequiredInfo,
    pub train_ratio: f64,
    pub regression: RegressionConfig,
    /// Also build the window ending on the last day and predict the day after
    pub one_day_info: bool,
    pub holidays: Vec<NaiveDate>,
    pub data_dir: PathBuf,
    pub fundamental_dir: Option<PathBuf>,
    /// Disable the feature cache with `null`
    pub cache_dir: Option<PathBuf>,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbol: "0001.HK".to_string(),
            start_date: "2012-01-03".to_string(),
            end_date: "2015-12-31".to_string(),
            price_type: PriceType::Close,
            normalization: NormalizationMethod::MinMax,
            required_info: RequiredInfo::default(),
            train_ratio: TRAIN_SPLIT_RATIO,
            regression: RegressionConfig::default(),
            one_day_info: false,
            holidays: Vec::new(),
            data_dir: PathBuf::from(DATA_PATH),
            fundamental_dir: None,
            cache_dir: Some(PathBuf::from(CACHE_PATH)),
            model_dir: PathBuf::from(MODEL_PATH),
            output_dir: PathBuf::from(EXPERIMENT_PATH),
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InferenceError::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let config: PipelineConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start = parse_date(&self.start_date)?;
        let end = parse_date(&self.end_date)?;
        if start > end {
            return Err(InferenceError::InvalidDateRange {
                start: self.start_date.clone(),
                end: self.end_date.clone(),
            });
        }
        Ok((start, end))
    }

    pub fn validate(&self) -> Result<()> {
        self.date_range()?;
        if self.required_info.data_period == 0 {
            return Err(InferenceError::InvalidWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_collection::IndicatorKind;
    use tempfile::tempdir;

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "symbol": "0005.HK",
                "price_type": "adjusted_close",
                "required_info": { "data_period": 5, "indicators": ["rsi_14", "macd"] },
                "regression": { "iterations": 50 },
                "holidays": ["2015-12-25"]
            }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.symbol, "0005.HK");
        assert_eq!(config.price_type, PriceType::AdjustedClose);
        assert_eq!(config.required_info.data_period, 5);
        assert_eq!(config.required_info.indicators[0].kind, IndicatorKind::Rsi);
        assert_eq!(config.regression.iterations, 50);
        assert_eq!(config.regression.step, crate::constants::SGD_STEP);
        assert_eq!(config.normalization, NormalizationMethod::MinMax);
        assert_eq!(config.holidays.len(), 1);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let config = PipelineConfig {
            start_date: "2016-02-01".to_string(),
            end_date: "2016-01-01".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InferenceError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_file("missing.json"),
            Err(InferenceError::FileNotFound(_))
        ));
    }
}
