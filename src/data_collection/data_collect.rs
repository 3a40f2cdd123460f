// External crates
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Local modules
use crate::constants::PRICE_FEATURES;
use crate::data_collection::base_class::BaseClass;
use crate::data_collection::fundamental_analysis::FundamentalSource;
use crate::data_collection::handle_stock_price::normalized_label;
use crate::data_collection::stock_indicator::IndicatorSpec;
use crate::error::{InferenceError, Result};
use crate::types::{LabelInfo, LabeledPoint, NormalizationMethod, PriceRecord, PriceType};
use crate::util::file_utils::read_price_csv;

/// Where raw daily prices come from
pub trait PriceSource {
    /// Every available record for `symbol`, ascending by date
    fn load_history(&self, symbol: &str) -> Result<Vec<PriceRecord>>;
}

/// Prices stored as `{dir}/{symbol}.csv`
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl PriceSource for CsvPriceSource {
    fn load_history(&self, symbol: &str) -> Result<Vec<PriceRecord>> {
        read_price_csv(self.dir.join(format!("{}.csv", symbol)))
    }
}

/// Feature groups to assemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredInfo {
    /// Days per price window
    pub data_period: usize,
    pub indicators: Vec<IndicatorSpec>,
    pub fundamentals: Vec<String>,
}

impl Default for RequiredInfo {
    fn default() -> Self {
        Self {
            data_period: 1,
            indicators: Vec::new(),
            fundamentals: Vec::new(),
        }
    }
}

impl RequiredInfo {
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = PRICE_FEATURES.iter().map(|s| s.to_string()).collect();
        names.extend(self.indicators.iter().map(|i| i.to_string()));
        names.extend(self.fundamentals.iter().cloned());
        names
    }
}

/// Assembled features and labels for one symbol and date range
#[derive(Debug, Clone)]
pub struct CollectedData {
    pub points: Vec<LabeledPoint>,
    /// Features of the window ending on the last loaded day, which has no label yet
    pub latest: Option<(NaiveDate, Vec<f64>)>,
    pub feature_names: Vec<String>,
}

/// Collects prices, indicators and fundamentals into labelled rows
pub struct DataCollect<S: PriceSource> {
    pub base: BaseClass,
    source: S,
    fundamental_source: Option<FundamentalSource>,
    cache_root: Option<PathBuf>,
}

impl<S: PriceSource> DataCollect<S> {
    pub fn new(source: S) -> Self {
        Self {
            base: BaseClass::new(),
            source,
            fundamental_source: None,
            cache_root: None,
        }
    }

    pub fn with_fundamental_source(mut self, source: FundamentalSource) -> Self {
        self.fundamental_source = Some(source);
        self
    }

    pub fn with_cache<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.cache_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn with_holidays(mut self, holidays: Vec<NaiveDate>) -> Self {
        self.base = BaseClass::with_holidays(holidays);
        self
    }

    pub fn set_one_day_info(&mut self, enabled: bool) {
        self.base.one_day_info = enabled;
    }

    pub fn set_price_type(&mut self, price_type: Option<PriceType>) {
        self.base.set_price_type(price_type);
    }

    fn needs_refresh(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> bool {
        self.base.stock_price.is_empty()
            || self.base.get_stock_symbol() != Some(symbol)
            || self.base.get_start_date() != Some(self.base.business_start_date(start))
            || self.base.get_end_date() != Some(self.base.business_end_date(end))
    }

    /// Loads `[start, true end]` and derives the labelled date list
    fn refresh_stock_price(&mut self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
        if start > end {
            return Err(InferenceError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        self.base.set_stock_symbol(symbol);
        self.base.set_start_date(start);
        self.base.set_end_date(end);
        let start = self.base.get_start_date().unwrap_or(start);
        let true_end = self.base.get_true_end_date().unwrap_or(end);

        let history = self.source.load_history(symbol)?;
        let start_index = history.partition_point(|r| r.date < start);
        let end_index = history.partition_point(|r| r.date <= true_end);
        let stock_price = history[start_index..end_index].to_vec();
        if stock_price.len() < 2 {
            return Err(InferenceError::NotEnoughData {
                needed: 2,
                found: stock_price.len(),
            });
        }
        info!(
            "Loaded {} price rows for {} ({} earlier rows available)",
            stock_price.len(),
            symbol,
            start_index
        );

        let last_listed = stock_price[stock_price.len() - 2].date;
        self.base.date_list = Some(stock_price[..stock_price.len() - 1].iter().map(|r| r.date).collect());
        self.base.set_true_end_date(last_listed);
        self.base.start_index = start_index;
        self.base.stock_price = stock_price;
        self.base.history = history;

        if let Some(root) = self.cache_root.clone() {
            self.base.set_data_file_path(Some(&root))?;
        }
        Ok(())
    }

    /// Builds labelled feature rows for `symbol` over `[start, end]`
    ///
    /// Each row's label is the next trading day's close or open, normalized
    /// with the row's window max and min.
    pub fn get_all_required_data(
        &mut self,
        stock_symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        label_info: LabelInfo,
        normalized_method: NormalizationMethod,
        required_info: &RequiredInfo,
    ) -> Result<CollectedData> {
        if self.needs_refresh(stock_symbol, start_date, end_date) {
            self.refresh_stock_price(stock_symbol, start_date, end_date)?;
        }

        let real_list: Vec<f64> = self.base.stock_price[1..]
            .iter()
            .map(|r| label_info.pick(r))
            .collect();

        let mut collected_data = self.base.handle_stock_price(required_info.data_period)?;
        let label_list = normalized_label(normalized_method, &real_list, &collected_data);

        if !required_info.indicators.is_empty() {
            let warm_up = required_info
                .indicators
                .iter()
                .map(IndicatorSpec::warm_up)
                .max()
                .unwrap_or(0);
            if self.base.start_index < warm_up {
                warn!(
                    "Only {} rows before the start date, indicators need {}; early rows are zero",
                    self.base.start_index, warm_up
                );
            }
            let indicator_info = self.base.handle_indicator(&required_info.indicators)?;
            collected_data = concatenate(collected_data, indicator_info);
        }

        if !required_info.fundamentals.is_empty() {
            let fundamental_info = match &self.fundamental_source {
                Some(source) => self
                    .base
                    .fundamental_analysis(source, &required_info.fundamentals)?,
                None => {
                    warn!("No fundamental data directory configured, using zeros");
                    vec![vec![0.0; required_info.fundamentals.len()]; collected_data.len()]
                }
            };
            collected_data = concatenate(collected_data, fundamental_info);
        }

        let dates = self.base.feature_dates()?;
        let mut rows: Vec<(NaiveDate, Vec<f64>)> = dates.into_iter().zip(collected_data).collect();
        let latest = if self.base.one_day_info && rows.len() > label_list.len() {
            rows.truncate(label_list.len() + 1);
            rows.pop()
        } else {
            None
        };
        let points: Vec<LabeledPoint> = rows
            .into_iter()
            .zip(label_list.into_iter().zip(real_list))
            .map(|((date, features), (label, real))| LabeledPoint {
                date,
                features,
                label,
                real,
            })
            .collect();
        debug!(
            "Assembled {} labelled rows with {} features",
            points.len(),
            required_info.feature_names().len()
        );

        Ok(CollectedData {
            points,
            latest,
            feature_names: required_info.feature_names(),
        })
    }
}

fn concatenate(list1: Vec<Vec<f64>>, list2: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    list1
        .into_iter()
        .zip(list2)
        .map(|(mut a, b)| {
            a.extend(b);
            a
        })
        .collect()
}

/// Chronological split: the first `ratio` share trains, the rest tests
pub fn split_train_test(
    points: &[LabeledPoint],
    ratio: f64,
) -> (Vec<LabeledPoint>, Vec<LabeledPoint>) {
    let ratio = ratio.clamp(0.0, 1.0);
    let train_len = (points.len() as f64 * ratio) as usize;
    (points[..train_len].to_vec(), points[train_len..].to_vec())
}
