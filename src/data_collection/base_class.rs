// External crates
use chrono::NaiveDate;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// Local modules
use crate::constants::{CACHE_FILE_EXTENSION, DATE_FORMAT};
use crate::error::{InferenceError, Result};
use crate::types::{PriceRecord, PriceType};
use crate::util::date_parser::{date_key, generate_date_list, get_ahead_date, is_holiday};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Feature rows keyed by the date they describe
pub type DatedRows = Vec<(NaiveDate, Vec<f64>)>;

/// Shared state for collecting one symbol over one date range
///
/// `history` holds every record loaded for the symbol; `stock_price` is the
/// slice from the start date through the true end date, whose last row only
/// supplies the label for the row before it.
#[derive(Debug, Clone, Default)]
pub struct BaseClass {
    pub(crate) history: Vec<PriceRecord>,
    pub(crate) stock_price: Vec<PriceRecord>,
    pub(crate) start_index: usize,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    true_end_date: Option<NaiveDate>,
    pub(crate) date_list: Option<Vec<NaiveDate>>,
    stock_symbol: Option<String>,
    price_type: PriceType,
    data_file_path: Option<PathBuf>,
    holidays: Vec<NaiveDate>,
    pub one_day_info: bool,
}

impl BaseClass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: Vec<NaiveDate>) -> Self {
        Self {
            holidays,
            ..Self::default()
        }
    }

    pub fn get_start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn get_end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn get_true_end_date(&self) -> Option<NaiveDate> {
        self.true_end_date
    }

    pub(crate) fn set_true_end_date(&mut self, date: NaiveDate) {
        self.true_end_date = Some(date);
    }

    /// A start date on a holiday moves back to the previous business day
    pub fn business_start_date(&self, date: NaiveDate) -> NaiveDate {
        if is_holiday(date, &self.holidays) {
            get_ahead_date(date, -1, &self.holidays)
        } else {
            date
        }
    }

    /// An end date on a holiday moves forward to the next business day
    pub fn business_end_date(&self, date: NaiveDate) -> NaiveDate {
        if is_holiday(date, &self.holidays) {
            get_ahead_date(date, 1, &self.holidays)
        } else {
            date
        }
    }

    pub fn set_start_date(&mut self, date: NaiveDate) {
        debug!("Set start date to {}", date);
        self.start_date = Some(self.business_start_date(date));
        self.date_list = None;
    }

    /// Sets the shifted end date; the true end is one business day later
    pub fn set_end_date(&mut self, date: NaiveDate) {
        debug!("Set end date to {}", date);
        let end = self.business_end_date(date);
        self.end_date = Some(end);
        self.true_end_date = Some(get_ahead_date(end, 1, &self.holidays));
        self.date_list = None;
    }

    pub fn get_stock_symbol(&self) -> Option<&str> {
        self.stock_symbol.as_deref()
    }

    pub fn set_stock_symbol(&mut self, symbol: &str) {
        self.stock_symbol = Some(symbol.to_string());
    }

    pub fn get_price_type(&self) -> PriceType {
        self.price_type
    }

    pub fn set_price_type(&mut self, price_type: Option<PriceType>) {
        let price_type = price_type.unwrap_or_default();
        debug!("Set price type to {}", price_type);
        self.price_type = price_type;
    }

    /// Dates that carry a label, generated from the calendar when no data is loaded
    pub fn get_date_list(&mut self) -> Result<Vec<NaiveDate>> {
        if self.date_list.is_none() {
            self.generate_date_list(None, None)?;
        }
        Ok(self.date_list.clone().unwrap_or_default())
    }

    pub fn generate_date_list(
        &mut self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<()> {
        let start = start_date
            .or(self.start_date)
            .ok_or_else(|| InferenceError::InvalidDate("start date not set".to_string()))?;
        let end = end_date
            .or(self.end_date)
            .ok_or_else(|| InferenceError::InvalidDate("end date not set".to_string()))?;
        self.date_list = Some(generate_date_list(start, end, &self.holidays));
        Ok(())
    }

    /// Dates of the assembled feature rows
    ///
    /// One per labelled date, plus the true end date when `one_day_info` is set.
    pub fn feature_dates(&mut self) -> Result<Vec<NaiveDate>> {
        let mut dates = self.get_date_list()?;
        if self.one_day_info {
            if let Some(last) = self.stock_price.last() {
                dates.push(last.date);
            }
        }
        Ok(dates)
    }

    /// Prices from `ahead` rows before the start date through the true end date
    pub fn get_ahead_stock_price(&self, ahead: usize) -> Result<&[PriceRecord]> {
        if ahead > self.start_index {
            return Err(InferenceError::NotEnoughData {
                needed: ahead,
                found: self.start_index,
            });
        }
        let from = self.start_index - ahead;
        let to = self.start_index + self.stock_price.len();
        Ok(&self.history[from..to])
    }

    /// Appends the value recorded for each row's date, or 0 when absent
    pub fn merge_info(
        &self,
        mut calculated_info: DatedRows,
        info_dict: Option<&BTreeMap<String, f64>>,
    ) -> DatedRows {
        let Some(info_dict) = info_dict else {
            return calculated_info;
        };
        for (date, row) in calculated_info.iter_mut() {
            row.push(info_dict.get(&date_key(*date)).copied().unwrap_or(0.0));
        }
        calculated_info
    }

    pub fn get_data_file_path(&self) -> Option<&Path> {
        self.data_file_path.as_deref()
    }

    /// Points the cache at `{path}/{symbol}_{from}_{to}` and creates it
    pub fn set_data_file_path(&mut self, path: Option<&Path>) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
            return Err(InferenceError::InvalidDate("date range not set".to_string()));
        };
        let compact = DATE_FORMAT.replace('-', "");
        let symbol: String = self
            .stock_symbol
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let folder = format!(
            "{}_{}_{}",
            symbol,
            start.format(&compact),
            end.format(&compact)
        );
        let data_file_path = path.join(folder);
        std::fs::create_dir_all(&data_file_path)?;
        debug!("Data will be saved to {}", data_file_path.display());
        self.data_file_path = Some(data_file_path);
        Ok(())
    }

    /// Cache entry name; `one_day_info` rows carry one extra row
    pub(crate) fn cache_name(&self, stem: &str) -> String {
        if self.one_day_info {
            format!("{}_latest.{}", stem, CACHE_FILE_EXTENSION)
        } else {
            format!("{}.{}", stem, CACHE_FILE_EXTENSION)
        }
    }

    /// Location of a cache entry, with the name reduced to alphanumeric tokens
    fn cache_file(&self, file_name: &str) -> Option<PathBuf> {
        let dir = self.data_file_path.as_ref()?;
        let tokens: Vec<&str> = file_name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty() && *t != CACHE_FILE_EXTENSION)
            .collect();
        let name = format!("{}.{}", tokens.join("_"), CACHE_FILE_EXTENSION);
        Some(dir.join(self.price_type.as_str()).join(name))
    }

    pub fn load_data_from_file<T: DeserializeOwned>(&self, file_name: &str) -> Result<Option<T>> {
        let Some(file_path) = self.cache_file(file_name) else {
            warn!("File path not set, load nothing");
            return Ok(None);
        };
        if !file_path.is_file() {
            warn!("No such data {}, load nothing", file_path.display());
            return Ok(None);
        }
        debug!("Load data from {}", file_path.display());
        let bytes = std::fs::read(&file_path)?;
        let (data, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| {
                InferenceError::CorruptCache(file_path.display().to_string(), e.to_string())
            })?;
        Ok(Some(data))
    }

    pub fn save_data_to_file<T: Serialize>(&self, file_name: &str, data: &T) -> Result<()> {
        let Some(save_path) = self.cache_file(file_name) else {
            warn!("File path not set, save nothing");
            return Ok(());
        };
        if let Some(parent) = save_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serde::encode_to_vec(data, bincode::config::standard())
            .map_err(|e| {
                InferenceError::CorruptCache(save_path.display().to_string(), e.to_string())
            })?;
        // Parallel runs may share entries, so readers only ever see complete files
        let tmp_path = save_path.with_extension(format!(
            "{}.{}-{}.tmp",
            CACHE_FILE_EXTENSION,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &save_path)?;
        debug!("Save data to {}", save_path.display());
        Ok(())
    }
}
