use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::constants::FUNDAMENTAL_KEYS;
use crate::data_collection::base_class::{BaseClass, DatedRows};
use crate::error::{InferenceError, Result};
use crate::util::file_utils::read_series_csv;

/// Reads external per-date series such as bond yields and market indices
///
/// Each key is a file `{dir}/{KEY}.csv` with a date column and a value column.
#[derive(Debug, Clone)]
pub struct FundamentalSource {
    dir: PathBuf,
}

impl FundamentalSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn series_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", key))
    }

    /// A missing series file yields `None` so its column is filled with zeros
    pub fn load(&self, key: &str) -> Result<Option<BTreeMap<String, f64>>> {
        if !FUNDAMENTAL_KEYS.contains(&key) {
            warn!("{} is not one of {:?}", key, FUNDAMENTAL_KEYS);
        }
        match read_series_csv(self.series_path(key)) {
            Ok(series) => Ok(Some(series)),
            Err(InferenceError::FileNotFound(path)) => {
                warn!("No data for {} at {}, using zeros", key, path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl BaseClass {
    /// Fundamental columns for every feature date, read through the cache
    pub fn fundamental_analysis(
        &mut self,
        source: &FundamentalSource,
        keys: &[String],
    ) -> Result<Vec<Vec<f64>>> {
        let file_name = self.cache_name(&format!("fundamental_{}", keys.join("_")));
        if let Some(cached) = self.load_data_from_file::<Vec<Vec<f64>>>(&file_name)? {
            return Ok(cached);
        }

        let mut rows: DatedRows = self
            .feature_dates()?
            .into_iter()
            .map(|d| (d, Vec::with_capacity(keys.len())))
            .collect();
        for key in keys {
            info!("Merging fundamental series {}", key);
            let series = source.load(key)?;
            rows = match series {
                Some(series) => self.merge_info(rows, Some(&series)),
                None => {
                    let empty = BTreeMap::new();
                    self.merge_info(rows, Some(&empty))
                }
            };
        }

        let features: Vec<Vec<f64>> = rows.into_iter().map(|(_, v)| v).collect();
        self.save_data_to_file(&file_name, &features)?;
        Ok(features)
    }
}
