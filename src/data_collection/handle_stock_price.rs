use log::debug;

use crate::constants::{MAX_PRICE_INDEX, MIN_PRICE_INDEX, PRICE_FEATURES_FILE};
use crate::data_collection::base_class::BaseClass;
use crate::error::{InferenceError, Result};
use crate::types::{NormalizationMethod, PriceRecord, PriceType};

/// Per-window [open average, max high, min low, close average]
///
/// `rows` must hold `data_period - 1` look-back rows ahead of the first
/// window's end. One window ends on every row except the last, whose price
/// is only a label; `one_day_info` adds that final window too.
pub fn window_price_features(
    rows: &[PriceRecord],
    data_period: usize,
    price_type: PriceType,
    one_day_info: bool,
) -> Result<Vec<Vec<f64>>> {
    if data_period == 0 {
        return Err(InferenceError::InvalidWindow);
    }
    let stock_info: Vec<[f64; 4]> = rows.iter().map(|r| r.ohlc(price_type)).collect();

    let window_count = if one_day_info {
        (stock_info.len() + 1).saturating_sub(data_period)
    } else {
        stock_info.len().saturating_sub(data_period)
    };
    if window_count == 0 {
        return Err(InferenceError::NotEnoughData {
            needed: data_period + usize::from(!one_day_info),
            found: stock_info.len(),
        });
    }

    let features = stock_info
        .windows(data_period)
        .take(window_count)
        .map(|window| {
            let n = window.len() as f64;
            let open_avg = window.iter().map(|p| p[0]).sum::<f64>() / n;
            let max_price = window.iter().map(|p| p[1]).fold(f64::MIN, f64::max);
            let min_price = window.iter().map(|p| p[2]).fold(f64::MAX, f64::min);
            let close_avg = window.iter().map(|p| p[3]).sum::<f64>() / n;
            vec![open_avg, max_price, min_price, close_avg]
        })
        .collect();
    Ok(features)
}

/// Normalizes each label with the max/min of the window it follows
pub fn normalized_label(
    normalized_method: NormalizationMethod,
    label_list: &[f64],
    price_list: &[Vec<f64>],
) -> Vec<f64> {
    label_list
        .iter()
        .zip(price_list)
        .map(|(label, prices)| {
            normalized_method.normalize(*label, prices[MAX_PRICE_INDEX], prices[MIN_PRICE_INDEX])
        })
        .collect()
}

/// Inverse of `normalized_label` for one value
pub fn de_normalize(normalized_method: NormalizationMethod, value: f64, features: &[f64]) -> f64 {
    normalized_method.de_normalize(value, features[MAX_PRICE_INDEX], features[MIN_PRICE_INDEX])
}

impl BaseClass {
    /// Windowed price features for every feature date, read through the cache
    pub fn handle_stock_price(&self, data_period: usize) -> Result<Vec<Vec<f64>>> {
        let file_name = self.cache_name(&format!("{}_{}", PRICE_FEATURES_FILE, data_period));
        if self.get_data_file_path().is_some() {
            if let Some(features) = self.load_data_from_file::<Vec<Vec<f64>>>(&file_name)? {
                return Ok(features);
            }
        }

        let rows = self.get_ahead_stock_price(data_period.saturating_sub(1))?;
        let features =
            window_price_features(rows, data_period, self.get_price_type(), self.one_day_info)?;
        debug!(
            "Built {} price windows of {} days",
            features.len(),
            data_period
        );
        self.save_data_to_file(&file_name, &features)?;
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::date_parser::parse_date;

    fn rows(prices: &[(f64, f64, f64, f64)]) -> Vec<PriceRecord> {
        let start = parse_date("2016-01-04").unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| PriceRecord {
                date: start + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 0.0,
                adjusted_close: close / 2.0,
            })
            .collect()
    }

    #[test]
    fn test_single_day_window_is_raw_prices() {
        let data = rows(&[(1.0, 2.0, 0.5, 1.5), (1.5, 2.5, 1.0, 2.0), (2.0, 3.0, 1.5, 2.5)]);
        let features = window_price_features(&data, 1, PriceType::Close, false).unwrap();
        assert_eq!(features, vec![vec![1.0, 2.0, 0.5, 1.5], vec![1.5, 2.5, 1.0, 2.0]]);

        let with_latest = window_price_features(&data, 1, PriceType::Close, true).unwrap();
        assert_eq!(with_latest.len(), 3);
        assert_eq!(with_latest[2], vec![2.0, 3.0, 1.5, 2.5]);
    }

    #[test]
    fn test_adjusted_close_rescales_single_day() {
        let data = rows(&[(4.0, 8.0, 2.0, 4.0), (1.0, 1.0, 1.0, 1.0)]);
        let features = window_price_features(&data, 1, PriceType::AdjustedClose, false).unwrap();
        assert_eq!(features, vec![vec![2.0, 4.0, 1.0, 2.0]]);
    }

    #[test]
    fn test_multi_day_window_aggregates() {
        let data = rows(&[
            (1.0, 5.0, 0.5, 2.0),
            (3.0, 4.0, 1.0, 4.0),
            (5.0, 9.0, 2.0, 6.0),
            (7.0, 8.0, 0.1, 8.0),
        ]);
        let features = window_price_features(&data, 3, PriceType::Close, false).unwrap();
        assert_eq!(features, vec![vec![3.0, 9.0, 0.5, 4.0]]);

        let with_latest = window_price_features(&data, 3, PriceType::Close, true).unwrap();
        assert_eq!(with_latest.len(), 2);
        assert_eq!(with_latest[1], vec![5.0, 9.0, 0.1, 6.0]);
    }

    #[test]
    fn test_not_enough_rows_for_window() {
        let data = rows(&[(1.0, 2.0, 0.5, 1.5), (1.5, 2.5, 1.0, 2.0)]);
        assert!(matches!(
            window_price_features(&data, 2, PriceType::Close, false),
            Err(InferenceError::NotEnoughData { .. })
        ));
        assert!(matches!(
            window_price_features(&data, 0, PriceType::Close, false),
            Err(InferenceError::InvalidWindow)
        ));
    }

    #[test]
    fn test_normalized_label_uses_window_bounds() {
        let prices = vec![vec![0.0, 12.0, 8.0, 0.0], vec![0.0, 10.0, 10.0, 0.0]];
        let labels = normalized_label(NormalizationMethod::MinMax, &[11.0, 10.0, 99.0], &prices);
        assert_eq!(labels, vec![0.5, 0.0]);
        assert!((de_normalize(NormalizationMethod::MinMax, 0.5, &prices[0]) - 11.0).abs() < 1e-12);
    }
}
