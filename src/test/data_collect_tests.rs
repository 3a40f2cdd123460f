#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};
    use tempfile::{tempdir, TempDir};

    use crate::data_collection::{
        split_train_test, CsvPriceSource, DataCollect, FundamentalSource, IndicatorSpec,
        RequiredInfo,
    };
    use crate::error::InferenceError;
    use crate::types::{LabelInfo, NormalizationMethod, PriceRecord};
    use crate::util::date_parser::parse_date;
    use crate::util::test_utils::{write_series_csv, write_symbol_file};

    const SYMBOL: &str = "TEST";

    fn setup(seed: u64) -> (TempDir, Vec<PriceRecord>) {
        let dir = tempdir().unwrap();
        let (_, records) =
            write_symbol_file(dir.path(), SYMBOL, parse_date("2015-01-05").unwrap(), 200, seed)
                .unwrap();
        (dir, records)
    }

    fn window(period: usize) -> RequiredInfo {
        RequiredInfo {
            data_period: period,
            ..RequiredInfo::default()
        }
    }

    fn range(records: &[PriceRecord]) -> (NaiveDate, NaiveDate) {
        (records[40].date, records[150].date)
    }

    #[test]
    fn test_rows_align_with_next_day_labels() {
        let (dir, records) = setup(11);
        let (start, end) = range(&records);
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));

        let data = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(3),
            )
            .unwrap();

        assert_eq!(data.points.len(), 111);
        assert!(data.latest.is_none());
        assert_eq!(data.points[0].date, records[40].date);
        assert_eq!(data.points[110].date, records[150].date);
        assert_eq!(data.feature_names.len(), 4);

        for (i, point) in data.points.iter().enumerate() {
            let window = &records[38 + i..=40 + i];
            let open_avg = window.iter().map(|r| r.open).sum::<f64>() / 3.0;
            let max_high = window.iter().map(|r| r.high).fold(f64::MIN, f64::max);
            assert!((point.features[0] - open_avg).abs() < 1e-9);
            assert!((point.features[1] - max_high).abs() < 1e-9);

            let real = NormalizationMethod::MinMax.de_normalize(
                point.label,
                point.features[1],
                point.features[2],
            );
            assert!((real - records[41 + i].close).abs() < 1e-6);
            assert_eq!(point.real, records[41 + i].close);
        }
    }

    #[test]
    fn test_sigmoid_keeps_raw_next_day_price() {
        let (dir, records) = setup(18);
        let (start, end) = range(&records);
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));

        let data = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::Sigmoid,
                &window(3),
            )
            .unwrap();

        for (i, point) in data.points.iter().enumerate() {
            assert!(point.label > 0.0 && point.label < 1.0);
            assert_eq!(point.real, records[41 + i].close);
        }
    }

    #[test]
    fn test_weekend_end_date_reuses_loaded_prices() {
        let (dir, records) = setup(19);
        let friday = (140..190)
            .find(|&i| records[i].date.weekday() == Weekday::Fri)
            .unwrap();
        let saturday = records[friday].date.succ_opt().unwrap();
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));

        let request = |collector: &mut DataCollect<CsvPriceSource>| {
            collector
                .get_all_required_data(
                    SYMBOL,
                    records[40].date,
                    saturday,
                    LabelInfo::Close,
                    NormalizationMethod::MinMax,
                    &window(2),
                )
                .unwrap()
        };
        let first = request(&mut collector);
        // The end moves forward to Monday
        assert_eq!(first.points.last().unwrap().date, records[friday + 1].date);

        // Prices on disk change, the loaded range does not
        write_symbol_file(dir.path(), SYMBOL, parse_date("2015-01-05").unwrap(), 200, 98).unwrap();
        let second = request(&mut collector);
        assert_eq!(first.points, second.points);
    }

    #[test]
    fn test_open_label_uses_next_open() {
        let (dir, records) = setup(12);
        let (start, end) = range(&records);
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));

        let data = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Open,
                NormalizationMethod::None,
                &window(1),
            )
            .unwrap();

        assert_eq!(data.points.len(), 111);
        assert_eq!(data.points[0].label, records[41].open);
        assert_eq!(data.points[5].features[3], records[45].close);
    }

    #[test]
    fn test_one_day_info_adds_latest_window() {
        let (dir, records) = setup(13);
        let (start, end) = range(&records);
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));
        collector.set_one_day_info(true);

        let data = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(3),
            )
            .unwrap();

        assert_eq!(data.points.len(), 111);
        let (date, features) = data.latest.unwrap();
        assert_eq!(date, records[151].date);
        let close_avg = records[149..=151].iter().map(|r| r.close).sum::<f64>() / 3.0;
        assert!((features[3] - close_avg).abs() < 1e-9);
    }

    #[test]
    fn test_indicator_and_fundamental_columns() {
        let (dir, records) = setup(14);
        let (start, end) = range(&records);
        let fundamental_dir = dir.path().join("fundamental");
        std::fs::create_dir_all(&fundamental_dir).unwrap();
        let hsi: Vec<(NaiveDate, f64)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.date, 20000.0 + i as f64))
            .collect();
        write_series_csv(&fundamental_dir.join("HSI.csv"), &hsi).unwrap();

        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()))
            .with_fundamental_source(FundamentalSource::new(&fundamental_dir));
        let required_info = RequiredInfo {
            data_period: 2,
            indicators: vec![
                "sma_5".parse::<IndicatorSpec>().unwrap(),
                "rsi_14".parse::<IndicatorSpec>().unwrap(),
            ],
            fundamentals: vec!["HSI".to_string(), "IA".to_string()],
        };

        let data = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &required_info,
            )
            .unwrap();

        assert_eq!(
            data.feature_names,
            vec!["open_avg", "max_high", "min_low", "close_avg", "sma_5", "rsi_14", "HSI", "IA"]
        );
        let first = &data.points[0].features;
        assert_eq!(first.len(), 8);
        let sma = records[36..=40].iter().map(|r| r.close).sum::<f64>() / 5.0;
        assert!((first[4] - sma).abs() < 1e-6);
        assert!(first[5] > 0.0 && first[5] < 100.0);
        assert_eq!(first[6], 20040.0);
        assert_eq!(first[7], 0.0);
        assert_eq!(data.points[110].features[6], 20150.0);
    }

    #[test]
    fn test_cached_features_are_reused() {
        let (dir, records) = setup(15);
        let (start, end) = range(&records);
        let cache_dir = dir.path().join("cache");

        let mut collector =
            DataCollect::new(CsvPriceSource::new(dir.path())).with_cache(&cache_dir);
        let first = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(4),
            )
            .unwrap();

        let folder = format!(
            "{}_{}_{}",
            SYMBOL,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        );
        assert!(cache_dir
            .join(folder)
            .join("close")
            .join("price_features_4.dat")
            .is_file());

        // Different prices on disk, same cached windows
        write_symbol_file(dir.path(), SYMBOL, parse_date("2015-01-05").unwrap(), 200, 99).unwrap();
        let mut collector =
            DataCollect::new(CsvPriceSource::new(dir.path())).with_cache(&cache_dir);
        let second = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(4),
            )
            .unwrap();

        let features = |points: &[crate::types::LabeledPoint]| {
            points.iter().map(|p| p.features.clone()).collect::<Vec<_>>()
        };
        assert_eq!(features(&first.points), features(&second.points));
    }

    #[test]
    fn test_invalid_requests() {
        let (dir, records) = setup(16);
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));

        assert!(matches!(
            collector.get_all_required_data(
                SYMBOL,
                records[100].date,
                records[50].date,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(1),
            ),
            Err(InferenceError::InvalidDateRange { .. })
        ));

        // Window reaches further back than the loaded history
        assert!(matches!(
            collector.get_all_required_data(
                SYMBOL,
                records[2].date,
                records[50].date,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(10),
            ),
            Err(InferenceError::NotEnoughData { .. })
        ));

        assert!(matches!(
            collector.get_all_required_data(
                "MISSING",
                records[10].date,
                records[50].date,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(1),
            ),
            Err(InferenceError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_split_is_chronological() {
        let (dir, records) = setup(17);
        let (start, end) = range(&records);
        let mut collector = DataCollect::new(CsvPriceSource::new(dir.path()));
        let data = collector
            .get_all_required_data(
                SYMBOL,
                start,
                end,
                LabelInfo::Close,
                NormalizationMethod::MinMax,
                &window(1),
            )
            .unwrap();

        let (train, test) = split_train_test(&data.points, 0.8);
        assert_eq!(train.len(), 88);
        assert_eq!(test.len(), 23);
        assert!(train.last().unwrap().date < test[0].date);
    }
}
