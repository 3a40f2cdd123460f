#[cfg(test)]
mod tests {
    use burn_ndarray::NdArrayDevice;
    use tempfile::{tempdir, TempDir};

    use crate::config::PipelineConfig;
    use crate::data_collection::handle_stock_price::de_normalize;
    use crate::data_collection::{split_train_test, CsvPriceSource, DataCollect};
    use crate::pipeline::{dump_features, run_prediction, run_window_experiment, InferenceBackend};
    use crate::regression::{load_model_with_metadata, predict};
    use crate::types::{LabelInfo, NormalizationMethod, PriceRecord};
    use crate::util::date_parser::{date_key, parse_date};
    use crate::util::test_utils::write_symbol_file;

    fn setup(window: usize) -> (TempDir, Vec<PriceRecord>, PipelineConfig) {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let (_, records) =
            write_symbol_file(&data_dir, "0005.HK", parse_date("2014-06-02").unwrap(), 220, 21)
                .unwrap();

        let mut config = PipelineConfig {
            symbol: "0005.HK".to_string(),
            start_date: date_key(records[40].date),
            end_date: date_key(records[150].date),
            data_dir,
            cache_dir: Some(dir.path().join("cache")),
            model_dir: dir.path().join("models"),
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        config.required_info.data_period = window;
        config.regression.iterations = 60;
        config.regression.step = 0.2;
        (dir, records, config)
    }

    #[test]
    fn test_run_prediction_trains_both_labels() {
        let (_dir, records, mut config) = setup(3);
        config.one_day_info = true;

        let report = run_prediction(&config).unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.data_period, 3);

        let close = report.result(LabelInfo::Close).unwrap();
        assert_eq!(close.report.count, 23);
        assert_eq!(close.predictions.len(), 23);
        assert!(close.report.mse.is_finite());
        // Next-day moves are within a few percent of the window
        assert!(close.report.mape < 0.1, "MAPE {}", close.report.mape);
        for (i, (date, real, _)) in close.predictions.iter().enumerate() {
            assert_eq!(*date, records[128 + i].date);
            assert!((real - records[129 + i].close).abs() < 1e-6);
        }

        let (forecast_date, forecast) = close.next_day.unwrap();
        assert_eq!(forecast_date, records[152].date);
        assert!((forecast - records[151].close).abs() / records[151].close < 0.1);

        let open = report.result(LabelInfo::Open).unwrap();
        assert!((open.predictions[0].1 - records[129].open).abs() < 1e-6);

        assert!(close.experiment_path.is_file());
        assert!(config
            .output_dir
            .join("0005HK_close_w3_predictions.csv")
            .is_file());
        assert!(config
            .output_dir
            .join("0005HK_open_w3_predictions.csv")
            .is_file());
    }

    #[test]
    fn test_saved_model_reproduces_predictions() {
        let (_dir, _records, config) = setup(2);
        let report = run_prediction(&config).unwrap();
        let close = report.result(LabelInfo::Close).unwrap();
        assert!(close.next_day.is_none());
        assert!(close.model_path.is_file());
        assert!(close
            .model_path
            .ends_with("0005HK/0005HK_close_w2_linear_regression.bin"));

        let device = NdArrayDevice::default();
        let (model, metadata) =
            load_model_with_metadata::<InferenceBackend>(&close.model_path, &device).unwrap();
        assert_eq!(metadata.symbol, "0005.HK");
        assert_eq!(metadata.label, LabelInfo::Close);
        assert_eq!(metadata.data_period, 2);
        assert_eq!(metadata.normalization, NormalizationMethod::MinMax);
        assert_eq!(metadata.feature_names.len(), 4);

        let (start, end) = config.date_range().unwrap();
        let mut collector = DataCollect::new(CsvPriceSource::new(&config.data_dir));
        let data = collector
            .get_all_required_data(
                &config.symbol,
                start,
                end,
                LabelInfo::Close,
                metadata.normalization,
                &config.required_info,
            )
            .unwrap();
        let (_, test) = split_train_test(&data.points, config.train_ratio);
        let predicted = predict::<InferenceBackend>(&model, &metadata.scaler, &test, &device).unwrap();

        assert_eq!(predicted.len(), close.predictions.len());
        for ((point, value), (date, _, saved)) in test.iter().zip(predicted).zip(&close.predictions) {
            assert_eq!(point.date, *date);
            let price = de_normalize(metadata.normalization, value, &point.features);
            assert!((price - saved).abs() < 1e-6);
        }
    }

    #[test]
    fn test_window_experiment_writes_summary() {
        let (_dir, _records, config) = setup(1);
        let reports = run_window_experiment(&config, &[4, 2]).unwrap();

        assert_eq!(
            reports.iter().map(|r| r.data_period).collect::<Vec<_>>(),
            vec![2, 4]
        );
        let summary = std::fs::read_to_string(config.output_dir.join("0005HK_window_summary.csv"))
            .unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "window,label,mse,mad,mape");
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("2,close,"));
        let device = NdArrayDevice::default();
        let mut model_paths = Vec::new();
        for report in &reports {
            for result in &report.results {
                assert!(result.experiment_path.is_file());
                let name = result.experiment_path.file_name().unwrap().to_string_lossy();
                assert!(name.contains(&format!("_w{}_", report.data_period)));

                let (_, metadata) =
                    load_model_with_metadata::<InferenceBackend>(&result.model_path, &device)
                        .unwrap();
                assert_eq!(metadata.data_period, report.data_period);
                assert_eq!(metadata.label, result.label);
                assert_eq!(metadata.feature_names.len(), 4);
                model_paths.push(result.model_path.clone());
            }
        }
        model_paths.sort();
        model_paths.dedup();
        assert_eq!(model_paths.len(), 4);
    }

    #[test]
    fn test_sigmoid_run_reports_real_prices() {
        let (_dir, records, mut config) = setup(3);
        config.normalization = NormalizationMethod::Sigmoid;

        let report = run_prediction(&config).unwrap();
        let close = report.result(LabelInfo::Close).unwrap();
        assert_eq!(close.predictions.len(), 23);
        assert!(close.report.mse.is_finite());
        for (i, (date, real, predicted)) in close.predictions.iter().enumerate() {
            assert_eq!(*date, records[128 + i].date);
            assert_eq!(*real, records[129 + i].close);
            assert!(predicted.is_finite());
        }

        let open = report.result(LabelInfo::Open).unwrap();
        assert_eq!(open.predictions[0].1, records[129].open);

        let device = NdArrayDevice::default();
        let (_, metadata) =
            load_model_with_metadata::<InferenceBackend>(&close.model_path, &device).unwrap();
        assert_eq!(metadata.normalization, NormalizationMethod::Sigmoid);
    }

    #[test]
    fn test_dump_features_csv() {
        let (_dir, _records, mut config) = setup(5);
        config.required_info.indicators = vec!["ema_10".parse().unwrap()];

        let path = dump_features(&config).unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        let mut lines = body.lines();
        assert_eq!(
            lines.next(),
            Some("date,open_avg,max_high,min_low,close_avg,ema_10,label")
        );
        assert_eq!(lines.count(), 111);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let (_dir, _records, mut config) = setup(3);
        config.required_info.data_period = 0;
        assert!(run_prediction(&config).is_err());

        let (_dir, _records, mut config) = setup(3);
        config.train_ratio = 1.0;
        assert!(run_prediction(&config).is_err());
    }
}
