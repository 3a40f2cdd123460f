// External crates
use anyhow::{bail, Context, Result};
use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

// Local modules
use crate::config::PipelineConfig;
use crate::constants::EXPERIMENT_WINDOWS;
use crate::data_collection::handle_stock_price::de_normalize;
use crate::data_collection::{
    split_train_test, CollectedData, CsvPriceSource, DataCollect, FundamentalSource,
};
use crate::evaluation::EvaluationReport;
use crate::regression::{
    get_model_path, model_file_name, predict, predict_one, save_model_with_metadata,
    train_linear_regression_with_sgd, ModelMetadata,
};
use crate::types::LabelInfo;
use crate::util::date_parser::get_ahead_date;
use crate::util::file_utils::{labeled_points_to_dataframe, write_dataframe_csv, write_predictions_csv};
use crate::util::model_logger::ModelExperiment;

pub type InferenceBackend = NdArray<f32>;
pub type TrainingBackend = Autodiff<InferenceBackend>;

/// Outcome of training and testing one label
#[derive(Debug, Clone)]
pub struct LabelResult {
    pub label: LabelInfo,
    pub report: EvaluationReport,
    /// `(date, real, predicted)` in price units
    pub predictions: Vec<(NaiveDate, f64, f64)>,
    /// Forecast for the business day after the last loaded row
    pub next_day: Option<(NaiveDate, f64)>,
    pub model_path: PathBuf,
    pub experiment_path: PathBuf,
}

/// Results of one run over both labels
#[derive(Debug, Clone)]
pub struct PredictionReport {
    pub symbol: String,
    pub data_period: usize,
    pub results: Vec<LabelResult>,
}

impl PredictionReport {
    pub fn result(&self, label: LabelInfo) -> Option<&LabelResult> {
        self.results.iter().find(|r| r.label == label)
    }
}

fn file_stem(config: &PipelineConfig) -> String {
    config
        .symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn build_collector(config: &PipelineConfig) -> DataCollect<CsvPriceSource> {
    let mut collector = DataCollect::new(CsvPriceSource::new(&config.data_dir))
        .with_holidays(config.holidays.clone());
    if let Some(dir) = &config.fundamental_dir {
        collector = collector.with_fundamental_source(FundamentalSource::new(dir));
    }
    if let Some(dir) = &config.cache_dir {
        collector = collector.with_cache(dir);
    }
    collector.set_price_type(Some(config.price_type));
    collector.set_one_day_info(config.one_day_info);
    collector
}

/// Collects labelled rows for every label the run trains
fn collect_all(config: &PipelineConfig) -> Result<Vec<(LabelInfo, CollectedData)>> {
    let (start, end) = config.date_range()?;
    let mut collector = build_collector(config);
    [LabelInfo::Close, LabelInfo::Open]
        .into_iter()
        .map(|label| {
            let data = collector
                .get_all_required_data(
                    &config.symbol,
                    start,
                    end,
                    label,
                    config.normalization,
                    &config.required_info,
                )
                .with_context(|| format!("Failed to collect {} data for {}", label, config.symbol))?;
            Ok((label, data))
        })
        .collect()
}

fn run_label(
    config: &PipelineConfig,
    label: LabelInfo,
    data: CollectedData,
) -> Result<LabelResult> {
    let device = NdArrayDevice::default();
    let method = config.normalization;
    let (train, test) = split_train_test(&data.points, config.train_ratio);
    if train.is_empty() || test.is_empty() {
        bail!(
            "Cannot split {} rows into train and test sets with ratio {}",
            data.points.len(),
            config.train_ratio
        );
    }
    info!(
        "Training {} model for {} on {} rows, testing on {}",
        label,
        config.symbol,
        train.len(),
        test.len()
    );

    let started = Instant::now();
    let trained =
        train_linear_regression_with_sgd::<TrainingBackend>(&train, &config.regression, &device)?;
    let elapsed = started.elapsed().as_secs_f64();

    let predicted = predict::<InferenceBackend>(&trained.model, &trained.scaler, &test, &device)?;
    let predictions: Vec<(NaiveDate, f64, f64)> = test
        .iter()
        .zip(&predicted)
        .map(|(point, value)| {
            (
                point.date,
                point.real,
                de_normalize(method, *value, &point.features),
            )
        })
        .collect();
    let pairs: Vec<(f64, f64)> = predictions.iter().map(|(_, r, p)| (*r, *p)).collect();
    let report = EvaluationReport::from_pairs(&pairs)?;
    info!(
        "{} {} w{}: MSE {:.6}, MAD {:.6}, MAPE {:.4}%",
        config.symbol,
        label,
        config.required_info.data_period,
        report.mse,
        report.mad,
        report.mape * 100.0
    );

    let stem = file_stem(config);
    let predictions_path = config.output_dir.join(format!(
        "{}_{}_w{}_predictions.csv",
        stem, label, config.required_info.data_period
    ));
    write_predictions_csv(&predictions_path, &predictions)?;

    let metadata = ModelMetadata::new(
        &config.symbol,
        label,
        method,
        config.required_info.data_period,
        config.regression.intercept,
        data.feature_names.clone(),
        trained.scaler.clone(),
    );
    let model_path = get_model_path(&config.model_dir, &stem).join(model_file_name(
        &config.symbol,
        label,
        config.required_info.data_period,
    ));
    let model_path = save_model_with_metadata(&trained.model, &metadata, model_path)?;

    let next_day = match &data.latest {
        Some((date, features)) => {
            let value = predict_one::<InferenceBackend>(&trained.model, &trained.scaler, features, &device)?;
            let target = get_ahead_date(*date, 1, &config.holidays);
            let price = de_normalize(method, value, features);
            info!("{} {} forecast for {}: {:.4}", config.symbol, label, target, price);
            Some((target, price))
        }
        None => None,
    };

    let mut experiment = ModelExperiment::new(
        &config.symbol,
        label,
        config.price_type,
        method,
        config.required_info.data_period,
        data.feature_names,
        config.regression.step,
        config.regression.iterations,
    );
    experiment.set_sizes(train.len(), test.len());
    experiment.set_report(report);
    experiment.set_training_time(elapsed);
    experiment.next_day_prediction = next_day.map(|(_, price)| price);
    if let Some(loss) = trained.loss_history.last() {
        experiment.add_note(&format!("final training loss {:.6}", loss));
    }
    let experiment_path = experiment.save(&config.output_dir)?;

    Ok(LabelResult {
        label,
        report,
        predictions,
        next_day,
        model_path,
        experiment_path,
    })
}

/// Trains and tests the close and open models for one configuration
pub fn run_prediction(config: &PipelineConfig) -> Result<PredictionReport> {
    config.validate()?;
    let results = collect_all(config)?
        .into_iter()
        .map(|(label, data)| run_label(config, label, data))
        .collect::<Result<Vec<_>>>()?;
    Ok(PredictionReport {
        symbol: config.symbol.clone(),
        data_period: config.required_info.data_period,
        results,
    })
}

/// Runs `run_prediction` once per window size, in parallel
///
/// Results come back ordered by window size.
pub fn run_window_experiment(
    config: &PipelineConfig,
    windows: &[usize],
) -> Result<Vec<PredictionReport>> {
    let windows: Vec<usize> = if windows.is_empty() {
        EXPERIMENT_WINDOWS.collect()
    } else {
        windows.to_vec()
    };
    info!("Running window experiment over {:?}", windows);

    let mut reports = windows
        .par_iter()
        .map(|&window| {
            let mut run_config = config.clone();
            run_config.required_info.data_period = window;
            run_prediction(&run_config).with_context(|| format!("Window {} failed", window))
        })
        .collect::<Result<Vec<_>>>()?;
    reports.sort_by_key(|r| r.data_period);

    let mut summary = window_summary_dataframe(&reports)?;
    write_dataframe_csv(
        config.output_dir.join(format!("{}_window_summary.csv", file_stem(config))),
        &mut summary,
    )?;
    Ok(reports)
}

/// One row per window and label with the error measures
pub fn window_summary_dataframe(reports: &[PredictionReport]) -> Result<DataFrame> {
    let rows: Vec<(usize, &LabelResult)> = reports
        .iter()
        .flat_map(|r| r.results.iter().map(move |l| (r.data_period, l)))
        .collect();
    let df = df!(
        "window" => rows.iter().map(|(w, _)| *w as u32).collect::<Vec<_>>(),
        "label" => rows.iter().map(|(_, l)| l.label.as_str()).collect::<Vec<_>>(),
        "mse" => rows.iter().map(|(_, l)| l.report.mse).collect::<Vec<_>>(),
        "mad" => rows.iter().map(|(_, l)| l.report.mad).collect::<Vec<_>>(),
        "mape" => rows.iter().map(|(_, l)| l.report.mape).collect::<Vec<_>>()
    )?;
    Ok(df)
}

/// Writes the assembled close-label rows to `{output_dir}/{symbol}_w{p}_features.csv`
pub fn dump_features(config: &PipelineConfig) -> Result<PathBuf> {
    config.validate()?;
    let (start, end) = config.date_range()?;
    let mut collector = build_collector(config);
    let data = collector.get_all_required_data(
        &config.symbol,
        start,
        end,
        LabelInfo::Close,
        config.normalization,
        &config.required_info,
    )?;
    if data.points.is_empty() {
        warn!("No rows assembled for {}", config.symbol);
    }
    let path = config.output_dir.join(format!(
        "{}_w{}_features.csv",
        file_stem(config),
        config.required_info.data_period
    ));
    let mut df = labeled_points_to_dataframe(&data.points, &data.feature_names)?;
    write_dataframe_csv(&path, &mut df)?;
    info!("Wrote {} feature rows to {}", df.height(), path.display());
    Ok(path)
}

