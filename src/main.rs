// External crates
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// Local modules
use stock_inference::config::PipelineConfig;
use stock_inference::data_collection::IndicatorSpec;
use stock_inference::pipeline::{self, PredictionReport};
use stock_inference::types::{NormalizationMethod, PriceType};
use stock_inference::util::model_logger::create_experiment_dir;

#[derive(Parser, Debug)]
#[command(
    name = "stock_inference",
    version,
    about = "Next-day open/close prediction from windowed stock features"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train close and open models and evaluate them on the held-out tail
    Predict(RunArgs),
    /// Repeat the prediction over several window sizes in parallel
    Experiment {
        #[command(flatten)]
        run: RunArgs,
        /// Window sizes to try, defaults to 3..=8
        #[arg(long, value_delimiter = ',')]
        windows: Vec<usize>,
    },
    /// Write the assembled feature rows to CSV
    Features(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON configuration file; flags below override its fields
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    symbol: Option<String>,

    /// First date, YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,

    /// Last date, YYYY-MM-DD
    #[arg(long)]
    end: Option<String>,

    /// Days per price window
    #[arg(long)]
    window: Option<usize>,

    /// Comma separated, e.g. sma_20,rsi_14,macd
    #[arg(long, value_delimiter = ',')]
    indicators: Option<Vec<IndicatorSpec>>,

    /// Comma separated keys, e.g. HSI,US10Y_BOND
    #[arg(long, value_delimiter = ',')]
    fundamentals: Option<Vec<String>>,

    /// close, open or adj_close
    #[arg(long)]
    price_type: Option<PriceType>,

    /// none, min_max or sigmoid
    #[arg(long)]
    normalization: Option<NormalizationMethod>,

    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    data_dir: Option<PathBuf>,

    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    fundamental_dir: Option<PathBuf>,

    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    cache_dir: Option<PathBuf>,

    /// Rebuild every feature instead of reading the cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Also forecast the day after the end date
    #[arg(long, default_value_t = false)]
    latest: bool,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    step: Option<f64>,

    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    output_dir: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(symbol) = self.symbol {
            config.symbol = symbol;
        }
        if let Some(start) = self.start {
            config.start_date = start;
        }
        if let Some(end) = self.end {
            config.end_date = end;
        }
        if let Some(window) = self.window {
            config.required_info.data_period = window;
        }
        if let Some(indicators) = self.indicators {
            config.required_info.indicators = indicators;
        }
        if let Some(fundamentals) = self.fundamentals {
            config.required_info.fundamentals = fundamentals;
        }
        if let Some(price_type) = self.price_type {
            config.price_type = price_type;
        }
        if let Some(normalization) = self.normalization {
            config.normalization = normalization;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.fundamental_dir {
            config.fundamental_dir = Some(dir);
        }
        if let Some(dir) = self.cache_dir {
            config.cache_dir = Some(dir);
        }
        if self.no_cache {
            config.cache_dir = None;
        }
        if self.latest {
            config.one_day_info = true;
        }
        if let Some(iterations) = self.iterations {
            config.regression.iterations = iterations;
        }
        if let Some(step) = self.step {
            config.regression.step = step;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_report(report: &PredictionReport) {
    println!("{} with {} day window", report.symbol, report.data_period);
    for result in &report.results {
        println!(
            "  {:<5} MSE {:>12.6}  MAD {:>10.6}  MAPE {:>7.3}%  ({} test rows)",
            result.label.as_str(),
            result.report.mse,
            result.report.mad,
            result.report.mape * 100.0,
            result.report.count
        );
        if let Some((date, price)) = result.next_day {
            println!("        forecast for {}: {:.4}", date, price);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict(args) => {
            let config = args.into_config()?;
            let report = pipeline::run_prediction(&config)?;
            print_report(&report);
        }
        Commands::Experiment { run, windows } => {
            let mut config = run.into_config()?;
            config.output_dir = create_experiment_dir(&config.output_dir)?;
            let reports = pipeline::run_window_experiment(&config, &windows)?;
            for report in &reports {
                print_report(report);
            }
            println!("Results saved under {}", config.output_dir.display());
        }
        Commands::Features(args) => {
            let config = args.into_config()?;
            let path = pipeline::dump_features(&config)?;
            println!("Features written to {}", path.display());
        }
    }
    Ok(())
}
