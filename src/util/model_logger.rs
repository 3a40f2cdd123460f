use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::evaluation::EvaluationReport;
use crate::types::{LabelInfo, NormalizationMethod, PriceType};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModelExperiment {
    pub timestamp: String,
    pub symbol: String,
    pub label: LabelInfo,
    pub price_type: PriceType,
    pub normalization: NormalizationMethod,
    pub data_period: usize,
    pub features: Vec<String>,
    pub step: f64,
    pub iterations: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub report: Option<EvaluationReport>,
    pub next_day_prediction: Option<f64>,
    pub training_time_seconds: Option<f64>,
    pub notes: String,
}

impl ModelExperiment {
    pub fn new(
        symbol: &str,
        label: LabelInfo,
        price_type: PriceType,
        normalization: NormalizationMethod,
        data_period: usize,
        features: Vec<String>,
        step: f64,
        iterations: usize,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            symbol: symbol.to_string(),
            label,
            price_type,
            normalization,
            data_period,
            features,
            step,
            iterations,
            train_size: 0,
            test_size: 0,
            report: None,
            next_day_prediction: None,
            training_time_seconds: None,
            notes: String::new(),
        }
    }

    pub fn set_sizes(&mut self, train_size: usize, test_size: usize) {
        self.train_size = train_size;
        self.test_size = test_size;
    }

    pub fn set_report(&mut self, report: EvaluationReport) {
        self.report = Some(report);
    }

    pub fn set_training_time(&mut self, seconds: f64) {
        self.training_time_seconds = Some(seconds);
    }

    pub fn add_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    pub fn file_name(&self) -> String {
        let symbol: String = self
            .symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        format!(
            "{}_{}_{}_w{}_experiment.json",
            symbol, self.label, self.price_type, self.data_period
        )
    }

    pub fn save(&self, experiment_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(experiment_dir)?;
        let file_path = experiment_dir.join(self.file_name());

        let json = serde_json::to_string_pretty(&self)?;
        let mut file = fs::File::create(&file_path)?;
        file.write_all(json.as_bytes())?;

        Ok(file_path)
    }
}

/// Timestamped folder for one run's outputs
pub fn create_experiment_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(Local::now().format("%Y%m%d_%H%M%S").to_string());
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_experiment_saved_as_json() -> Result<()> {
        let dir = tempdir()?;
        let mut experiment = ModelExperiment::new(
            "0001.HK",
            LabelInfo::Open,
            PriceType::Close,
            NormalizationMethod::MinMax,
            5,
            vec!["open_avg".to_string()],
            0.0001,
            1000,
        );
        experiment.set_sizes(80, 20);
        experiment.add_note("first");
        experiment.add_note("second");

        let path = experiment.save(dir.path())?;
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("0001HK_open_close_w5_experiment.json")
        );
        let loaded: ModelExperiment = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(loaded.train_size, 80);
        assert_eq!(loaded.notes, "first\nsecond");
        Ok(())
    }
}
