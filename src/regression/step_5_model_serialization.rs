use anyhow::{Context, Result};
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::step_1_tensor_preparation::FeatureScaler;
use super::step_2_model_arch::LinearRegression;
use crate::build_info;
use crate::constants::MODEL_FILE_NAME;
use crate::types::{LabelInfo, NormalizationMethod};

/// Everything needed to rebuild and feed a saved model
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub rustc_version: String,
    pub timestamp: u64,
    pub symbol: String,
    pub label: LabelInfo,
    pub normalization: NormalizationMethod,
    pub data_period: usize,
    pub intercept: bool,
    pub feature_names: Vec<String>,
    pub scaler: FeatureScaler,
}

impl ModelMetadata {
    pub fn new(
        symbol: &str,
        label: LabelInfo,
        normalization: NormalizationMethod,
        data_period: usize,
        intercept: bool,
        feature_names: Vec<String>,
        scaler: FeatureScaler,
    ) -> Self {
        Self {
            version: build_info::PKG_VERSION.to_string(),
            rustc_version: build_info::RUSTC_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            symbol: symbol.to_string(),
            label,
            normalization,
            data_period,
            intercept,
            feature_names,
            scaler,
        }
    }
}

/// Folder for one symbol's models
pub fn get_model_path(model_dir: &Path, symbol: &str) -> PathBuf {
    model_dir.join(symbol)
}

/// Base file name for a symbol's model per label and window, without dots so extensions stay intact
pub fn model_file_name(symbol: &str, label: LabelInfo, data_period: usize) -> String {
    let symbol: String = symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("{}_{}_w{}{}", symbol, label, data_period, MODEL_FILE_NAME)
}

/// Save the model weights as `.bin` and the metadata as `.meta.json`
pub fn save_model_with_metadata<B: Backend>(
    model: &LinearRegression<B>,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create model parent directory")?;
    }
    let model_path = path.with_extension("bin");
    model
        .clone()
        .save_file::<BinFileRecorder<FullPrecisionSettings>, _>(&model_path, &Default::default())
        .context("Failed to save model")?;

    let metadata_path = path.with_extension("meta.json");
    let metadata_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(&metadata_path, metadata_json).context("Failed to write metadata file")?;
    Ok(model_path)
}

/// Load a model saved by `save_model_with_metadata`
pub fn load_model_with_metadata<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(LinearRegression<B>, ModelMetadata)> {
    let path = path.as_ref();
    let metadata_path = path.with_extension("meta.json");
    let metadata_json = std::fs::read_to_string(&metadata_path)
        .with_context(|| format!("Failed to read {}", metadata_path.display()))?;
    let metadata: ModelMetadata =
        serde_json::from_str(&metadata_json).context("Failed to parse model metadata")?;

    let model = LinearRegression::<B>::new(metadata.scaler.width(), metadata.intercept, device)
        .load_file::<BinFileRecorder<FullPrecisionSettings>, _>(
            path.with_extension("bin"),
            &Default::default(),
            device,
        )
        .context("Failed to load model")?;
    Ok((model, metadata))
}
