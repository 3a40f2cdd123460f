// External imports
use anyhow::{anyhow, Result};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

// Internal imports
use super::step_1_tensor_preparation::{features_to_tensor, points_to_tensors, FeatureScaler};
use super::step_2_model_arch::LinearRegression;
use crate::types::LabeledPoint;

fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f64>> {
    let data = tensor.into_data().convert::<f32>();
    let values = data
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Failed to read predictions: {:?}", e))?;
    Ok(values.into_iter().map(f64::from).collect())
}

/// Predicted (normalized) labels for each point
pub fn predict<B: Backend>(
    model: &LinearRegression<B>,
    scaler: &FeatureScaler,
    points: &[LabeledPoint],
    device: &B::Device,
) -> Result<Vec<f64>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }
    let (features, _) = points_to_tensors::<B>(points, scaler, device)?;
    tensor_to_vec(model.forward(features))
}

/// Prediction for one unlabelled feature row
pub fn predict_one<B: Backend>(
    model: &LinearRegression<B>,
    scaler: &FeatureScaler,
    features: &[f64],
    device: &B::Device,
) -> Result<f64> {
    let x = features_to_tensor::<B>(features, scaler, device);
    tensor_to_vec(model.forward(x))?
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Model returned no prediction"))
}
