// External imports
use anyhow::{bail, Result};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

// Internal imports
use crate::constants::MIN_MAX_EPSILON;
use crate::types::LabeledPoint;

/// Per-column scaling of features onto [-1, 1], fitted on the training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl FeatureScaler {
    pub fn fit(points: &[LabeledPoint]) -> Result<Self> {
        let Some(first) = points.first() else {
            bail!("Cannot fit a scaler on an empty data set");
        };
        let width = first.features.len();
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];
        for p in points {
            if p.features.len() != width {
                bail!(
                    "Inconsistent feature width: expected {}, found {}",
                    width,
                    p.features.len()
                );
            }
            for (i, v) in p.features.iter().enumerate() {
                min[i] = min[i].min(*v);
                max[i] = max[i].max(*v);
            }
        }
        Ok(Self { min, max })
    }

    /// Constant columns map to 0
    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .map(|(v, (min, max))| {
                let range = max - min;
                if range.abs() < MIN_MAX_EPSILON {
                    0.0
                } else {
                    (2.0 * v - min - max) / range
                }
            })
            .collect()
    }

    pub fn width(&self) -> usize {
        self.min.len()
    }
}

/// Flattened feature matrix in row-major order
pub fn feature_matrix(points: &[LabeledPoint], scaler: &FeatureScaler) -> Vec<f32> {
    points
        .iter()
        .flat_map(|p| scaler.transform(&p.features))
        .map(|v| v as f32)
        .collect()
}

/// Features `[n, width]` and labels `[n, 1]`
pub fn points_to_tensors<B: Backend>(
    points: &[LabeledPoint],
    scaler: &FeatureScaler,
    device: &B::Device,
) -> Result<(Tensor<B, 2>, Tensor<B, 2>)> {
    if points.is_empty() {
        bail!("No labelled points to convert");
    }
    let n = points.len();
    let width = scaler.width();
    let features = feature_matrix(points, scaler);
    let labels: Vec<f32> = points.iter().map(|p| p.label as f32).collect();

    let x = Tensor::<B, 1>::from_floats(features.as_slice(), device).reshape([n, width]);
    let y = Tensor::<B, 1>::from_floats(labels.as_slice(), device).reshape([n, 1]);
    Ok((x, y))
}

/// Single unlabelled row as `[1, width]`
pub fn features_to_tensor<B: Backend>(
    features: &[f64],
    scaler: &FeatureScaler,
    device: &B::Device,
) -> Tensor<B, 2> {
    let row: Vec<f32> = scaler
        .transform(features)
        .into_iter()
        .map(|v| v as f32)
        .collect();
    Tensor::<B, 1>::from_floats(row.as_slice(), device).reshape([1, scaler.width()])
}
