// External imports
use anyhow::{bail, Result};
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_1_tensor_preparation::{points_to_tensors, FeatureScaler};
use super::step_2_model_arch::LinearRegression;
use crate::constants::{SGD_ITERATIONS, SGD_MINI_BATCH_FRACTION, SGD_STEP};
use crate::types::LabeledPoint;

/// Configuration for linear regression trained with SGD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Initial step size; iteration `t` uses `step / sqrt(t)`
    pub step: f64,
    pub iterations: usize,
    /// Share of rows sampled for each gradient step
    pub mini_batch_fraction: f64,
    pub intercept: bool,
    pub seed: u64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            step: SGD_STEP,
            iterations: SGD_ITERATIONS,
            mini_batch_fraction: SGD_MINI_BATCH_FRACTION,
            intercept: false,
            seed: 42,
        }
    }
}

/// A fitted model with the scaler its inputs need
pub struct TrainedRegression<B: AutodiffBackend> {
    pub model: LinearRegression<B::InnerBackend>,
    pub scaler: FeatureScaler,
    pub loss_history: Vec<f64>,
}

/// Least-squares loss: half the mean squared residual
fn least_squares_loss<B: AutodiffBackend>(
    model: &LinearRegression<B>,
    x: Tensor<B, 2>,
    y: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let diff = model.forward(x) - y;
    (diff.clone() * diff).mean().div_scalar(2.0)
}

/// Train a linear regression on labelled points
pub fn train_linear_regression_with_sgd<B: AutodiffBackend>(
    points: &[LabeledPoint],
    config: &RegressionConfig,
    device: &B::Device,
) -> Result<TrainedRegression<B>> {
    if points.is_empty() {
        bail!("Training set is empty");
    }
    if config.iterations == 0 {
        bail!("Iterations must be at least 1");
    }
    if !(config.mini_batch_fraction > 0.0 && config.mini_batch_fraction <= 1.0) {
        bail!(
            "Mini batch fraction must be in (0, 1], got {}",
            config.mini_batch_fraction
        );
    }

    let scaler = FeatureScaler::fit(points)?;
    let num_features = scaler.width();
    let (features, targets) = points_to_tensors::<B>(points, &scaler, device)?;
    info!(
        "Training linear regression on {} rows x {} features ({} iterations, step {})",
        points.len(),
        num_features,
        config.iterations,
        config.step
    );

    let batch_size = ((points.len() as f64 * config.mini_batch_fraction).ceil() as usize)
        .clamp(1, points.len());
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut model = LinearRegression::<B>::new(num_features, config.intercept, device);
    let mut optimizer = SgdConfig::new().init::<B, LinearRegression<B>>();
    let mut loss_history = Vec::with_capacity(config.iterations);

    for iteration in 1..=config.iterations {
        let (x, y) = if batch_size == points.len() {
            (features.clone(), targets.clone())
        } else {
            let rows: Vec<LabeledPoint> = sample(&mut rng, points.len(), batch_size)
                .into_iter()
                .map(|i| points[i].clone())
                .collect();
            points_to_tensors::<B>(&rows, &scaler, device)?
        };

        let loss = least_squares_loss(&model, x, y);
        let loss_value = loss.clone().into_scalar().elem::<f64>();
        if !loss_value.is_finite() {
            bail!("Training diverged at iteration {}", iteration);
        }
        loss_history.push(loss_value);

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        let step = config.step / (iteration as f64).sqrt();
        model = optimizer.step(step, model, grads);

        if iteration % 100 == 0 {
            debug!("Iteration {}: loss {:.6}", iteration, loss_value);
        }
    }

    Ok(TrainedRegression {
        model: model.valid(),
        scaler,
        loss_history,
    })
}
