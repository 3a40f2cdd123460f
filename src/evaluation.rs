use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};

/// Prediction error over (real, predicted) pairs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Mean squared error
    pub mse: f64,
    /// Mean absolute deviation
    pub mad: f64,
    /// Mean absolute percentage error, as a fraction
    pub mape: f64,
    pub count: usize,
}

fn check(pairs: &[(f64, f64)]) -> Result<f64> {
    if pairs.is_empty() {
        return Err(InferenceError::EmptyEvaluation);
    }
    Ok(pairs.len() as f64)
}

pub fn get_mse(pairs: &[(f64, f64)]) -> Result<f64> {
    let n = check(pairs)?;
    Ok(pairs.iter().map(|(v, p)| (v - p).powi(2)).sum::<f64>() / n)
}

pub fn get_mad(pairs: &[(f64, f64)]) -> Result<f64> {
    let n = check(pairs)?;
    Ok(pairs.iter().map(|(v, p)| (v - p).abs()).sum::<f64>() / n)
}

/// Pairs whose real value is zero are left out
pub fn get_mape(pairs: &[(f64, f64)]) -> Result<f64> {
    check(pairs)?;
    let errors: Vec<f64> = pairs
        .iter()
        .filter(|(v, _)| *v != 0.0)
        .map(|(v, p)| ((v - p) / v).abs())
        .collect();
    if errors.is_empty() {
        return Err(InferenceError::EmptyEvaluation);
    }
    Ok(errors.iter().sum::<f64>() / errors.len() as f64)
}

impl EvaluationReport {
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Ok(Self {
            mse: get_mse(pairs)?,
            mad: get_mad(pairs)?,
            mape: get_mape(pairs)?,
            count: pairs.len(),
        })
    }
}
