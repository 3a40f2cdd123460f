// External imports
use burn::module::Module;
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};

/// Ordinary least-squares model: one linear layer with a single output
#[derive(Module, Debug)]
pub struct LinearRegression<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> LinearRegression<B> {
    /// Weights start at zero; the intercept term is optional
    pub fn new(num_features: usize, intercept: bool, device: &B::Device) -> Self {
        let linear = LinearConfig::new(num_features, 1)
            .with_bias(intercept)
            .with_initializer(Initializer::Zeros)
            .init(device);
        Self { linear }
    }

    /// `[batch, num_features]` -> `[batch, 1]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_zero_initialised_model_predicts_zero() {
        let device = NdArrayDevice::Cpu;
        let model = LinearRegression::<NdArray>::new(4, true, &device);
        let x = Tensor::<NdArray, 2>::ones([3, 4], &device);
        let out = model.forward(x);
        assert_eq!(out.dims(), [3, 1]);
        let total: f32 = out.abs().sum().into_scalar();
        assert_eq!(total, 0.0);
    }
}
