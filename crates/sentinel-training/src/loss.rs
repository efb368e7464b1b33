//! Loss functions over image-shaped tensors.

use burn::prelude::*;
use burn::tensor::ElementConversion;
use sentinel_core::{Error, Result};

const BCE_EPSILON: f32 = 1e-7;

pub fn mean_absolute_error<B: Backend>(prediction: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    prediction.sub(target).abs().mean()
}

pub fn mean_squared_error<B: Backend>(prediction: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    prediction.sub(target).powf_scalar(2.0).mean()
}

/// Binary cross-entropy of probabilities against soft or hard targets
pub fn binary_cross_entropy<B: Backend>(prediction: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    let p = prediction.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
    let positive = target.clone().mul(p.clone().log());
    let negative = target.neg().add_scalar(1.0).mul(p.neg().add_scalar(1.0).log());
    positive.add(negative).neg().mean()
}

/// Reads a single-element loss tensor
pub fn scalar<B: Backend>(loss: &Tensor<B, 1>) -> f64 {
    loss.clone().into_scalar().elem::<f64>()
}

/// Fails with a shape error when `actual` and `expected` differ
pub fn ensure_same_dims<B: Backend>(actual: &Tensor<B, 4>, expected: &Tensor<B, 4>, what: &str) -> Result<()> {
    if actual.dims() != expected.dims() {
        return Err(Error::Shape(format!(
            "{what}: output {:?} does not match target {:?}",
            actual.dims(),
            expected.dims()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn full(value: f32) -> Tensor<TestBackend, 4> {
        Tensor::full([2, 1, 2, 2], value, &Default::default())
    }

    #[test]
    fn test_mae_and_mse() {
        assert!((scalar(&mean_absolute_error(full(0.25), full(1.0))) - 0.75).abs() < 1e-6);
        assert!((scalar(&mean_squared_error(full(0.5), full(1.0))) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_bce_is_small_for_confident_correct_predictions() {
        let good = scalar(&binary_cross_entropy(full(0.99), full(1.0)));
        let bad = scalar(&binary_cross_entropy(full(0.01), full(1.0)));
        assert!(good < 0.02);
        assert!(bad > 4.0);
    }

    #[test]
    fn test_bce_is_finite_at_saturation() {
        assert!(scalar(&binary_cross_entropy(full(0.0), full(1.0))).is_finite());
        assert!(scalar(&binary_cross_entropy(full(1.0), full(0.0))).is_finite());
    }

    #[test]
    fn test_ensure_same_dims() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);
        let b = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
        assert!(ensure_same_dims(&a, &a.clone(), "probe").is_ok());
        assert!(matches!(ensure_same_dims(&a, &b, "probe"), Err(Error::Shape(_))));
    }
}
