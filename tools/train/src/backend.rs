//! Backend selection for the trainer binary.
//!
//! NdArray on the CPU by default; the `wgpu` feature switches to WebGPU.

use burn::backend::Autodiff;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "WebGPU"
    }
    #[cfg(not(feature = "wgpu"))]
    {
        "NdArray (CPU)"
    }
}
