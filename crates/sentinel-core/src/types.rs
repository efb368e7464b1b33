//! Core type definitions for the Sentinel cGAN.

use serde::{Deserialize, Serialize};

/// Spatial reduction applied by the discriminator: four stride-2 stages.
///
/// Label tensors and the discriminator architecture must agree on this value.
pub const DISCRIMINATOR_DOWNSAMPLING: usize = 16;

/// Shape of a single image, independent of tensor layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImageShape {
    /// Image height in pixels
    pub height: usize,
    /// Image width in pixels
    pub width: usize,
    /// Number of channels (1 for masks, 3 for RGB satellite tiles)
    pub channels: usize,
}

impl ImageShape {
    /// Creates a new image shape
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of scalar values in one image
    pub fn num_elements(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Tensor dims in NCHW order for a batch of this shape
    pub fn nchw(&self, batch: usize) -> [usize; 4] {
        [batch, self.channels, self.height, self.width]
    }

    /// Shape of the discriminator's validity map for a batch of this image shape.
    pub fn label_shape(&self, batch: usize) -> LabelShape {
        LabelShape {
            batch,
            height: self.height / DISCRIMINATOR_DOWNSAMPLING,
            width: self.width / DISCRIMINATOR_DOWNSAMPLING,
            channels: 1,
        }
    }

    /// Whether both spatial dims are exact multiples of the discriminator downsampling
    pub fn is_downsampling_aligned(&self) -> bool {
        self.height % DISCRIMINATOR_DOWNSAMPLING == 0 && self.width % DISCRIMINATOR_DOWNSAMPLING == 0
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

/// Shape of a label tensor: `(batch, H/16, W/16, 1)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelShape {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl LabelShape {
    /// Tensor dims in NCHW order
    pub fn nchw(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }
}

/// Label values used for discriminator targets.
///
/// `low` always labels generator-origin batches and `high` labels
/// dataset-origin batches, whatever the numeric order of the two.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PixelRange {
    pub low: f32,
    pub high: f32,
}

impl PixelRange {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Label value for synthetic images
    pub fn fake(&self) -> f32 {
        self.low
    }

    /// Label value for dataset images
    pub fn real(&self) -> f32 {
        self.high
    }
}

impl Default for PixelRange {
    fn default() -> Self {
        Self { low: 0.0, high: 1.0 }
    }
}

impl From<(f32, f32)> for PixelRange {
    fn from((low, high): (f32, f32)) -> Self {
        Self { low, high }
    }
}

impl std::fmt::Display for PixelRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}
