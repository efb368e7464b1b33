//! The data generator capability consumed by the trainer.

use burn::prelude::*;
use sentinel_core::Result;

use crate::SentinelBatch;

/// Iterator over the batches of one pass.
pub type BatchIter<'a, B> = Box<dyn Iterator<Item = Result<SentinelBatch<B>>> + 'a>;

/// Source of paired `(satellite, condition)` batches.
///
/// Each call to [`DataGenerator::load`] starts a new, finite, single pass over
/// the dataset in the generator's own order. The last batch may be shorter
/// than `batch_size`; an empty dataset yields no batches.
pub trait DataGenerator<B: Backend> {
    /// Total number of examples one pass processes
    fn example_count(&self) -> usize;

    /// Starts a pass with the requested batch size
    fn load(&mut self, batch_size: usize) -> Result<BatchIter<'_, B>>;
}

/// Number of batches a pass of `examples` items yields for `batch_size`
pub fn batch_count(examples: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    examples.div_ceil(batch_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(5, 2), 3);
        assert_eq!(batch_count(4, 2), 2);
        assert_eq!(batch_count(0, 2), 0);
        assert_eq!(batch_count(3, 0), 0);
    }
}
