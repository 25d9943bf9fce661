//! In-memory sample source.

use std::rc::Rc;

use crate::block::SampleBlock;
use crate::node::{FetchResult, SignalNode};

/// Plays a finite, pre-computed mono signal.
///
/// # Example
///
/// ```
/// use funke::{nodes::Samples, SoundStream};
///
/// let control = Samples::new(vec![-1.0, -1.0, 2.0, 3.0]).with_logical_stop(3);
/// let stream = SoundStream::new(control, 44100.0, 0.0).unwrap();
/// assert_eq!(stream.terminate_at(), Some(4));
/// assert_eq!(stream.logical_stop(), Some(3));
/// ```
pub struct Samples {
    samples: Rc<[f32]>,
    position: usize,
    block_len: usize,
    logical_stop: Option<u64>,
}

impl Samples {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
            position: 0,
            block_len: SampleBlock::CAPACITY,
            logical_stop: None,
        }
    }

    /// Never produce blocks longer than `block_len` (at least 1).
    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = block_len.max(1);
        self
    }

    /// End the content before the last sample. Defaults to the length.
    pub fn with_logical_stop(mut self, samples: u64) -> Self {
        self.logical_stop = Some(samples);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SignalNode for Samples {
    fn name(&self) -> &'static str {
        "samples"
    }

    fn fetch(&mut self, max_len: usize) -> FetchResult {
        let remaining = self.samples.len() - self.position;
        if remaining == 0 {
            return Ok(None);
        }
        let n = remaining.min(max_len).min(self.block_len);
        let block = SampleBlock::from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        Ok(Some(block))
    }

    fn logical_stop(&self) -> Option<u64> {
        Some(self.logical_stop.unwrap_or(self.samples.len() as u64))
    }

    fn terminate_at(&self) -> Option<u64> {
        Some(self.samples.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_both_block_limits() {
        let mut samples = Samples::new((0..10).map(|i| i as f32).collect()).with_block_len(4);
        assert_eq!(samples.fetch(3).unwrap().unwrap().as_slice(), &[0.0, 1.0, 2.0]);
        assert_eq!(samples.fetch(64).unwrap().unwrap().as_slice(), &[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(samples.fetch(64).unwrap().unwrap().len(), 3);
        assert!(samples.fetch(64).unwrap().is_none());
    }

    #[test]
    fn empty_signal_ends_immediately() {
        let mut samples = Samples::new(Vec::new());
        assert!(samples.is_empty());
        assert!(samples.fetch(64).unwrap().is_none());
        assert_eq!(samples.terminate_at(), Some(0));
    }
}
