use crate::block::SampleBlock;
use crate::node::{FetchResult, SignalNode};

/// Outputs the same value, forever or for a fixed number of samples.
pub struct Constant {
    value: f32,
    len: Option<u64>,
    produced: u64,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            len: None,
            produced: 0,
        }
    }

    /// Stop after `len` samples.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }
}

impl SignalNode for Constant {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn fetch(&mut self, max_len: usize) -> FetchResult {
        let n = match self.len {
            Some(len) => (len - self.produced).min(max_len as u64) as usize,
            None => max_len,
        };
        if n == 0 {
            return Ok(None);
        }
        let mut block = SampleBlock::new();
        block.storage_mut()[..n].iter_mut().for_each(|s| *s = self.value);
        block.set_len(n);
        self.produced += n as u64;
        Ok(Some(block))
    }

    fn logical_stop(&self) -> Option<u64> {
        self.len
    }

    fn terminate_at(&self) -> Option<u64> {
        self.len
    }
}
