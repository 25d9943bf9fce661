//! Applies a stream's scale factor to its samples.

use crate::block::SampleBlock;
use crate::node::{FetchResult, SignalNode};
use crate::stream::SoundStream;
use crate::trace::Visitor;

/// Multiplies every sample of its input by a fixed factor.
///
/// Built by [`SoundStream::normalized`]; the input handle has scale 1.
pub struct Normalize {
    input: SoundStream,
    scale: f32,
}

impl Normalize {
    pub(crate) fn new(input: SoundStream, scale: f32) -> Self {
        Self { input, scale }
    }
}

impl SignalNode for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn fetch(&mut self, max_len: usize) -> FetchResult {
        let block = match self.input.read_block(max_len)? {
            Some(block) => block,
            None => return Ok(None),
        };
        let mut out = SampleBlock::new();
        for (o, s) in out.storage_mut().iter_mut().zip(block.as_slice()) {
            *o = s * self.scale;
        }
        out.set_len(block.len());
        Ok(Some(out))
    }

    fn trace(&self, visitor: &mut dyn Visitor) {
        visitor.visit_stream(&self.input);
    }

    fn logical_stop(&self) -> Option<u64> {
        self.input.logical_stop()
    }

    fn terminate_at(&self) -> Option<u64> {
        self.input.terminate_at()
    }
}
