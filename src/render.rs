//! Caller-driven demand loop.

use tracing::trace;

use crate::block::SampleBlock;
use crate::error::StreamError;
use crate::stream::SoundStream;

/// Pulls a stream block by block and applies its scale.
///
/// Nothing happens between calls: every block is computed inside the
/// [`next_block`](Self::next_block) call that asks for it.
///
/// # Example
///
/// ```
/// use funke::{nodes::{Constant, Samples}, Renderer, SoundStream, Value};
///
/// let rate = 8000.0;
/// let control = SoundStream::new(Samples::new(vec![-1.0, -1.0, 2.0, 3.0]), rate, 0.0).unwrap();
/// let out = control.trigger(move |now| {
///     Value::Sound(SoundStream::new(Constant::new(1.0).with_len(2), rate, now).unwrap())
/// });
///
/// let samples = Renderer::new(out).with_block_len(16).render(100).unwrap();
/// assert_eq!(samples, vec![0.0, 0.0, 1.0, 1.0]);
/// ```
pub struct Renderer {
    stream: SoundStream,
    block_len: usize,
    rendered: u64,
}

impl Renderer {
    /// Render `stream` in blocks of [`SampleBlock::CAPACITY`] samples.
    pub fn new(stream: SoundStream) -> Self {
        Self {
            stream,
            block_len: SampleBlock::CAPACITY,
            rendered: 0,
        }
    }

    /// Set the block length requested from the stream (builder pattern).
    ///
    /// Must be between 1 and [`SampleBlock::CAPACITY`]; other values make the
    /// next fetch fail with [`StreamError::BlockLength`].
    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = block_len;
        self
    }

    /// Samples returned so far.
    #[inline]
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    #[inline]
    pub fn stream(&self) -> &SoundStream {
        &self.stream
    }

    /// Pull the next block, scaled. `None` once the stream has ended.
    pub fn next_block(&mut self) -> Result<Option<Vec<f32>>, StreamError> {
        let block = match self.stream.read_block(self.block_len)? {
            Some(block) => block,
            None => return Ok(None),
        };
        let scale = self.stream.scale();
        let samples: Vec<f32> = block.as_slice().iter().map(|s| s * scale).collect();
        self.rendered += samples.len() as u64;
        trace!(len = samples.len(), rendered = self.rendered, "rendered block");
        Ok(Some(samples))
    }

    /// Pull blocks until the stream ends or `limit` samples are collected.
    /// The last block is cut at `limit`.
    pub fn render(&mut self, limit: usize) -> Result<Vec<f32>, StreamError> {
        let mut out = Vec::new();
        while out.len() < limit {
            match self.next_block()? {
                Some(block) => out.extend_from_slice(&block),
                None => break,
            }
        }
        out.truncate(limit);
        Ok(out)
    }
}
