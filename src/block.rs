//! Fixed-capacity sample blocks.

use core::fmt;

use dasp_graph::Buffer;

use crate::error::StreamError;

/// One block of mono samples.
///
/// The storage is a single [`Buffer`], so a block never holds more than
/// [`SampleBlock::CAPACITY`] samples. Only the first [`len`](Self::len) of them
/// are valid. A block is always shorter than its capacity when it is the last
/// block of a stream, or when the producer ended it early (at a trigger edge or
/// a known termination index).
#[derive(Clone)]
pub struct SampleBlock {
    buffer: Buffer,
    len: usize,
}

impl SampleBlock {
    /// Maximum number of samples in a block.
    pub const CAPACITY: usize = Buffer::LEN;

    /// An empty block. Every sample of the storage starts out silent.
    pub fn new() -> Self {
        Self {
            buffer: Buffer::default(),
            len: 0,
        }
    }

    /// Copy up to [`CAPACITY`](Self::CAPACITY) samples into a new block.
    pub fn from_slice(samples: &[f32]) -> Self {
        let mut block = Self::new();
        let len = samples.len().min(Self::CAPACITY);
        block.buffer[..len].copy_from_slice(&samples[..len]);
        block.len = len;
        block
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid samples.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.buffer[..self.len]
    }

    /// The whole storage, for producers filling the block. Call
    /// [`set_len`](Self::set_len) once done.
    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut [f32] {
        &mut self.buffer[..]
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= Self::CAPACITY);
        self.len = len.min(Self::CAPACITY);
    }

    /// Reject fetch sizes a block cannot satisfy.
    pub(crate) fn check_len(requested: usize) -> Result<(), StreamError> {
        if requested == 0 || requested > Self::CAPACITY {
            return Err(StreamError::BlockLength {
                requested,
                capacity: Self::CAPACITY,
            });
        }
        Ok(())
    }
}

impl Default for SampleBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SampleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
