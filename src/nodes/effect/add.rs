//! Sum of two streams, the shape a trigger takes once it has fired.

use tracing::debug;

use crate::block::SampleBlock;
use crate::error::StreamError;
use crate::node::{Behavior, FetchResult};
use crate::stream::{Cursor, SoundStream};
use crate::trace::Visitor;

/// How an [`AddNode`] lines up its second summand. Chosen once, when the add
/// is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddStrategy {
    /// Both summands contribute from the first sample.
    Overlap,
    /// The secondary starts `delay` samples in; until then the primary plays
    /// alone, or silence once the primary has ended.
    Gap { delay: u64 },
}

/// One input of an add, with its read position.
struct Summand {
    stream: SoundStream,
    cursor: Cursor,
    ended: bool,
}

impl Summand {
    fn new(stream: SoundStream) -> Self {
        Self {
            stream,
            cursor: Cursor::default(),
            ended: false,
        }
    }

    /// Samples available without passing a block boundary, 0 once ended.
    fn available(&mut self, max_len: usize) -> Result<usize, StreamError> {
        if self.ended {
            return Ok(0);
        }
        let n = self.cursor.fill(&mut self.stream, max_len)?;
        if n == 0 {
            self.ended = true;
        }
        Ok(n)
    }

    /// Nothing left in the current block.
    fn drained(&self) -> bool {
        self.cursor.remaining() == 0
    }

    fn copy_into(&mut self, out: &mut [f32]) {
        out.copy_from_slice(&self.cursor.samples()[..out.len()]);
        self.cursor.advance(out.len());
    }

    fn add_into(&mut self, out: &mut [f32]) {
        for (o, s) in out.iter_mut().zip(self.cursor.samples()) {
            *o += s;
        }
        self.cursor.advance(out.len());
    }
}

/// Sums a primary and a secondary stream of the same sample rate.
///
/// Output starts at the primary's start time. When one summand ends the other
/// carries on alone; the add ends when both have.
pub struct AddNode {
    primary: Summand,
    secondary: Summand,
    strategy: AddStrategy,
    gap_left: u64,
    /// Samples the owning node had produced before it became this add.
    base: u64,
}

impl AddNode {
    /// `offset` is the secondary's start relative to the primary's, in samples.
    /// A positive offset selects [`AddStrategy::Gap`].
    pub(crate) fn new(primary: SoundStream, secondary: SoundStream, offset: i64, base: u64) -> Self {
        let strategy = if offset > 0 {
            AddStrategy::Gap {
                delay: offset as u64,
            }
        } else {
            AddStrategy::Overlap
        };
        debug!(?strategy, offset, base, "add selected strategy");
        Self {
            primary: Summand::new(primary),
            secondary: Summand::new(secondary),
            strategy,
            gap_left: offset.max(0) as u64,
            base,
        }
    }

    #[inline]
    pub fn strategy(&self) -> AddStrategy {
        self.strategy
    }

    pub(crate) fn fetch(&mut self, max_len: usize) -> FetchResult {
        let mut out = SampleBlock::new();
        let mut cnt = 0;

        while cnt < max_len {
            let togo = max_len - cnt;

            if self.gap_left > 0 {
                let primary = self.primary.available(max_len)?;
                let mut n = togo.min(self.gap_left.min(usize::MAX as u64) as usize);
                if primary > 0 {
                    n = n.min(primary);
                    self.primary.copy_into(&mut out.storage_mut()[cnt..cnt + n]);
                }
                // an ended primary leaves the gap silent
                self.gap_left -= n as u64;
                cnt += n;
                continue;
            }

            let secondary = self.secondary.available(max_len)?;
            if secondary == 0 && cnt > 0 && self.primary.drained() {
                // end on the primary's block boundary so the next fetch can
                // hand over to it
                break;
            }
            let primary = self.primary.available(max_len)?;
            let n = match (primary, secondary) {
                (0, 0) => break,
                (0, s) => togo.min(s),
                (p, 0) => togo.min(p),
                (p, s) => togo.min(p).min(s),
            };
            let run = &mut out.storage_mut()[cnt..cnt + n];
            if primary > 0 {
                self.primary.add_into(run);
            }
            if secondary > 0 {
                self.secondary.add_into(run);
            }
            cnt += n;
        }

        if cnt == 0 {
            return Ok(None);
        }
        out.set_len(cnt);
        Ok(Some(out))
    }

    /// Samples the owning node produced before it became this add.
    #[inline]
    pub(crate) fn base(&self) -> u64 {
        self.base
    }

    /// Once the gap is over, the secondary has ended and every sample taken
    /// from the primary has been passed on, the add is just its primary.
    /// Returns the primary's behavior if nothing else reads it.
    pub(crate) fn take_primary(&mut self, max_len: usize) -> Result<Option<Behavior>, StreamError> {
        if self.gap_left > 0 || !self.primary.drained() {
            return Ok(None);
        }
        if self.secondary.available(max_len)? > 0 {
            return Ok(None);
        }
        Ok(self.primary.stream.take_behavior())
    }

    pub(crate) fn trace(&self, visitor: &mut dyn Visitor) {
        visitor.visit_stream(&self.primary.stream);
        visitor.visit_stream(&self.secondary.stream);
    }

    /// Known once both summands know theirs.
    pub(crate) fn logical_stop(&self) -> Option<u64> {
        let primary = self.primary.stream.logical_stop()?;
        let secondary = self.secondary.stream.logical_stop()?;
        // overlapping secondaries play from their first sample
        let secondary = match self.strategy {
            AddStrategy::Gap { delay } => secondary + delay,
            AddStrategy::Overlap => secondary,
        };
        Some(self.base + primary.max(secondary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Constant, Samples};

    fn stream(samples: &[f32]) -> SoundStream {
        SoundStream::new(Samples::new(samples.to_vec()), 10.0, 0.0).unwrap()
    }

    fn drain(add: &mut AddNode, max_len: usize) -> Vec<f32> {
        let mut out = Vec::new();
        while let Some(block) = add.fetch(max_len).unwrap() {
            assert!(block.len() <= max_len);
            out.extend_from_slice(block.as_slice());
        }
        out
    }

    #[test]
    fn overlap_sums_from_the_start() {
        let mut add = AddNode::new(stream(&[1.0, 2.0, 3.0]), stream(&[10.0, 20.0]), 0, 0);
        assert_eq!(add.strategy(), AddStrategy::Overlap);
        assert_eq!(drain(&mut add, 64), vec![11.0, 22.0, 3.0]);
    }

    #[test]
    fn negative_offsets_overlap_too() {
        let mut add = AddNode::new(stream(&[0.0, 0.0]), stream(&[1.0]), -3, 0);
        assert_eq!(add.strategy(), AddStrategy::Overlap);
        assert_eq!(drain(&mut add, 64), vec![1.0, 0.0]);
    }

    #[test]
    fn gap_plays_primary_alone_first() {
        let mut add = AddNode::new(stream(&[1.0, 1.0, 1.0, 1.0]), stream(&[5.0, 5.0]), 2, 0);
        assert_eq!(add.strategy(), AddStrategy::Gap { delay: 2 });
        assert_eq!(drain(&mut add, 3), vec![1.0, 1.0, 6.0, 6.0]);
    }

    #[test]
    fn gap_is_silent_after_primary_ends() {
        let mut add = AddNode::new(stream(&[1.0]), stream(&[5.0]), 3, 0);
        assert_eq!(drain(&mut add, 64), vec![1.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn blocks_never_exceed_the_request() {
        let primary = SoundStream::new(Constant::new(0.0).with_len(10), 10.0, 0.0).unwrap();
        let secondary = SoundStream::new(Constant::new(1.0).with_len(7), 10.0, 0.0).unwrap();
        let mut add = AddNode::new(primary, secondary, 1, 0);
        let out = drain(&mut add, 4);
        assert_eq!(out.len(), 10);
        assert_eq!(out.iter().filter(|s| **s == 1.0).count(), 7);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn logical_stop_covers_both_summands() {
        let primary = SoundStream::new(Samples::new(vec![0.0; 4]).with_logical_stop(2), 10.0, 0.0).unwrap();
        let add = AddNode::new(primary, stream(&[1.0; 3]), 2, 5);
        assert_eq!(add.logical_stop(), Some(5 + 5));

        let endless = SoundStream::new(Constant::new(0.0), 10.0, 0.0).unwrap();
        let add = AddNode::new(endless, stream(&[1.0]), 0, 0);
        assert_eq!(add.logical_stop(), None);
    }

    #[test]
    fn overlapping_secondary_counts_from_its_first_sample() {
        let primary = stream(&[1.0]);
        let secondary = SoundStream::new(Constant::new(1.0).with_len(5), 10.0, 0.0).unwrap();
        let mut add = AddNode::new(primary, secondary, -3, 0);
        assert_eq!(add.logical_stop(), Some(5));
        assert_eq!(drain(&mut add, 64), vec![2.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn hands_over_once_the_secondary_has_ended() {
        let mut add = AddNode::new(stream(&[1.0, 2.0, 3.0]), stream(&[10.0]), 0, 4);
        assert!(add.take_primary(64).unwrap().is_none());

        let block = add.fetch(64).unwrap().unwrap();
        assert_eq!(block.as_slice(), &[11.0, 2.0, 3.0]);
        assert_eq!(add.base(), 4);
        assert!(matches!(add.take_primary(64).unwrap(), Some(Behavior::Other(_))));
    }

    #[test]
    fn keeps_a_primary_someone_else_reads() {
        let primary = stream(&[1.0, 2.0]);
        let _observer = primary.clone();
        let mut add = AddNode::new(primary, stream(&[]), 0, 0);
        assert!(add.take_primary(64).unwrap().is_none());
        assert_eq!(drain(&mut add, 64), vec![1.0, 2.0]);
    }

    #[test]
    fn blocks_end_where_the_primary_block_ends_once_alone() {
        let primary = SoundStream::new(Samples::new(vec![0.0; 6]).with_block_len(4), 10.0, 0.0).unwrap();
        let mut add = AddNode::new(primary, stream(&[1.0]), 0, 0);
        assert_eq!(add.fetch(64).unwrap().unwrap().as_slice(), &[1.0, 0.0, 0.0, 0.0]);
        assert!(add.take_primary(64).unwrap().is_some());
    }
}
