//! Sound streams: shared handles onto lazily computed block lists.

use core::cell::RefCell;
use core::mem;
use std::rc::Rc;

use crate::block::SampleBlock;
use crate::closure::{Closure, NativeEvaluator, Value};
use crate::error::StreamError;
use crate::node::{Behavior, Node, NodeKind, SignalNode};
use crate::nodes::{create_trigger, Normalize};
use crate::trace::Visitor;

type Link = Rc<RefCell<ListCell>>;

/// One cell of a stream's block list.
///
/// A `Pending` cell is computed by fetching from its node the first time any
/// reader reaches it; every later reader sees the memoised block.
enum ListCell {
    Pending(Node),
    Ready { block: Rc<SampleBlock>, next: Link },
    Terminated,
}

impl Drop for ListCell {
    // Unlink iteratively so dropping a long chain does not recurse.
    fn drop(&mut self) {
        let mut next = match self.unlink() {
            Some(next) => next,
            None => return,
        };
        while let Ok(cell) = Rc::try_unwrap(next) {
            next = match cell.into_inner().unlink() {
                Some(next) => next,
                None => return,
            };
        }
    }
}

impl ListCell {
    /// Detach the successor of a `Ready` cell, leaving an ended one behind.
    fn unlink(&mut self) -> Option<Link> {
        match self {
            ListCell::Ready { next, .. } => Some(mem::replace(
                next,
                Rc::new(RefCell::new(ListCell::Terminated)),
            )),
            _ => None,
        }
    }
}

/// A handle onto a sound: a node plus its sample rate, start time and scale.
///
/// Cloning a stream is cheap. Clones share the node and the blocks it has
/// already produced, but each clone reads at its own position, so a copy made
/// before reading sees the whole sound.
#[derive(Clone)]
pub struct SoundStream {
    list: Link,
    node: Node,
    sample_rate: f64,
    start_time: f64,
    scale: f32,
}

impl SoundStream {
    /// Wrap a node in a stream starting at `start_time` seconds.
    pub fn new<N>(node: N, sample_rate: f64, start_time: f64) -> Result<Self, StreamError>
    where
        N: SignalNode + 'static,
    {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(StreamError::InvalidSampleRate(sample_rate));
        }
        Ok(Self::from_behavior(
            Behavior::Other(Box::new(node)),
            sample_rate,
            start_time,
        ))
    }

    /// The sample rate must already be validated.
    pub(crate) fn from_behavior(behavior: Behavior, sample_rate: f64, start_time: f64) -> Self {
        let node = Node::new(behavior);
        Self {
            list: Rc::new(RefCell::new(ListCell::Pending(node.clone()))),
            node,
            sample_rate,
            start_time,
            scale: 1.0,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Time of the first sample, in seconds.
    #[inline]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Factor readers apply to every sample.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// A handle onto the same sound with its scale multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            scale: self.scale * factor,
            ..self.clone()
        }
    }

    /// A handle with scale 1 that produces the scaled samples.
    ///
    /// Returns a plain copy when the scale is already 1.
    pub fn normalized(&self) -> Self {
        if self.scale == 1.0 {
            return self.clone();
        }
        let scale = self.scale;
        let input = Self {
            scale: 1.0,
            ..self.clone()
        };
        Self::from_behavior(
            Behavior::Other(Box::new(Normalize::new(input, scale))),
            self.sample_rate,
            self.start_time,
        )
    }

    /// Read the next block, forcing the node if nobody has computed it yet.
    ///
    /// Returns `None` once the stream has ended. Samples are not scaled.
    pub fn read_block(&mut self, max_len: usize) -> Result<Option<Rc<SampleBlock>>, StreamError> {
        let pending = match &*self.list.borrow() {
            ListCell::Pending(node) => Some(node.clone()),
            _ => None,
        };
        if let Some(node) = pending {
            let fetched = node.fetch(max_len)?;
            *self.list.borrow_mut() = match fetched {
                Some(block) => ListCell::Ready {
                    block: Rc::new(block),
                    next: Rc::new(RefCell::new(ListCell::Pending(node))),
                },
                None => ListCell::Terminated,
            };
        }

        let (block, next) = match &*self.list.borrow() {
            ListCell::Ready { block, next } => (block.clone(), next.clone()),
            _ => return Ok(None),
        };
        self.list = next;
        Ok(Some(block))
    }

    /// Move the node's behavior out, if this handle is the only way left to
    /// read it and nothing has been read past the current position.
    ///
    /// On success the handle is left ended.
    pub(crate) fn take_behavior(&mut self) -> Option<Behavior> {
        if Rc::strong_count(&self.list) != 1 {
            return None;
        }
        if !matches!(&*self.list.borrow(), ListCell::Pending(_)) {
            return None;
        }
        // this handle plus its pending cell
        if self.node.ref_count() != 2 {
            return None;
        }
        *self.list.borrow_mut() = ListCell::Terminated;
        self.node.take_behavior()
    }

    /// Sample index (from [`start_time`](Self::start_time)) where the sound
    /// logically ends, if known.
    pub fn logical_stop(&self) -> Option<u64> {
        self.node.logical_stop()
    }

    /// Sample index where the sound stops producing samples, if known.
    pub fn terminate_at(&self) -> Option<u64> {
        self.node.terminate_at()
    }

    /// What the underlying node currently is, or `None` while it is being
    /// fetched.
    pub fn kind(&self) -> Option<NodeKind> {
        self.node.kind()
    }

    pub fn name(&self) -> &'static str {
        self.node.name()
    }

    /// Samples the underlying node has produced so far, across all readers.
    pub fn produced(&self) -> u64 {
        self.node.produced()
    }

    /// Identity of the underlying node. Survives a trigger turning into an add.
    pub fn node_id(&self) -> usize {
        self.node.id()
    }

    /// Visit every stream and closure the underlying node references.
    pub fn trace(&self, visitor: &mut dyn Visitor) {
        self.node.trace(visitor);
    }

    /// Silence until this stream rises above zero, then add the sound `f`
    /// returns for the time of the edge. Every later rising edge does the same.
    pub fn trigger<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> Value + 'static,
    {
        create_trigger(self, Closure::from_fn(f), Rc::new(NativeEvaluator))
    }
}

/// Read position inside the block a node last took from one of its inputs.
#[derive(Clone, Default)]
pub(crate) struct Cursor {
    block: Option<Rc<SampleBlock>>,
    offset: usize,
}

impl Cursor {
    /// Samples left in the current block.
    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.block
            .as_ref()
            .map_or(0, |block| block.len() - self.offset)
    }

    /// The unread samples of the current block.
    #[inline]
    pub(crate) fn samples(&self) -> &[f32] {
        match &self.block {
            Some(block) => &block.as_slice()[self.offset..],
            None => &[],
        }
    }

    #[inline]
    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.offset += n;
    }

    /// Make sure samples are available, reading `input`'s next block if the
    /// current one is used up. Returns how many are available; 0 means the
    /// input has ended.
    pub(crate) fn fill(&mut self, input: &mut SoundStream, max_len: usize) -> Result<usize, StreamError> {
        if self.remaining() == 0 {
            self.block = input.read_block(max_len)?;
            self.offset = 0;
        }
        Ok(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Samples;

    #[test]
    fn cursor_walks_blocks_in_order() {
        let mut input = ramp(5);
        let mut cursor = Cursor::default();
        assert_eq!(cursor.remaining(), 0);

        assert_eq!(cursor.fill(&mut input, 3).unwrap(), 3);
        cursor.advance(2);
        assert_eq!(cursor.samples(), &[2.0]);
        // still one sample left, so no new block is read
        assert_eq!(cursor.fill(&mut input, 3).unwrap(), 1);
        cursor.advance(1);
        assert_eq!(cursor.fill(&mut input, 3).unwrap(), 2);
        assert_eq!(cursor.samples(), &[3.0, 4.0]);
        cursor.advance(2);
        assert_eq!(cursor.fill(&mut input, 3).unwrap(), 0);
    }

    fn ramp(len: usize) -> SoundStream {
        let samples = (0..len).map(|i| i as f32).collect();
        SoundStream::new(Samples::new(samples), 10.0, 0.0).unwrap()
    }

    fn drain(stream: &mut SoundStream, max_len: usize) -> Vec<f32> {
        let mut out = Vec::new();
        while let Some(block) = stream.read_block(max_len).unwrap() {
            out.extend_from_slice(block.as_slice());
        }
        out
    }

    #[test]
    fn rejects_bad_sample_rates() {
        for rate in [0.0, -44100.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SoundStream::new(Samples::new(vec![]), rate, 0.0),
                Err(StreamError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn copies_read_independently_and_share_blocks() {
        let mut first = ramp(10);
        let mut second = first.clone();

        assert_eq!(drain(&mut first, 4), (0..10).map(|i| i as f32).collect::<Vec<_>>());
        // the node ran once; the copy replays the memoised blocks
        assert_eq!(first.produced(), 10);
        assert_eq!(drain(&mut second, 64), (0..10).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(second.produced(), 10);
    }

    #[test]
    fn blocks_keep_the_size_of_the_first_reader() {
        let mut first = ramp(5);
        let mut second = first.clone();
        assert_eq!(first.read_block(2).unwrap().unwrap().len(), 2);
        assert_eq!(second.read_block(64).unwrap().unwrap().len(), 2);
        assert_eq!(second.read_block(64).unwrap().unwrap().len(), 3);
    }

    #[test]
    fn ended_streams_stay_ended() {
        let mut stream = ramp(2);
        assert!(stream.read_block(64).unwrap().is_some());
        assert!(stream.read_block(64).unwrap().is_none());
        assert!(stream.read_block(64).unwrap().is_none());
    }

    #[test]
    fn normalizing_applies_the_scale_once() {
        let scaled = ramp(3).scaled(-2.0);
        assert_eq!(scaled.scale(), -2.0);

        let mut normalized = scaled.normalized();
        assert_eq!(normalized.scale(), 1.0);
        assert_eq!(normalized.kind(), Some(NodeKind::Other("normalize")));
        assert_eq!(drain(&mut normalized, 64), vec![0.0, -2.0, -4.0]);

        let plain = ramp(3);
        assert_eq!(plain.normalized().node_id(), plain.node_id());
    }

    #[test]
    fn long_chains_drop_without_recursing() {
        let mut reader = SoundStream::new(Samples::new(vec![0.5; 50_000]), 10.0, 0.0).unwrap();
        let keeper = reader.clone();
        drain(&mut reader, 1);
        drop(reader);
        drop(keeper);
    }
}
