//! Core node trait and node identity.

use core::cell::RefCell;
use core::mem;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::block::SampleBlock;
use crate::error::StreamError;
use crate::nodes::{AddNode, AddStrategy, TriggerFetch, TriggerNode};
use crate::trace::Visitor;

/// Result of pulling one block: `Ok(None)` marks the end of the stream.
pub type FetchResult = Result<Option<SampleBlock>, StreamError>;

/// The core trait for pull-based signal nodes.
///
/// Implement this for sources and effects. A node is pulled by whoever reads
/// the stream wrapping it; it should produce between 1 and `max_len` samples,
/// or `None` once it has ended. Inputs it reads are expected to have a scale
/// of 1 (see [`SoundStream::normalized`](crate::SoundStream::normalized)).
///
/// ```
/// use funke::{FetchResult, SampleBlock, SignalNode, SoundStream};
///
/// /// Counts upwards forever.
/// struct Ramp(f32);
///
/// impl SignalNode for Ramp {
///     fn name(&self) -> &'static str { "ramp" }
///
///     fn fetch(&mut self, max_len: usize) -> FetchResult {
///         let samples: Vec<f32> = (0..max_len)
///             .map(|_| { self.0 += 1.0; self.0 })
///             .collect();
///         Ok(Some(SampleBlock::from_slice(&samples)))
///     }
/// }
///
/// let mut ramp = SoundStream::new(Ramp(0.0), 44100.0, 0.0).unwrap();
/// let block = ramp.read_block(4).unwrap().unwrap();
/// assert_eq!(block.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
pub trait SignalNode {
    /// Diagnostic name.
    fn name(&self) -> &'static str;

    /// Produce the next block of at most `max_len` samples.
    fn fetch(&mut self, max_len: usize) -> FetchResult;

    /// Report every stream this node references.
    fn trace(&self, _visitor: &mut dyn Visitor) {}

    /// Sample index (from the node's start) where the content logically ends.
    fn logical_stop(&self) -> Option<u64> {
        None
    }

    /// Sample index (from the node's start) where the node stops producing.
    fn terminate_at(&self) -> Option<u64> {
        None
    }
}

/// What a node currently is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    /// Emitting silence, waiting for a rising edge.
    Trigger,
    /// Summing two streams; a trigger that fired becomes this.
    Add(AddStrategy),
    Other(&'static str),
}

/// Node behavior. A trigger replaces itself with an add when it fires, and an
/// add whose secondary has finished hands the node over to its primary.
pub(crate) enum Behavior {
    Trigger(TriggerNode),
    Add(AddNode),
    Other(Box<dyn SignalNode>),
    /// The behavior was moved to another node.
    Ended,
}

impl Behavior {
    fn name(&self) -> &'static str {
        match self {
            Behavior::Trigger(_) => "trigger",
            Behavior::Add(add) => match add.strategy() {
                AddStrategy::Overlap => "trigger:add",
                AddStrategy::Gap { .. } => "trigger:add-after-gap",
            },
            Behavior::Other(node) => node.name(),
            Behavior::Ended => "ended",
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Behavior::Trigger(_) => NodeKind::Trigger,
            Behavior::Add(add) => NodeKind::Add(add.strategy()),
            Behavior::Other(node) => NodeKind::Other(node.name()),
            Behavior::Ended => NodeKind::Other("ended"),
        }
    }

    /// `origin` is where this behavior's sample indices start, counted from
    /// the node's start. It moves forward whenever an add hands over.
    fn fetch(&mut self, max_len: usize, origin: &mut u64) -> FetchResult {
        match self {
            Behavior::Trigger(trigger) => match trigger.fetch(max_len)? {
                TriggerFetch::Block(block) => Ok(block),
                TriggerFetch::Fired { add, block } => {
                    *self = Behavior::Add(add);
                    match block {
                        Some(block) => Ok(Some(block)),
                        // Nothing before the edge: the add fills this call.
                        // `self` is no longer a trigger, so this recurses once.
                        None => self.fetch(max_len, origin),
                    }
                }
            },
            Behavior::Add(add) => match add.take_primary(max_len)? {
                Some(primary) => {
                    *origin += add.base();
                    debug!(origin = *origin, "add handed over to its primary");
                    *self = primary;
                    self.fetch(max_len, origin)
                }
                None => add.fetch(max_len),
            },
            Behavior::Other(node) => node.fetch(max_len),
            Behavior::Ended => Ok(None),
        }
    }

    fn trace(&self, visitor: &mut dyn Visitor) {
        match self {
            Behavior::Trigger(trigger) => trigger.trace(visitor),
            Behavior::Add(add) => add.trace(visitor),
            Behavior::Other(node) => node.trace(visitor),
            Behavior::Ended => {}
        }
    }

    fn logical_stop(&self) -> Option<u64> {
        match self {
            Behavior::Trigger(trigger) => trigger.logical_stop(),
            Behavior::Add(add) => add.logical_stop(),
            Behavior::Other(node) => node.logical_stop(),
            Behavior::Ended => Some(0),
        }
    }

    fn terminate_at(&self) -> Option<u64> {
        match self {
            Behavior::Trigger(trigger) => trigger.terminate_at(),
            Behavior::Add(_) => None,
            Behavior::Other(node) => node.terminate_at(),
            Behavior::Ended => Some(0),
        }
    }
}

struct NodeCell {
    behavior: Behavior,
    /// Start of `behavior`'s sample indices, from the node's start.
    origin: u64,
    /// Samples produced so far.
    produced: u64,
}

impl Drop for NodeCell {
    fn drop(&mut self) {
        trace!(node = self.behavior.name(), produced = self.produced, "releasing node");
    }
}

/// Shared handle to a node. Cloning keeps the identity.
#[derive(Clone)]
pub(crate) struct Node(Rc<RefCell<NodeCell>>);

impl Node {
    pub(crate) fn new(behavior: Behavior) -> Self {
        Node(Rc::new(RefCell::new(NodeCell {
            behavior,
            origin: 0,
            produced: 0,
        })))
    }

    /// Stable identity, unaffected by transmutation.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Number of handles sharing this node.
    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn fetch(&self, max_len: usize) -> FetchResult {
        SampleBlock::check_len(max_len)?;
        let mut guard = self.0.try_borrow_mut().map_err(|_| StreamError::Busy)?;
        let cell = &mut *guard;
        let fetched = cell.behavior.fetch(max_len, &mut cell.origin)?;
        if let Some(block) = &fetched {
            cell.produced += block.len() as u64;
        }
        trace!(
            node = cell.behavior.name(),
            len = fetched.as_ref().map(SampleBlock::len),
            "fetched"
        );
        Ok(fetched)
    }

    /// Leave the node ended and return what it was doing.
    pub(crate) fn take_behavior(&self) -> Option<Behavior> {
        let mut cell = self.0.try_borrow_mut().ok()?;
        Some(mem::replace(&mut cell.behavior, Behavior::Ended))
    }

    /// Name, or `"busy"` while the node is being fetched.
    pub(crate) fn name(&self) -> &'static str {
        self.0
            .try_borrow()
            .map(|cell| cell.behavior.name())
            .unwrap_or("busy")
    }

    /// `None` while the node is being fetched.
    pub(crate) fn kind(&self) -> Option<NodeKind> {
        self.0.try_borrow().ok().map(|cell| cell.behavior.kind())
    }

    pub(crate) fn produced(&self) -> u64 {
        self.0.try_borrow().map(|cell| cell.produced).unwrap_or(0)
    }

    /// Does nothing while the node is being fetched.
    pub(crate) fn trace(&self, visitor: &mut dyn Visitor) {
        if let Ok(cell) = self.0.try_borrow() {
            cell.behavior.trace(visitor);
        }
    }

    pub(crate) fn logical_stop(&self) -> Option<u64> {
        let cell = self.0.try_borrow().ok()?;
        cell.behavior.logical_stop().map(|stop| cell.origin + stop)
    }

    pub(crate) fn terminate_at(&self) -> Option<u64> {
        let cell = self.0.try_borrow().ok()?;
        cell.behavior.terminate_at().map(|stop| cell.origin + stop)
    }
}
