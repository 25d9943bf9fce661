//! Closure-driven trigger.
//!
//! A trigger outputs zeros until its input goes from `<= 0` to `> 0`. At that
//! sample it evaluates its closure for the time of the edge and becomes, in
//! place, an add of the closure's sound and a fresh trigger that carries on
//! reading the input. Anything holding the trigger's stream keeps working and
//! from then on reads the sum.
//!
//! The fresh trigger starts on the triggering sample itself, so the add reads
//! both summands from the same instant. It already remembers that sample as
//! the previous one, so it emits a zero for it instead of firing again. It
//! also takes over the closure, so the next rising edge fires again, in the
//! fresh trigger.

use std::rc::Rc;

use tracing::debug;

use crate::block::SampleBlock;
use crate::closure::{Closure, ClosureEvaluator, Value};
use crate::error::StreamError;
use crate::node::Behavior;
use crate::nodes::AddNode;
use crate::stream::{Cursor, SoundStream};
use crate::trace::Visitor;

/// Build a trigger on a private copy of `input`.
///
/// The caller's `input` handle is left where it was and can still be read.
/// An input with a scale other than 1 is normalized first.
///
/// ```
/// use std::rc::Rc;
/// use funke::{create_trigger, nodes::{Constant, Samples}};
/// use funke::{Closure, NativeEvaluator, NodeKind, SoundStream, Value};
///
/// let control = SoundStream::new(Samples::new(vec![-1.0, 1.0]), 100.0, 0.0).unwrap();
/// let click = Closure::from_fn(|now| {
///     Value::Sound(SoundStream::new(Constant::new(1.0).with_len(1), 100.0, now).unwrap())
/// });
/// let mut out = create_trigger(&control, click, Rc::new(NativeEvaluator));
/// assert_eq!(out.kind(), Some(NodeKind::Trigger));
///
/// let first = out.read_block(64).unwrap().unwrap();
/// assert_eq!(first.as_slice(), &[0.0]);
/// assert!(matches!(out.kind(), Some(NodeKind::Add(_))));
/// ```
pub fn create_trigger(
    input: &SoundStream,
    closure: Closure,
    evaluator: Rc<dyn ClosureEvaluator>,
) -> SoundStream {
    let input = input.normalized();
    let sample_rate = input.sample_rate();
    let start_time = input.start_time();
    let trigger = TriggerNode {
        terminate_at: input.terminate_at(),
        logical_stop: input.logical_stop(),
        input,
        cursor: Cursor::default(),
        previous: 0.0,
        current: 0,
        start_time,
        sample_rate,
        closure: Some(closure),
        evaluator,
    };
    SoundStream::from_behavior(Behavior::Trigger(trigger), sample_rate, start_time)
}

/// What a trigger's fetch produced.
pub(crate) enum TriggerFetch {
    /// Zeros, or `None` once the input has ended.
    Block(Option<SampleBlock>),
    /// The trigger fired. `block` holds the zeros produced before the edge,
    /// `None` if the edge was the first sample of the call.
    Fired { add: AddNode, block: Option<SampleBlock> },
}

pub(crate) struct TriggerNode {
    input: SoundStream,
    cursor: Cursor,
    previous: f32,
    /// Samples produced so far.
    current: u64,
    terminate_at: Option<u64>,
    logical_stop: Option<u64>,
    start_time: f64,
    sample_rate: f64,
    /// `None` once this trigger has fired.
    closure: Option<Closure>,
    evaluator: Rc<dyn ClosureEvaluator>,
}

impl TriggerNode {
    pub(crate) fn fetch(&mut self, max_len: usize) -> Result<TriggerFetch, StreamError> {
        // the block starts out silent, so zeros need no writing
        let mut out = SampleBlock::new();
        let mut cnt = 0;
        let mut togo = 0;

        while cnt < max_len {
            togo = max_len - cnt;

            // don't run past the input block
            let available = self.cursor.fill(&mut self.input, max_len)?;
            if available == 0 {
                self.terminate_at = Some(self.current + cnt as u64);
                togo = 0;
                break;
            }
            togo = togo.min(available);

            // don't run past the termination index
            if let Some(stop) = self.terminate_at {
                let here = self.current + cnt as u64;
                if stop <= here + togo as u64 {
                    togo = stop.saturating_sub(here) as usize;
                    if togo == 0 {
                        break;
                    }
                }
            }

            let edge = self.cursor.samples()[..togo]
                .iter()
                .position(|&s| {
                    let rising = self.previous <= 0.0 && s > 0.0;
                    self.previous = s;
                    rising
                });

            if let Some(before) = edge {
                // the continuation re-reads the triggering sample
                self.cursor.advance(before);
                cnt += before;
                self.current += cnt as u64;
                let now = self.start_time + self.current as f64 / self.sample_rate;
                let add = self.fire(now)?;
                let block = if cnt > 0 {
                    out.set_len(cnt);
                    Some(out)
                } else {
                    None
                };
                return Ok(TriggerFetch::Fired { add, block });
            }

            self.cursor.advance(togo);
            cnt += togo;
        }

        if togo == 0 && cnt == 0 {
            return Ok(TriggerFetch::Block(None));
        }
        out.set_len(cnt);
        self.current += cnt as u64;
        Ok(TriggerFetch::Block(Some(out)))
    }

    /// Evaluate the closure for `now` and build the add this trigger becomes.
    fn fire(&mut self, now: f64) -> Result<AddNode, StreamError> {
        let closure = match &self.closure {
            Some(closure) => closure,
            None => {
                return Err(StreamError::Evaluation {
                    time: now,
                    reason: "trigger has no closure".into(),
                })
            }
        };
        debug!(now, current = self.current, "trigger evaluating closure");

        let sound = match self.evaluator.evaluate(closure, now)? {
            Value::Sound(sound) => sound.normalized(),
            other => {
                return Err(StreamError::Evaluation {
                    time: now,
                    reason: format!(
                        "closure did not return a monophonic sound, got {}",
                        other.describe()
                    ),
                })
            }
        };
        if sound.sample_rate() != self.sample_rate {
            return Err(StreamError::RateMismatch {
                expected: self.sample_rate,
                found: sound.sample_rate(),
            });
        }

        let continuation = TriggerNode {
            input: self.input.clone(),
            cursor: self.cursor.clone(),
            previous: self.previous,
            current: 0,
            terminate_at: self.terminate_at.map(|stop| stop.saturating_sub(self.current)),
            logical_stop: self.logical_stop.map(|stop| stop.saturating_sub(self.current)),
            start_time: now,
            sample_rate: self.sample_rate,
            closure: self.closure.take(),
            evaluator: self.evaluator.clone(),
        };
        let primary = SoundStream::from_behavior(Behavior::Trigger(continuation), self.sample_rate, now);

        let offset = ((sound.start_time() - now) * self.sample_rate).round() as i64;
        debug!(now, offset, "trigger fired");
        Ok(AddNode::new(primary, sound, offset, self.current))
    }

    pub(crate) fn trace(&self, visitor: &mut dyn Visitor) {
        visitor.visit_stream(&self.input);
        if let Some(closure) = &self.closure {
            visitor.visit_closure(closure);
        }
    }

    pub(crate) fn logical_stop(&self) -> Option<u64> {
        self.logical_stop
    }

    pub(crate) fn terminate_at(&self) -> Option<u64> {
        self.terminate_at
    }
}
