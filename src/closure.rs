//! Deferred computations that produce sounds.
//!
//! A [`Closure`] is opaque to the graph: a trigger only hands it, together
//! with the time of the edge, to a [`ClosureEvaluator`]. Whatever engine built
//! the closure decides how to run it. [`NativeEvaluator`] runs closures made
//! from plain Rust functions with [`Closure::from_fn`].

use core::any::Any;
use core::fmt;
use std::rc::Rc;

use crate::error::StreamError;
use crate::stream::SoundStream;

/// An opaque "compute a sound starting at a given time".
///
/// Cloning shares the payload.
#[derive(Clone)]
pub struct Closure(Rc<dyn Any>);

/// Payload of closures built with [`Closure::from_fn`].
struct NativeFn(Box<dyn Fn(f64) -> Value>);

impl Closure {
    /// Wrap an arbitrary payload for an external evaluator.
    pub fn new<T: Any>(payload: T) -> Self {
        Closure(Rc::new(payload))
    }

    /// A closure that [`NativeEvaluator`] can run.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(f64) -> Value + 'static,
    {
        Closure::new(NativeFn(Box::new(f)))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Number of live references to the payload.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// What evaluating a closure can produce.
pub enum Value {
    Sound(SoundStream),
    /// A multichannel sound; triggers only accept mono.
    Sounds(Vec<SoundStream>),
    Number(f64),
    Nil,
}

impl Value {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Sound(_) => "a sound".into(),
            Value::Sounds(channels) => format!("a {}-channel sound", channels.len()),
            Value::Number(n) => format!("the number {}", n),
            Value::Nil => "nil".into(),
        }
    }
}

/// Runs closures on behalf of the graph.
pub trait ClosureEvaluator {
    /// Evaluate `closure` for a sound starting at `now` (seconds).
    fn evaluate(&self, closure: &Closure, now: f64) -> Result<Value, StreamError>;
}

/// Evaluates closures built with [`Closure::from_fn`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeEvaluator;

impl ClosureEvaluator for NativeEvaluator {
    fn evaluate(&self, closure: &Closure, now: f64) -> Result<Value, StreamError> {
        let native = closure
            .downcast_ref::<NativeFn>()
            .ok_or_else(|| StreamError::Evaluation {
                time: now,
                reason: "closure is not a native function".into(),
            })?;
        Ok((native.0)(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_closures_see_the_evaluation_time() {
        let closure = Closure::from_fn(Value::Number);
        match NativeEvaluator.evaluate(&closure, 2.5) {
            Ok(Value::Number(t)) => assert_eq!(t, 2.5),
            _ => panic!("expected the evaluation time back"),
        }
    }

    #[test]
    fn foreign_payloads_are_rejected() {
        let closure = Closure::new("(lambda (t) (osc 60))");
        assert_eq!(
            closure.downcast_ref::<&str>(),
            Some(&"(lambda (t) (osc 60))")
        );
        assert!(matches!(
            NativeEvaluator.evaluate(&closure, 0.0),
            Err(StreamError::Evaluation { .. })
        ));
    }

    #[test]
    fn clones_share_the_payload() {
        let closure = Closure::from_fn(|_| Value::Nil);
        let copy = closure.clone();
        assert_eq!(closure.ref_count(), 2);
        drop(copy);
        assert_eq!(closure.ref_count(), 1);
    }
}
