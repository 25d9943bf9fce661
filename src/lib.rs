//! Lazily evaluated, pull-based mono sound streams.
//!
//! A [`SoundStream`] is a handle onto a node; reading it pulls blocks of at
//! most [`SampleBlock::CAPACITY`] samples out of the node on demand. Streams
//! are cheap to copy and copies share the blocks already computed.
//!
//! The interesting node is the trigger ([`create_trigger`],
//! [`SoundStream::trigger`]): it stays silent until its control input rises
//! above zero, then evaluates a [`Closure`] for the time of the edge and turns
//! itself into an add of the closure's sound and the rest of the trigger.
//!
//! ```
//! use funke::{nodes::{Constant, Samples}, Renderer, SoundStream, Value};
//!
//! let rate = 100.0;
//! let control = SoundStream::new(Samples::new(vec![-1.0, -1.0, 2.0, 3.0]), rate, 0.0).unwrap();
//! let out = control.trigger(move |now| {
//!     let next = now + 1.0 / rate; // one sample late
//!     Value::Sound(SoundStream::new(Constant::new(1.0).with_len(2), rate, next).unwrap())
//! });
//!
//! let samples = Renderer::new(out).render(64).unwrap();
//! assert_eq!(samples, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
//! ```

mod block;
mod closure;
mod error;
mod node;
pub mod nodes;
mod render;
mod stream;
mod trace;

pub use block::SampleBlock;
pub use closure::{Closure, ClosureEvaluator, NativeEvaluator, Value};
pub use error::StreamError;
pub use node::{FetchResult, NodeKind, SignalNode};
pub use nodes::create_trigger;
pub use render::Renderer;
pub use stream::SoundStream;
pub use trace::{Topology, Visitor};
