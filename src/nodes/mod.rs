//! Built-in signal nodes.
//!
//! ## Sources ([`source`])
//!
//! Produce samples without reading other streams:
//! - [`Samples`] - Play a finite, pre-computed signal
//! - [`Constant`] - A fixed value, endless or for a set number of samples
//!
//! ## Effects ([`effect`])
//!
//! Read one or more streams:
//! - [`create_trigger`] - Silence until the input rises, then add a closure's sound
//! - [`AddNode`] - Sum of two streams (what a trigger becomes when it fires)
//! - [`Normalize`] - Applies a stream's scale factor

pub mod effect;
pub mod source;

// Re-export common types at the top level for convenience
pub use effect::{create_trigger, AddNode, AddStrategy, Normalize};
pub use source::{Constant, Samples};

pub(crate) use effect::{TriggerFetch, TriggerNode};
