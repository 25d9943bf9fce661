mod add;
mod normalize;
mod trigger;

pub use add::*;
pub use normalize::*;
pub use trigger::create_trigger;
pub(crate) use trigger::{TriggerFetch, TriggerNode};
