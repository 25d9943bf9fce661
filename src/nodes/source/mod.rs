mod constant;
mod samples;

pub use constant::*;
pub use samples::*;
