//! Export contents of `pipeline` folder
mod pipeline_errors;
mod frame;
mod replay;

pub use self::{pipeline_errors::*, frame::*, replay::*};
