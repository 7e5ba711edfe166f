//! Export contents of `utils` folder
mod utils;
mod polygon;

pub use self::{
    utils::*,
    polygon::*,
};
