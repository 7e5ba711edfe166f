//! Export contents of `rider` folder
mod detection;
mod assigner;
mod region;
mod classifier;

pub use self::{
    detection::*,
    assigner::*,
    region::*,
    classifier::*,
};
