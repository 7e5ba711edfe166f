//! Export contents of `mot` folder
mod mot_errors;
mod track;
mod blob;
mod simple_blob;
mod simple_queue;
mod iou_tracker;
mod fusion;

pub use self::{
    mot_errors::*,
    track::*,
    blob::*,
    simple_blob::*,
    simple_queue::*,
    iou_tracker::*,
    fusion::*,
};
