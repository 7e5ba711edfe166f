//! Motorcycle rider monitoring on top of per-frame object detections.
//!
//! Riders are assigned to motorcycles by polygon IoU, each motorcycle and its
//! riders are wrapped in a convex region, regions are checked for triple riding
//! and tracked across frames together with the other vehicles and helmets.
pub mod config;
pub mod mot;
pub mod pipeline;
pub mod rider;
pub mod utils;
