use crate::mot::mot_errors::TrackerError;
use crate::mot::{TrackInput, TrackState};
use crate::utils::{Point, Rect};

/// Common interface for tracked objects (blobs).
/// Enables generic trackers: `IoUTracker<B: Blob>`
///
/// Implementations:
/// - `SimpleBlob` - uses 4D Kalman (center position only)
pub trait Blob: Clone {
    /* Construction from a tracker input */
    fn from_input(input: &TrackInput, dt: f32) -> Self;
    /* Position and geometry */
    fn get_center(&self) -> Point;
    fn get_bbox(&self) -> Rect;
    fn get_predicted_bbox(&self) -> Rect;
    /* Class */
    fn get_label(&self) -> &str;
    fn get_confidence(&self) -> f32;
    /* Track management */
    fn track_len(&self) -> usize;
    fn set_max_track_len(&mut self, max_track_len: usize);
    /* Lifecycle */
    fn get_state(&self) -> TrackState;
    fn set_state(&mut self, state: TrackState);
    fn get_hits(&self) -> usize;
    /* No-match tracking (for object lifecycle) */
    fn get_no_match_times(&self) -> usize;
    fn inc_no_match(&mut self);
    fn reset_no_match(&mut self);
    /* Prediction and update */
    fn predict_next_position(&mut self);
    fn update(&mut self, measurement: &Self) -> Result<(), TrackerError>;
}
