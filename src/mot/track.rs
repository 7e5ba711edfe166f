use serde::Serialize;

use crate::mot::TrackerError;
use crate::utils::{BoundingBox, Rect};

/// Lifecycle of a track as managed by a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackState {
    /// Newly created, not enough consecutive matches yet
    #[default]
    Tentative,
    /// Matched often enough to be reported
    Confirmed,
    /// Missed for too long, about to be removed
    Deleted,
}

/// One detection as submitted to a tracker: corner-form box, confidence and class label
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInput {
    pub rect: Rect,
    pub confidence: f32,
    pub label: String,
}

impl TrackInput {
    pub fn new(rect: Rect, confidence: f32, label: &str) -> Self {
        TrackInput {
            rect,
            confidence,
            label: label.to_string(),
        }
    }
}

/// Tracker output for the current frame. Only valid until the next update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: u64,
    pub rect: Rect,
    pub label: String,
    /// Confidence of the last matched detection
    pub confidence: f32,
    pub state: TrackState,
    /// Frames since the track was last matched
    pub misses: usize,
}

impl Track {
    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from(self.rect)
    }
}

/// Multi-object tracker owning all cross-frame state.
///
/// Updates must be called in capture order: identities and ageing are defined
/// by the sequence of calls. `F` is the frame type, for trackers that look at pixels.
pub trait Tracker<F: ?Sized> {
    fn update(&mut self, detections: &[TrackInput], frame: &F) -> Result<Vec<Track>, TrackerError>;
}
