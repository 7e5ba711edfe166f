use log::warn;
use serde::Serialize;

use crate::mot::{Track, TrackInput, Tracker, TrackerError};
use crate::rider::{Detection, DetectionClass, Group};
use crate::utils::{bounding_rect, BoundingBox, Rect};

/// Confirmed track with its class resolved back from the tracker label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedTrack {
    pub id: u64,
    pub class: DetectionClass,
    pub rect: Rect,
    /// Frames since the track was last matched
    pub misses: usize,
}

impl FusedTrack {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from(self.rect)
    }
}

/// Builds the single detection list handed to the tracker.
///
/// Vehicles other than motorcycles and head detections go through unchanged.
/// Motorcycles and riders are left out: each group contributes one `Region`
/// pseudo-detection, the bounding box of its region, instead.
/// Groups with an unusable region are skipped.
pub fn shape_detections(detections: &[Detection], groups: &[Group]) -> Vec<Detection> {
    let passthrough = detections.iter().filter(|d| match d.class {
        DetectionClass::Vehicle(_) => !d.class.is_motorcycle(),
        DetectionClass::Helmet | DetectionClass::NoHelmet => true,
        DetectionClass::Rider | DetectionClass::Region => false,
    });
    let regions = groups
        .iter()
        .filter(|group| group.region.is_usable())
        .filter_map(|group| bounding_rect(&group.region))
        .map(|bbox| Detection::new(DetectionClass::Region, bbox, 1.0));
    passthrough.copied().chain(regions).collect()
}

/// Feeds shaped detections to a tracker and surfaces its confirmed tracks
pub struct TrackFusion<T> {
    tracker: T,
    // Confidence submitted with every detection, whatever the detector said
    detection_confidence: f32,
}

impl<T> TrackFusion<T> {
    pub fn new(tracker: T, detection_confidence: f32) -> Self {
        TrackFusion {
            tracker,
            detection_confidence,
        }
    }
    pub fn tracker(&self) -> &T {
        &self.tracker
    }
    /// One tracker update per frame, frames must come in capture order
    pub fn fuse<F: ?Sized>(
        &mut self,
        detections: &[Detection],
        groups: &[Group],
        frame: &F,
    ) -> Result<Vec<FusedTrack>, TrackerError>
    where
        T: Tracker<F>,
    {
        let inputs: Vec<TrackInput> = shape_detections(detections, groups)
            .iter()
            .map(|d| TrackInput::new(Rect::from(d.bbox), self.detection_confidence, d.class.label()))
            .collect();
        let tracks = self.tracker.update(&inputs, frame)?;
        Ok(confirmed_tracks(tracks))
    }
}

fn confirmed_tracks(tracks: Vec<Track>) -> Vec<FusedTrack> {
    tracks
        .into_iter()
        .filter(|track| track.is_confirmed())
        .filter_map(|track| match DetectionClass::from_label(&track.label) {
            Some(class) => Some(FusedTrack {
                id: track.id,
                class,
                rect: track.rect,
                misses: track.misses,
            }),
            None => {
                warn!("Track {} has unknown label '{}', skipping", track.id, track.label);
                None
            }
        })
        .collect()
}
