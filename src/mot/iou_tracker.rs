use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use log::debug;

use crate::mot::blob::Blob;
use crate::mot::mot_errors;
use crate::mot::{DistanceBlob, Track, TrackInput, TrackState, Tracker};
use crate::utils::iou;

/// Multi-object tracker (MOT) with IoU matching against Kalman-predicted boxes.
///
/// Tracks start tentative, get confirmed after `min_hits` consecutive matches
/// and are deleted when missed: immediately while tentative, after more than
/// `max_age` frames once confirmed. Detections only match tracks of the same label.
pub struct IoUTracker<B: Blob> {
    // Max number of frames a confirmed object may stay unmatched. Default is 30
    max_age: usize,
    // Consecutive matches needed for confirmation. Default is 3
    min_hits: usize,
    // Max length of each object's center history. Default is 100
    history_budget: usize,
    // IoU threshold for matching. Default is 0.3
    iou_threshold: f32,
    // Time between frames, seconds
    dt: f32,
    next_id: u64,
    // Storage
    pub objects: BTreeMap<u64, B>,
}

impl<B: Blob> IoUTracker<B> {
    /// Creates default instance of IoUTracker
    ///
    /// Basic usage:
    ///
    /// ```
    /// use rider_watch::mot::{IoUTracker, SimpleBlob};
    /// let mut tracker: IoUTracker<SimpleBlob> = IoUTracker::default();
    /// ```
    pub fn default() -> Self {
        IoUTracker::new(30, 3, 100, 0.3, 1.0 / 25.0)
    }
    /// Creates news instance of IoUTracker
    ///
    /// Basic usage:
    ///
    /// ```
    /// use rider_watch::mot::{IoUTracker, SimpleBlob};
    /// let max_age: usize = 30;
    /// let min_hits: usize = 3;
    /// let history_budget: usize = 100;
    /// let iou_threshold: f32 = 0.3;
    /// let dt: f32 = 1.0 / 25.0;
    /// let mut tracker: IoUTracker<SimpleBlob> = IoUTracker::new(max_age, min_hits, history_budget, iou_threshold, dt);
    /// ```
    pub fn new(max_age: usize, min_hits: usize, history_budget: usize, iou_threshold: f32, dt: f32) -> Self {
        IoUTracker {
            max_age,
            min_hits: min_hits.max(1),
            history_budget,
            iou_threshold,
            dt,
            next_id: 1,
            objects: BTreeMap::new(),
        }
    }
    // Matches new objects to existing ones
    pub fn match_objects(&mut self, new_objects: Vec<B>) -> Result<(), mot_errors::TrackerError> {
        // Advance every track to the current frame
        for (_, object) in self.objects.iter_mut() {
            object.predict_next_position();
        }

        // Add new objects to priority queue
        let mut priority_queue: BinaryHeap<Reverse<DistanceBlob<B>>> = BinaryHeap::new();
        for (order, new_object) in new_objects.into_iter().enumerate() {
            // Find existing blob of the same class with max IoU to the new one
            let mut max_id = None;
            let mut max_iou = 0.0;
            for (j, object) in self.objects.iter() {
                if object.get_label() != new_object.get_label() {
                    continue;
                }
                let iou_value = iou(&new_object.get_bbox(), &object.get_predicted_bbox());
                if iou_value > max_iou {
                    max_iou = iou_value;
                    max_id = Some(*j);
                }
            }
            priority_queue.push(Reverse(DistanceBlob {
                distance_metric_value: max_iou,
                min_id: max_id,
                order,
                blob: new_object,
            }));
        }

        // We need to prevent double update of objects
        let mut reserved_objects: HashSet<u64> = HashSet::new();
        let mut blobs_to_register: Vec<(usize, B)> = Vec::new();

        // Best overlaps are served first. Later detections pointing to an already
        // reserved object become new objects
        while let Some(Reverse(distance_blob)) = priority_queue.pop() {
            let track_id = match distance_blob.min_id {
                Some(id) if distance_blob.distance_metric_value > self.iou_threshold && !reserved_objects.contains(&id) => id,
                _ => {
                    blobs_to_register.push((distance_blob.order, distance_blob.blob));
                    continue;
                }
            };
            let object = self.objects.get_mut(&track_id).ok_or_else(|| mot_errors::NoObjectInTracker {
                txt: format!(
                    "impossible self.objects.get_mut(&track_id). Object ID {}. IoU value: {}",
                    track_id, distance_blob.distance_metric_value
                ),
            })?;
            object.update(&distance_blob.blob)?;
            object.reset_no_match();
            if object.get_state() == TrackState::Tentative && object.get_hits() >= self.min_hits {
                object.set_state(TrackState::Confirmed);
                debug!("Track {} ({}) confirmed", track_id, object.get_label());
            }
            reserved_objects.insert(track_id);
        }

        // Handle unmatched objects
        for (id, object) in self.objects.iter_mut() {
            if reserved_objects.contains(id) {
                continue;
            }
            object.inc_no_match();
            let expired = match object.get_state() {
                TrackState::Tentative => true,
                TrackState::Confirmed => object.get_no_match_times() > self.max_age,
                TrackState::Deleted => true,
            };
            if expired {
                object.set_state(TrackState::Deleted);
            }
        }

        // Clean up existing data
        self.objects.retain(|id, object| {
            let delete = object.get_state() == TrackState::Deleted;
            if delete {
                debug!("Track {} ({}) deleted", id, object.get_label());
            }
            !delete // <- if we want to keep object closure should return true
        });

        // Otherwise register objects as new ones, ids follow input order
        blobs_to_register.sort_by_key(|(order, _)| *order);
        for (_, mut blob) in blobs_to_register {
            blob.set_max_track_len(self.history_budget);
            if blob.get_hits() >= self.min_hits {
                blob.set_state(TrackState::Confirmed);
            }
            let id = self.next_id;
            self.next_id += 1;
            debug!("Track {} ({}) created", id, blob.get_label());
            self.objects.insert(id, blob);
        }
        Ok(())
    }
    /// Snapshot of every live track, ordered by id
    pub fn tracks(&self) -> Vec<Track> {
        self.objects
            .iter()
            .map(|(id, object)| Track {
                id: *id,
                rect: object.get_bbox(),
                label: object.get_label().to_string(),
                confidence: object.get_confidence(),
                state: object.get_state(),
                misses: object.get_no_match_times(),
            })
            .collect()
    }
}

impl<B: Blob, F: ?Sized> Tracker<F> for IoUTracker<B> {
    fn update(&mut self, detections: &[TrackInput], _frame: &F) -> Result<Vec<Track>, mot_errors::TrackerError> {
        for detection in detections {
            let r = &detection.rect;
            let finite = r.x.is_finite() && r.y.is_finite() && r.width.is_finite() && r.height.is_finite();
            if !finite || r.width < 0.0 || r.height < 0.0 {
                return Err(mot_errors::TrackerError::BadInput(format!(
                    "Rectangle {:?} of '{}' must be finite with non-negative size",
                    r, detection.label
                )));
            }
        }
        let blobs: Vec<B> = detections.iter().map(|d| B::from_input(d, self.dt)).collect();
        self.match_objects(blobs)?;
        Ok(self.tracks())
    }
}

use std::fmt;
impl<B: Blob> fmt::Display for IoUTracker<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Maximum age: {}\n\tMinimum hits: {}\n\tHistory budget: {}\n\tIoU threshold: {}",
            self.max_age, self.min_hits, self.history_budget, self.iou_threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mot::SimpleBlob;
    use crate::utils::Rect;

    fn input(x: f32, y: f32, label: &str) -> TrackInput {
        TrackInput::new(Rect::new(x, y, 40.0, 60.0), 0.6, label)
    }

    fn confirmed(tracks: &[Track]) -> Vec<&Track> {
        tracks.iter().filter(|t| t.is_confirmed()).collect()
    }

    #[test]
    fn test_identity_persists_across_frames() {
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::new(5, 3, 100, 0.3, 1.0 / 25.0);
        let (xs_one, xs_two) = (
            (0..10).map(|i| 100.0 + i as f32 * 2.0).collect::<Vec<f32>>(),
            (0..10).map(|i| 400.0 - i as f32 * 2.0).collect::<Vec<f32>>(),
        );
        let mut last = Vec::new();
        for (x_one, x_two) in itertools::izip!(xs_one, xs_two) {
            last = mot.update(&[input(x_one, 100.0, "Car"), input(x_two, 100.0, "Region")], &()).unwrap();
        }
        assert_eq!(last.len(), 2);
        assert_eq!(last.iter().map(|t| t.id).collect::<Vec<u64>>(), vec![1, 2]);
        assert!(last.iter().all(|t| t.is_confirmed()));
        assert_eq!(last[0].label, "Car");
        assert_eq!(last[1].label, "Region");
    }

    #[test]
    fn test_confirmation_needs_min_hits() {
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::new(5, 3, 100, 0.3, 1.0 / 25.0);
        let first = mot.update(&[input(100.0, 100.0, "Car")], &()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].state, TrackState::Tentative);
        assert_eq!(first[0].confidence, 0.6);
        let second = mot.update(&[input(101.0, 100.0, "Car")], &()).unwrap();
        assert!(confirmed(&second).is_empty());
        let third = mot.update(&[input(102.0, 100.0, "Car")], &()).unwrap();
        assert_eq!(confirmed(&third).len(), 1);
        assert_eq!(third[0].id, 1);
    }

    #[test]
    fn test_tentative_track_dies_on_first_miss() {
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::new(5, 3, 100, 0.3, 1.0 / 25.0);
        mot.update(&[input(100.0, 100.0, "Car")], &()).unwrap();
        let tracks = mot.update(&[], &()).unwrap();
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_confirmed_track_ages_out() {
        let max_age = 4;
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::new(max_age, 2, 100, 0.3, 1.0 / 25.0);
        mot.update(&[input(100.0, 100.0, "Car")], &()).unwrap();
        mot.update(&[input(100.0, 100.0, "Car")], &()).unwrap();
        for miss in 1..=max_age {
            let tracks = mot.update(&[], &()).unwrap();
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].misses, miss);
            assert!(tracks[0].is_confirmed());
        }
        assert!(mot.update(&[], &()).unwrap().is_empty());
    }

    #[test]
    fn test_labels_do_not_mix() {
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::new(5, 1, 100, 0.3, 1.0 / 25.0);
        mot.update(&[input(100.0, 100.0, "Helmet")], &()).unwrap();
        let tracks = mot.update(&[input(100.0, 100.0, "No_Helmet")], &()).unwrap();
        // Helmet track was confirmed at once (min_hits = 1) and survives one miss,
        // the overlapping bare-head detection opens its own track
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].label, "Helmet");
        assert_eq!(tracks[1].label, "No_Helmet");
    }

    #[test]
    fn test_one_detection_per_track() {
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::new(5, 1, 100, 0.3, 1.0 / 25.0);
        mot.update(&[input(100.0, 100.0, "Car")], &()).unwrap();
        let tracks = mot
            .update(&[input(100.0, 100.0, "Car"), input(104.0, 100.0, "Car")], &())
            .unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, 1);
        assert_eq!(tracks[0].misses, 0);
        assert_eq!(tracks[1].id, 2);
    }

    #[test]
    fn test_rejects_bad_rectangles() {
        let mut mot: IoUTracker<SimpleBlob> = IoUTracker::default();
        let bad = TrackInput::new(Rect::new(f32::NAN, 0.0, 10.0, 10.0), 0.6, "Car");
        assert!(mot.update(&[bad], &()).is_err());
        let negative = TrackInput::new(Rect::new(0.0, 0.0, -1.0, 10.0), 0.6, "Car");
        assert!(mot.update(&[negative], &()).is_err());
    }
}
