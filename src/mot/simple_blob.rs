use kalman_rust::kalman::Kalman2D;

use crate::mot::blob::Blob;
use crate::mot::mot_errors;
use crate::mot::{TrackInput, TrackState};
use crate::utils::{Point, Rect};

/// Tracked object whose center is smoothed by a 2D Kalman filter.
/// Size follows the latest matched detection.
#[derive(Debug, Clone)]
pub struct SimpleBlob {
    current_bbox: Rect,
    current_center: Point,
    predicted_next_position: Point,
    track: Vec<Point>,
    max_track_len: usize,
    state: TrackState,
    hits: usize,
    no_match_times: usize,
    tracker: Kalman2D,
    label: String,
    confidence: f32,
}

impl SimpleBlob {
    pub fn new_with_dt(bbox: Rect, label: &str, confidence: f32, dt: f32) -> Self {
        let center = bbox.center();
        // No control input: road users do not accelerate in a known direction
        let (ux, uy) = (0.0, 0.0);
        let std_dev_a = 2.0;
        let std_dev_mx = 0.1;
        let std_dev_my = 0.1;
        let kf = Kalman2D::new_with_state(dt, ux, uy, std_dev_a, std_dev_mx, std_dev_my, center.x, center.y);
        SimpleBlob {
            current_bbox: bbox,
            current_center: center,
            predicted_next_position: center,
            track: vec![center],
            max_track_len: 100,
            state: TrackState::Tentative,
            hits: 1,
            no_match_times: 0,
            tracker: kf,
            label: label.to_string(),
            confidence,
        }
    }
    pub fn new(bbox: Rect, label: &str) -> Self {
        SimpleBlob::new_with_dt(bbox, label, 1.0, 1.0)
    }
    /// Box of the current size placed at the predicted center
    pub fn get_predicted_bbox(&self) -> Rect {
        Rect::new(
            self.predicted_next_position.x - self.current_bbox.width / 2.0,
            self.predicted_next_position.y - self.current_bbox.height / 2.0,
            self.current_bbox.width,
            self.current_bbox.height,
        )
    }
    /// Advances the filter one frame. Only the predicted center changes.
    pub fn predict_next_position(&mut self) {
        self.tracker.predict();
        let (state_x, state_y) = self.tracker.get_state();
        self.predicted_next_position = Point::new(state_x, state_y);
    }
    /// Corrects the filter with a matched detection: center is filtered, size is taken as measured
    pub fn update(&mut self, newb: &SimpleBlob) -> Result<(), mot_errors::TrackerError> {
        self.tracker
            .update(newb.current_center.x, newb.current_center.y)?;

        let (state_x, state_y) = self.tracker.get_state();
        self.current_center = Point::new(state_x, state_y);
        self.current_bbox = Rect::new(
            state_x - newb.current_bbox.width / 2.0,
            state_y - newb.current_bbox.height / 2.0,
            newb.current_bbox.width,
            newb.current_bbox.height,
        );
        self.predicted_next_position = self.current_center;
        self.label = newb.label.clone();
        self.confidence = newb.confidence;
        self.hits += 1;
        self.no_match_times = 0;

        self.track.push(self.current_center);
        if self.track.len() > self.max_track_len {
            let excess = self.track.len() - self.max_track_len;
            self.track.drain(..excess);
        }

        Ok(())
    }
}

impl Blob for SimpleBlob {
    fn from_input(input: &TrackInput, dt: f32) -> Self {
        SimpleBlob::new_with_dt(input.rect, &input.label, input.confidence, dt)
    }
    fn get_center(&self) -> Point { self.current_center }
    fn get_bbox(&self) -> Rect { self.current_bbox }
    fn get_predicted_bbox(&self) -> Rect { SimpleBlob::get_predicted_bbox(self) }
    fn get_label(&self) -> &str { &self.label }
    fn get_confidence(&self) -> f32 { self.confidence }
    fn track_len(&self) -> usize { self.track.len() }
    fn set_max_track_len(&mut self, max_track_len: usize) { self.max_track_len = max_track_len.max(1) }
    fn get_state(&self) -> TrackState { self.state }
    fn set_state(&mut self, state: TrackState) { self.state = state }
    fn get_hits(&self) -> usize { self.hits }
    fn get_no_match_times(&self) -> usize { self.no_match_times }
    fn inc_no_match(&mut self) { self.no_match_times += 1 }
    fn reset_no_match(&mut self) { self.no_match_times = 0 }
    fn predict_next_position(&mut self) { SimpleBlob::predict_next_position(self) }
    fn update(&mut self, measurement: &Self) -> Result<(), mot_errors::TrackerError> {
        SimpleBlob::update(self, measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_creation() {
        let blob = SimpleBlob::new_with_dt(Rect::new(100.0, 50.0, 40.0, 80.0), "Car", 0.6, 0.04);
        let center = blob.get_center();
        assert!((center.x - 120.0).abs() < 0.001);
        assert!((center.y - 90.0).abs() < 0.001);
        assert_eq!(blob.get_label(), "Car");
        assert_eq!(blob.get_hits(), 1);
        assert_eq!(blob.get_state(), TrackState::Tentative);
        assert_eq!(blob.track_len(), 1);
        // Nothing predicted yet: predicted box is the current box
        assert_eq!(blob.get_predicted_bbox(), Rect::new(100.0, 50.0, 40.0, 80.0));
    }

    #[test]
    fn test_blob_predict_update() {
        let dt = 0.04;
        let mut blob = SimpleBlob::new_with_dt(Rect::new(100.0, 50.0, 40.0, 80.0), "Region", 0.6, dt);
        blob.predict_next_position();
        let measurement = SimpleBlob::new_with_dt(Rect::new(102.0, 52.0, 42.0, 82.0), "Region", 0.6, dt);
        blob.update(&measurement).unwrap();

        let center = blob.get_center();
        assert!((center.x - 123.0).abs() < 5.0);
        assert!((center.y - 93.0).abs() < 5.0);
        let bbox = blob.get_bbox();
        assert_eq!(bbox.width, 42.0);
        assert_eq!(bbox.height, 82.0);
        assert_eq!(blob.get_hits(), 2);
        assert_eq!(blob.track_len(), 2);
    }

    #[test]
    fn test_history_budget() {
        let dt = 0.04;
        let mut blob = SimpleBlob::new_with_dt(Rect::new(0.0, 0.0, 10.0, 10.0), "Car", 0.6, dt);
        blob.set_max_track_len(3);
        for i in 1..10 {
            blob.predict_next_position();
            let measurement = SimpleBlob::new_with_dt(Rect::new(i as f32, 0.0, 10.0, 10.0), "Car", 0.6, dt);
            blob.update(&measurement).unwrap();
        }
        assert_eq!(blob.track_len(), 3);
    }
}
