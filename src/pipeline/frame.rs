use log::{debug, info};
use serde::Serialize;

use crate::config::RiderWatchConfig;
use crate::mot::{FusedTrack, TrackFusion, Tracker};
use crate::pipeline::{DetectorError, FrameError};
use crate::rider::{
    center_in_region, helmet_crop, to_full_frame, Assigner, Detection, DetectionClass, Group, Violation,
    ViolationClassifier,
};
use crate::utils::Rect;

/// Object detector over frames of type `F`.
///
/// With `roi` set the detector only looks inside that rectangle and returns
/// boxes in its local coordinates (origin at the rectangle's top-left corner).
pub trait Detector<F: ?Sized> {
    fn detect(&mut self, frame: &F, roi: Option<&Rect>) -> Result<Vec<Detection>, DetectorError>;
}

/// Everything found in one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub groups: Vec<Group>,
    /// Head detections in full-frame coordinates
    pub helmets: Vec<Detection>,
    pub violations: Vec<Violation>,
    /// Confirmed tracks only
    pub tracks: Vec<FusedTrack>,
}

/// Per-frame driver: three detectors, assignment, classification and track fusion.
///
/// Owns the tracker, so frames must be processed in capture order.
pub struct FrameOrchestrator<V, R, H, T> {
    vehicle_detector: V,
    rider_detector: R,
    helmet_detector: H,
    assigner: Assigner,
    classifier: ViolationClassifier,
    fusion: TrackFusion<T>,
    flag_no_helmet: bool,
    helmets_inside_region_only: bool,
    frame_index: u64,
}

impl<V, R, H, T> FrameOrchestrator<V, R, H, T> {
    pub fn new(vehicle_detector: V, rider_detector: R, helmet_detector: H, tracker: T, cfg: &RiderWatchConfig) -> Self {
        FrameOrchestrator {
            vehicle_detector,
            rider_detector,
            helmet_detector,
            assigner: cfg.build_assigner(),
            classifier: cfg.build_classifier(),
            fusion: TrackFusion::new(tracker, cfg.fusion.detection_confidence),
            flag_no_helmet: cfg.classifier.flag_no_helmet,
            helmets_inside_region_only: cfg.classifier.helmets_inside_region_only,
            frame_index: 0,
        }
    }
    pub fn tracker(&self) -> &T {
        self.fusion.tracker()
    }
    /// Number of frames processed so far, failed ones included
    pub fn frames_seen(&self) -> u64 {
        self.frame_index
    }
    pub fn process<F: ?Sized>(&mut self, frame: &F) -> Result<FrameReport, FrameError>
    where
        V: Detector<F>,
        R: Detector<F>,
        H: Detector<F>,
        T: Tracker<F>,
    {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let (motorcycles, other_vehicles): (Vec<Detection>, Vec<Detection>) = self
            .vehicle_detector
            .detect(frame, None)?
            .into_iter()
            .filter(|d| matches!(d.class, DetectionClass::Vehicle(_)))
            .partition(|d| d.class.is_motorcycle());
        let riders: Vec<Detection> = self
            .rider_detector
            .detect(frame, None)?
            .into_iter()
            .filter(|d| d.class == DetectionClass::Rider)
            .collect();

        let assignment = self.assigner.assign(&motorcycles, &riders);
        debug!(
            "Frame {}: {} motorcycles, {} of {} riders assigned",
            frame_index,
            motorcycles.len(),
            assignment.assigned_count(),
            riders.len()
        );

        let mut groups = Vec::with_capacity(assignment.len());
        let mut helmets = Vec::new();
        let mut violations = Vec::new();
        for entry in assignment.entries {
            let group = Group::new(entry.motorcycle, entry.riders);
            if !group.region.is_usable() {
                debug!("Frame {}: degenerate region around {:?}, skipping", frame_index, group.motorcycle);
                continue;
            }
            let heads = self.detect_heads(frame, &group)?;
            let no_helmet_count = heads.iter().filter(|d| d.class == DetectionClass::NoHelmet).count();
            if let Some(violation) = self.classifier.classify(&group, heads.len()) {
                violations.push(violation);
            }
            if self.flag_no_helmet {
                if let Some(violation) = self.classifier.classify_helmet_use(&group, no_helmet_count) {
                    violations.push(violation);
                }
            }
            // Overlapping crops see the same head more than once, report it once
            for head in heads {
                if !helmets.iter().any(|seen| same_detection(seen, &head)) {
                    helmets.push(head);
                }
            }
            groups.push(group);
        }

        let mut tracked = other_vehicles;
        tracked.extend(helmets.iter().copied());
        let tracks = self.fusion.fuse(&tracked, &groups, frame)?;

        if !violations.is_empty() {
            info!("Frame {}: {} violation(s)", frame_index, violations.len());
        }
        debug!("Frame {}: {} groups, {} confirmed tracks", frame_index, groups.len(), tracks.len());
        Ok(FrameReport {
            frame_index,
            groups,
            helmets,
            violations,
            tracks,
        })
    }
    // Head detections for one group, back in full-frame coordinates
    fn detect_heads<F: ?Sized>(&mut self, frame: &F, group: &Group) -> Result<Vec<Detection>, DetectorError>
    where
        H: Detector<F>,
    {
        let crop = match helmet_crop(&group.region) {
            Some(crop) => crop,
            None => return Ok(Vec::new()),
        };
        let heads = self
            .helmet_detector
            .detect(frame, Some(&crop))?
            .iter()
            .filter(|d| d.class.is_head())
            .map(|d| to_full_frame(d, &crop))
            .filter(|d| !self.helmets_inside_region_only || center_in_region(d, &group.region))
            .collect();
        Ok(heads)
    }
}

// Tolerates the rounding of a crop-local round trip
fn same_detection(a: &Detection, b: &Detection) -> bool {
    const EPS: f32 = 1e-3;
    a.class == b.class
        && (a.bbox.x - b.bbox.x).abs() < EPS
        && (a.bbox.y - b.bbox.y).abs() < EPS
        && (a.bbox.w - b.bbox.w).abs() < EPS
        && (a.bbox.h - b.bbox.h).abs() < EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mot::{IoUTracker, SimpleBlob, Track, TrackInput, TrackerError};
    use crate::rider::{VehicleKind, ViolationReason};
    use crate::utils::BoundingBox;

    // Same detections every frame, roi-local when asked for a crop
    struct Fixed {
        detections: Vec<Detection>,
    }

    impl Detector<()> for Fixed {
        fn detect(&mut self, _frame: &(), roi: Option<&Rect>) -> Result<Vec<Detection>, DetectorError> {
            let roi = match roi {
                Some(roi) => roi,
                None => return Ok(self.detections.clone()),
            };
            Ok(self
                .detections
                .iter()
                .filter(|d| roi.contains(&d.center()))
                .map(|d| Detection {
                    bbox: d.bbox.translate(-roi.x, -roi.y),
                    ..*d
                })
                .collect())
        }
    }

    fn det(class: DetectionClass, x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(class, BoundingBox::new(x, y, w, h), 0.9)
    }

    fn orchestrator(
        vehicles: Vec<Detection>,
        riders: Vec<Detection>,
        helmets: Vec<Detection>,
        cfg: &RiderWatchConfig,
    ) -> FrameOrchestrator<Fixed, Fixed, Fixed, IoUTracker<SimpleBlob>> {
        FrameOrchestrator::new(
            Fixed { detections: vehicles },
            Fixed { detections: riders },
            Fixed { detections: helmets },
            cfg.build_tracker(),
            cfg,
        )
    }

    fn moto() -> Detection {
        det(DetectionClass::Vehicle(VehicleKind::Motorcycle), 100.0, 100.0, 40.0, 60.0)
    }

    #[test]
    fn test_heads_come_back_in_frame_coordinates() {
        let riders = vec![det(DetectionClass::Rider, 100.0, 100.0, 40.0, 36.0)];
        let helmets = vec![
            det(DetectionClass::Helmet, 100.0, 80.0, 10.0, 10.0),
            det(DetectionClass::Rider, 100.0, 90.0, 10.0, 10.0),
            det(DetectionClass::Helmet, 500.0, 500.0, 10.0, 10.0),
        ];
        let cfg = RiderWatchConfig::default();
        let mut orchestrator = orchestrator(vec![moto()], riders, helmets, &cfg);
        let report = orchestrator.process(&()).unwrap();
        assert_eq!(report.frame_index, 0);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.helmets.len(), 1);
        let center = report.helmets[0].center();
        assert!((center.x - 100.0).abs() < 1e-4);
        assert!((center.y - 80.0).abs() < 1e-4);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_no_helmet_flag() {
        let riders = vec![det(DetectionClass::Rider, 100.0, 100.0, 40.0, 36.0)];
        let helmets = vec![det(DetectionClass::NoHelmet, 100.0, 80.0, 10.0, 10.0)];

        let cfg = RiderWatchConfig::default();
        let mut quiet = orchestrator(vec![moto()], riders.clone(), helmets.clone(), &cfg);
        assert!(quiet.process(&()).unwrap().violations.is_empty());

        let mut cfg = RiderWatchConfig::default();
        cfg.classifier.flag_no_helmet = true;
        let mut strict = orchestrator(vec![moto()], riders, helmets, &cfg);
        let report = strict.process(&()).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].reason, ViolationReason::NoHelmet);
    }

    #[test]
    fn test_inside_region_filter() {
        // Rider up and left of the motorcycle: the crop spans 70..120 x 65..130,
        // its bottom-left corner is outside the region
        let riders = vec![det(DetectionClass::Rider, 80.0, 75.0, 20.0, 20.0)];
        let helmets = vec![
            det(DetectionClass::Helmet, 100.0, 100.0, 2.0, 2.0),
            det(DetectionClass::Helmet, 72.0, 128.0, 2.0, 2.0),
        ];
        let mut cfg = RiderWatchConfig::default();
        cfg.assigner.iou_threshold = 0.05;
        let mut whole_crop = orchestrator(vec![moto()], riders.clone(), helmets.clone(), &cfg);
        let report = whole_crop.process(&()).unwrap();
        assert_eq!(report.groups[0].rider_count(), 1);
        assert_eq!(report.helmets.len(), 2);

        cfg.classifier.helmets_inside_region_only = true;
        let mut region_only = orchestrator(vec![moto()], riders, helmets, &cfg);
        let report = region_only.process(&()).unwrap();
        assert_eq!(report.helmets.len(), 1);
        assert_eq!(report.helmets[0].bbox, BoundingBox::new(100.0, 100.0, 2.0, 2.0));
    }

    #[test]
    fn test_three_heads_flag_group_without_riders() {
        let helmets = vec![
            det(DetectionClass::Helmet, 90.0, 80.0, 4.0, 4.0),
            det(DetectionClass::Helmet, 100.0, 100.0, 4.0, 4.0),
            det(DetectionClass::NoHelmet, 110.0, 120.0, 4.0, 4.0),
        ];
        let cfg = RiderWatchConfig::default();
        let mut orchestrator = orchestrator(vec![moto()], Vec::new(), helmets, &cfg);
        let report = orchestrator.process(&()).unwrap();
        assert_eq!(report.helmets.len(), 3);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].reason, ViolationReason::TripleRiding);
    }

    #[test]
    fn test_frame_index_advances() {
        let cfg = RiderWatchConfig::default();
        let mut orchestrator = orchestrator(Vec::new(), Vec::new(), Vec::new(), &cfg);
        for expected in 0..3 {
            let report = orchestrator.process(&()).unwrap();
            assert_eq!(report.frame_index, expected);
            assert!(report.groups.is_empty());
            assert!(report.tracks.is_empty());
        }
        assert_eq!(orchestrator.frames_seen(), 3);
    }

    // Counts crop queries, answers like `Fixed`
    struct Counting {
        calls: usize,
        inner: Fixed,
    }

    impl Detector<()> for Counting {
        fn detect(&mut self, frame: &(), roi: Option<&Rect>) -> Result<Vec<Detection>, DetectorError> {
            self.calls += 1;
            self.inner.detect(frame, roi)
        }
    }

    // Keeps every submitted detection list, never reports a track
    struct Recording {
        inputs: Vec<Vec<TrackInput>>,
    }

    impl Tracker<()> for Recording {
        fn update(&mut self, detections: &[TrackInput], _frame: &()) -> Result<Vec<Track>, TrackerError> {
            self.inputs.push(detections.to_vec());
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_degenerate_region_is_skipped() {
        let flat = det(DetectionClass::Vehicle(VehicleKind::Motorcycle), 100.0, 100.0, 40.0, 0.0);
        let car = det(DetectionClass::Vehicle(VehicleKind::Car), 300.0, 300.0, 60.0, 40.0);
        let helmets = Counting {
            calls: 0,
            inner: Fixed {
                detections: vec![det(DetectionClass::Helmet, 100.0, 100.0, 4.0, 4.0)],
            },
        };
        let cfg = RiderWatchConfig::default();
        let mut orchestrator = FrameOrchestrator::new(
            Fixed {
                detections: vec![flat, car],
            },
            Fixed { detections: Vec::new() },
            helmets,
            Recording { inputs: Vec::new() },
            &cfg,
        );
        let report = orchestrator.process(&()).unwrap();
        assert!(report.groups.is_empty());
        assert!(report.violations.is_empty());
        assert!(report.helmets.is_empty());
        assert_eq!(orchestrator.helmet_detector.calls, 0);

        let submitted = &orchestrator.tracker().inputs;
        assert_eq!(submitted.len(), 1);
        let labels: Vec<&str> = submitted[0].iter().map(|input| input.label.as_str()).collect();
        assert_eq!(labels, vec!["Car"]);
    }

    #[test]
    fn test_head_in_overlapping_crops_reported_once() {
        // Crops 80..120 and 100..140 share the band 100..120 where all heads are
        let motos = vec![
            det(DetectionClass::Vehicle(VehicleKind::Motorcycle), 100.0, 100.0, 40.0, 60.0),
            det(DetectionClass::Vehicle(VehicleKind::Motorcycle), 120.0, 100.0, 40.0, 60.0),
        ];
        let helmets = vec![
            det(DetectionClass::Helmet, 105.0, 80.0, 4.0, 4.0),
            det(DetectionClass::Helmet, 110.0, 90.0, 4.0, 4.0),
            det(DetectionClass::NoHelmet, 115.0, 100.0, 4.0, 4.0),
        ];
        let cfg = RiderWatchConfig::default();
        let mut orchestrator = orchestrator(motos, Vec::new(), helmets, &cfg);
        let report = orchestrator.process(&()).unwrap();
        assert_eq!(report.groups.len(), 2);
        // Each group still counts all three heads
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations.iter().all(|v| v.reason == ViolationReason::TripleRiding));
        assert_eq!(report.helmets.len(), 3);
        // Two regions and three heads reached the tracker
        assert_eq!(orchestrator.tracker().objects.len(), 5);
    }
}
