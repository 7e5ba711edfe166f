use serde::Serialize;

use crate::rider::Group;
use crate::utils::Polygon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationReason {
    /// More than the allowed number of people on one motorcycle
    TripleRiding,
    /// At least one rider detected without a helmet
    NoHelmet,
}

/// Violation found in a single frame. Nothing is carried over between frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub region: Polygon,
    pub reason: ViolationReason,
}

/// Stateless per-group rule.
///
/// A group is flagged as triple riding when the rider count or the number of
/// head (helmet / no-helmet) detections in its region exceeds the limit.
/// Either signal alone is enough: head detections stand in for occluded riders.
#[derive(Debug, Clone)]
pub struct ViolationClassifier {
    max_riders: usize,
    max_helmets: usize,
}

impl ViolationClassifier {
    /// Two riders, two heads
    ///
    /// Basic usage:
    ///
    /// ```
    /// use rider_watch::rider::ViolationClassifier;
    /// let classifier = ViolationClassifier::default();
    /// ```
    pub fn default() -> Self {
        ViolationClassifier {
            max_riders: 2,
            max_helmets: 2,
        }
    }
    pub fn new(max_riders: usize, max_helmets: usize) -> Self {
        ViolationClassifier {
            max_riders,
            max_helmets,
        }
    }
    pub fn classify(&self, group: &Group, helmet_detection_count: usize) -> Option<Violation> {
        let too_many_riders = group.rider_count() > self.max_riders;
        let too_many_heads = helmet_detection_count > self.max_helmets;
        if too_many_riders || too_many_heads {
            return Some(Violation {
                region: group.region.clone(),
                reason: ViolationReason::TripleRiding,
            });
        }
        None
    }
    /// Flags the group when the helmet model saw any bare head in its region
    pub fn classify_helmet_use(&self, group: &Group, no_helmet_count: usize) -> Option<Violation> {
        if no_helmet_count == 0 {
            return None;
        }
        Some(Violation {
            region: group.region.clone(),
            reason: ViolationReason::NoHelmet,
        })
    }
}
