use crate::mot::blob::Blob;
use std::cmp::Ordering;

// Holds a new detection together with its best matching track for priority queue ordering.
// Ordering is inverted (min heap), wrap into `Reverse` to pop the highest IoU first.
pub struct DistanceBlob<B: Blob> {
    pub distance_metric_value: f32,
    pub min_id: Option<u64>,
    // Position of the detection in the submitted list
    pub order: usize,
    pub blob: B,
}

impl<B: Blob> PartialEq for DistanceBlob<B> {
    fn eq(&self, other: &Self) -> bool {
        self.distance_metric_value.total_cmp(&other.distance_metric_value) == Ordering::Equal
    }
}

impl<B: Blob> Eq for DistanceBlob<B> {}

impl<B: Blob> PartialOrd for DistanceBlob<B> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<B: Blob> Ord for DistanceBlob<B> {
    fn cmp(&self, other: &Self) -> Ordering {
        // self.distance < other.distance
        other
            .distance_metric_value
            .total_cmp(&self.distance_metric_value)
    }
}
