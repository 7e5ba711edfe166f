use log::debug;
use pathfinding::{matrix::Matrix, prelude::kuhn_munkres};
use serde::{Deserialize, Serialize};

use crate::rider::Detection;
use crate::utils::{polygon_iou, to_polygon, BoundingBox};

const SCALE_FACTOR: f32 = 1_000_000.0;

/// How riders are matched to motorcycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPolicy {
    /// Every rider independently picks the motorcycle it overlaps the most
    #[default]
    Greedy,
    /// Riders are matched to motorcycle seats (Kuhn-Munkres) maximizing total overlap,
    /// with a per-motorcycle capacity
    Hungarian,
}

/// Riders assigned to one motorcycle. Identity of the motorcycle is its box.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorcycleRiders {
    pub motorcycle: BoundingBox,
    pub riders: Vec<Detection>,
}

/// Result of one assignment pass: one entry per input motorcycle, in input order,
/// including motorcycles nobody was assigned to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assignment {
    pub entries: Vec<MotorcycleRiders>,
}

impl Assignment {
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Riders of the motorcycle with exactly this box, if present
    pub fn riders_of(&self, motorcycle: &BoundingBox) -> Option<&[Detection]> {
        self.entries
            .iter()
            .find(|entry| entry.motorcycle == *motorcycle)
            .map(|entry| entry.riders.as_slice())
    }
    /// Total number of riders which found a motorcycle
    pub fn assigned_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.riders.len()).sum()
    }
}

/// Maps riders to the motorcycle they ride on by polygon IoU
#[derive(Debug, Clone)]
pub struct Assigner {
    // Minimum IoU between rider and motorcycle. Zero overlap never assigns.
    iou_threshold: f32,
    policy: AssignmentPolicy,
    // Seats per motorcycle, used by the Hungarian policy only
    max_riders_per_motorcycle: usize,
}

impl Assigner {
    /// Creates default instance of Assigner: greedy, IoU threshold 0.1, 4 seats
    ///
    /// Basic usage:
    ///
    /// ```
    /// use rider_watch::rider::Assigner;
    /// let assigner = Assigner::default();
    /// ```
    pub fn default() -> Self {
        Assigner {
            iou_threshold: 0.1,
            policy: AssignmentPolicy::Greedy,
            max_riders_per_motorcycle: 4,
        }
    }
    /// Creates new instance of Assigner
    ///
    /// Basic usage:
    ///
    /// ```
    /// use rider_watch::rider::{Assigner, AssignmentPolicy};
    /// let assigner = Assigner::new(0.0, AssignmentPolicy::Greedy, 4);
    /// ```
    pub fn new(iou_threshold: f32, policy: AssignmentPolicy, max_riders_per_motorcycle: usize) -> Self {
        Assigner {
            iou_threshold,
            policy,
            max_riders_per_motorcycle,
        }
    }
    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }
    /// Assigns every rider to at most one motorcycle.
    /// Riders without any overlap (or below the threshold) are dropped.
    pub fn assign(&self, motorcycles: &[Detection], riders: &[Detection]) -> Assignment {
        let mut assignment = Assignment {
            entries: motorcycles
                .iter()
                .map(|m| MotorcycleRiders {
                    motorcycle: m.bbox,
                    riders: Vec::new(),
                })
                .collect(),
        };
        if motorcycles.is_empty() || riders.is_empty() {
            return assignment;
        }
        let iou_matrix = create_iou_matrix(motorcycles, riders);
        let matches = match self.policy {
            AssignmentPolicy::Greedy => self.perform_greedy_matching(&iou_matrix),
            AssignmentPolicy::Hungarian => self.perform_seat_matching(&iou_matrix, motorcycles.len()),
        };
        for (rider_idx, matched) in matches.into_iter().enumerate() {
            match matched {
                Some(moto_idx) => assignment.entries[moto_idx].riders.push(riders[rider_idx]),
                None => debug!(
                    "Rider at ({}, {}) has no motorcycle with IoU >= {}",
                    riders[rider_idx].bbox.x, riders[rider_idx].bbox.y, self.iou_threshold
                ),
            }
        }
        assignment
    }
    fn accepts(&self, iou_value: f32) -> bool {
        iou_value > 0.0 && iou_value >= self.iou_threshold
    }
    // For every rider: motorcycle with strictly greatest IoU, first one wins on ties
    fn perform_greedy_matching(&self, iou_matrix: &[Vec<f32>]) -> Vec<Option<usize>> {
        iou_matrix
            .iter()
            .map(|row| {
                let mut best_iou = 0.0;
                let mut best_idx = None;
                for (moto_idx, &iou_value) in row.iter().enumerate() {
                    if iou_value > best_iou {
                        best_iou = iou_value;
                        best_idx = Some(moto_idx);
                    }
                }
                best_idx.filter(|_| self.accepts(best_iou))
            })
            .collect()
    }
    // Rows are riders, columns are seats (every motorcycle repeated `max_riders_per_motorcycle` times),
    // padded with empty seats so the matrix is never taller than wide
    fn perform_seat_matching(&self, iou_matrix: &[Vec<f32>], num_motorcycles: usize) -> Vec<Option<usize>> {
        let num_riders = iou_matrix.len();
        let seats = num_motorcycles * self.max_riders_per_motorcycle;
        let cols = seats.max(num_riders);
        let weights: Vec<i64> = (0..num_riders)
            .flat_map(|i| {
                (0..cols).map(move |j| {
                    if j < seats {
                        let iou_value = iou_matrix[i][j / self.max_riders_per_motorcycle];
                        if self.accepts(iou_value) {
                            (iou_value * SCALE_FACTOR) as i64
                        } else {
                            0
                        }
                    } else {
                        0
                    }
                })
            })
            .collect();
        let weights = match Matrix::from_vec(num_riders, cols, weights) {
            Ok(matrix) => matrix,
            Err(_) => return vec![None; num_riders],
        };
        let (_, seat_of_rider) = kuhn_munkres(&weights);
        seat_of_rider
            .into_iter()
            .enumerate()
            .map(|(rider_idx, seat)| {
                if seat >= seats {
                    return None;
                }
                let moto_idx = seat / self.max_riders_per_motorcycle;
                Some(moto_idx).filter(|&m| self.accepts(iou_matrix[rider_idx][m]))
            })
            .collect()
    }
}

// Rows are riders, columns are motorcycles
fn create_iou_matrix(motorcycles: &[Detection], riders: &[Detection]) -> Vec<Vec<f32>> {
    let moto_polygons: Vec<_> = motorcycles.iter().map(|m| to_polygon(&m.bbox)).collect();
    riders
        .iter()
        .map(|rider| {
            let rider_polygon = to_polygon(&rider.bbox);
            moto_polygons
                .iter()
                .map(|moto_polygon| polygon_iou(&rider_polygon, moto_polygon))
                .collect()
        })
        .collect()
}
