use serde::Deserialize;
use std::io::Read;

use crate::pipeline::{Detector, DetectorError};
use crate::rider::Detection;
use crate::utils::Rect;

/// Precomputed detector outputs for one frame
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplayFrame {
    #[serde(default)]
    pub vehicles: Vec<Detection>,
    #[serde(default)]
    pub riders: Vec<Detection>,
    /// Heads in full-frame coordinates
    #[serde(default)]
    pub helmets: Vec<Detection>,
}

/// Recorded detection session, frames in capture order
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Replay {
    pub frames: Vec<ReplayFrame>,
}

impl Replay {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
    pub fn from_reader<Rd: Read>(reader: Rd) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayChannel {
    Vehicles,
    Riders,
    Helmets,
}

/// Plays back one channel of a [`ReplayFrame`] as if a model produced it
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    channel: ReplayChannel,
}

impl ReplayDetector {
    pub fn new(channel: ReplayChannel) -> Self {
        ReplayDetector { channel }
    }
}

impl Detector<ReplayFrame> for ReplayDetector {
    fn detect(&mut self, frame: &ReplayFrame, roi: Option<&Rect>) -> Result<Vec<Detection>, DetectorError> {
        let recorded = match self.channel {
            ReplayChannel::Vehicles => &frame.vehicles,
            ReplayChannel::Riders => &frame.riders,
            ReplayChannel::Helmets => &frame.helmets,
        };
        let roi = match roi {
            Some(roi) => roi,
            None => return Ok(recorded.clone()),
        };
        Ok(recorded
            .iter()
            .filter(|d| roi.contains(&d.center()))
            .map(|d| Detection {
                bbox: d.bbox.translate(-roi.x, -roi.y),
                ..*d
            })
            .collect())
    }
}
