use std::fmt;

use crate::mot::TrackerError;

/// Failure reported by a detector collaborator
#[derive(Debug)]
pub struct DetectorError {
    pub txt: String,
}

impl DetectorError {
    pub fn new(txt: impl Into<String>) -> Self {
        DetectorError { txt: txt.into() }
    }
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DetectorError: {}", self.txt)
    }
}

impl std::error::Error for DetectorError {}

/// Anything that makes a frame unusable. Never retried here:
/// the caller decides whether to skip the frame or stop.
#[derive(Debug)]
pub enum FrameError {
    Detector(DetectorError),
    Tracker(TrackerError),
}

impl From<DetectorError> for FrameError {
    fn from(e: DetectorError) -> Self {
        FrameError::Detector(e)
    }
}

impl From<TrackerError> for FrameError {
    fn from(e: TrackerError) -> Self {
        FrameError::Tracker(e)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameError::Detector(e) => write!(f, "detector failed: {}", e),
            FrameError::Tracker(e) => write!(f, "tracker failed: {}", e),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Detector(e) => Some(e),
            FrameError::Tracker(e) => Some(e),
        }
    }
}
