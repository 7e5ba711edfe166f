use kalman_rust::kalman;
use std::fmt;

#[derive(Debug)]
pub enum TrackerError {
    KalmanError(kalman::Kalman2DError),
    NoObject(NoObjectInTracker),
    BadInput(String),
}

impl From<kalman::Kalman2DError> for TrackerError {
    fn from(e: kalman::Kalman2DError) -> Self {
        TrackerError::KalmanError(e)
    }
}

impl From<NoObjectInTracker> for TrackerError {
    fn from(e: NoObjectInTracker) -> Self {
        TrackerError::NoObject(e)
    }
}

impl From<String> for TrackerError {
    fn from(e: String) -> Self {
        TrackerError::BadInput(e)
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackerError::KalmanError(e) => write!(f, "Kalman filter error: {:?}", e),
            TrackerError::NoObject(e) => write!(f, "{}", e),
            TrackerError::BadInput(txt) => write!(f, "Bad tracker input: {}", txt),
        }
    }
}

impl std::error::Error for TrackerError {}

#[derive(Debug)]
pub struct NoObjectInTracker {
    pub txt: String,
}
impl fmt::Display for NoObjectInTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NoObjectInTracker: {}", self.txt)
    }
}
