//! TOML configuration. Every section and key is optional.
//!
//! ```toml
//! [assigner]
//! iou_threshold = 0.1
//! policy = "greedy"            # or "hungarian"
//! max_riders_per_motorcycle = 4
//!
//! [tracker]
//! max_age = 30
//! min_hits = 3
//! history_budget = 100
//! iou_threshold = 0.3
//! dt = 0.04
//!
//! [fusion]
//! detection_confidence = 0.6
//!
//! [classifier]
//! max_riders = 2
//! max_helmets = 2
//! flag_no_helmet = false
//! helmets_inside_region_only = false
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::mot::{Blob, IoUTracker};
use crate::rider::{Assigner, AssignmentPolicy, ViolationClassifier};

const DEFAULT_ASSIGNER_IOU: f32 = 0.1;
const DEFAULT_SEATS: usize = 4;
const DEFAULT_MAX_AGE: usize = 30;
const DEFAULT_MIN_HITS: usize = 3;
const DEFAULT_HISTORY_BUDGET: usize = 100;
const DEFAULT_TRACKER_IOU: f32 = 0.3;
const DEFAULT_DT: f32 = 1.0 / 25.0;
const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.6;
const DEFAULT_MAX_RIDERS: usize = 2;
const DEFAULT_MAX_HELMETS: usize = 2;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "cannot parse config: {}", e),
            ConfigError::Invalid(txt) => write!(f, "invalid config: {}", txt),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssignerSettings {
    pub iou_threshold: f32,
    pub policy: AssignmentPolicy,
    pub max_riders_per_motorcycle: usize,
}

impl Default for AssignerSettings {
    fn default() -> Self {
        AssignerSettings {
            iou_threshold: DEFAULT_ASSIGNER_IOU,
            policy: AssignmentPolicy::Greedy,
            max_riders_per_motorcycle: DEFAULT_SEATS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerSettings {
    pub max_age: usize,
    pub min_hits: usize,
    pub history_budget: usize,
    pub iou_threshold: f32,
    pub dt: f32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            max_age: DEFAULT_MAX_AGE,
            min_hits: DEFAULT_MIN_HITS,
            history_budget: DEFAULT_HISTORY_BUDGET,
            iou_threshold: DEFAULT_TRACKER_IOU,
            dt: DEFAULT_DT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionSettings {
    pub detection_confidence: f32,
}

impl Default for FusionSettings {
    fn default() -> Self {
        FusionSettings {
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierSettings {
    pub max_riders: usize,
    pub max_helmets: usize,
    /// Also report groups with a bare-head detection
    pub flag_no_helmet: bool,
    /// Count only head detections whose center is inside the region polygon,
    /// not everything found in its rectangular crop
    pub helmets_inside_region_only: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        ClassifierSettings {
            max_riders: DEFAULT_MAX_RIDERS,
            max_helmets: DEFAULT_MAX_HELMETS,
            flag_no_helmet: false,
            helmets_inside_region_only: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiderWatchConfig {
    pub assigner: AssignerSettings,
    pub tracker: TrackerSettings,
    pub fusion: FusionSettings,
    pub classifier: ClassifierSettings,
}

impl RiderWatchConfig {
    /// Reads the file at `path`, or falls back to defaults when there is none
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: RiderWatchConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("assigner.iou_threshold", self.assigner.iou_threshold)?;
        check_unit("tracker.iou_threshold", self.tracker.iou_threshold)?;
        check_unit("fusion.detection_confidence", self.fusion.detection_confidence)?;
        if self.assigner.max_riders_per_motorcycle == 0 {
            return Err(ConfigError::Invalid(
                "assigner.max_riders_per_motorcycle must be at least 1".to_string(),
            ));
        }
        if self.tracker.min_hits == 0 {
            return Err(ConfigError::Invalid("tracker.min_hits must be at least 1".to_string()));
        }
        if !(self.tracker.dt.is_finite() && self.tracker.dt > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tracker.dt must be positive, got {}",
                self.tracker.dt
            )));
        }
        Ok(())
    }
    pub fn build_assigner(&self) -> Assigner {
        Assigner::new(
            self.assigner.iou_threshold,
            self.assigner.policy,
            self.assigner.max_riders_per_motorcycle,
        )
    }
    pub fn build_classifier(&self) -> ViolationClassifier {
        ViolationClassifier::new(self.classifier.max_riders, self.classifier.max_helmets)
    }
    pub fn build_tracker<B: Blob>(&self) -> IoUTracker<B> {
        IoUTracker::new(
            self.tracker.max_age,
            self.tracker.min_hits,
            self.tracker.history_budget,
            self.tracker.iou_threshold,
            self.tracker.dt,
        )
    }
}

fn check_unit(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be within [0, 1], got {}", name, value)))
    }
}
