use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{BoundingBox, Point};

/// Vehicle subtypes reported by the vehicle detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    Bicycle,
    Car,
    Motorcycle,
    Bus,
    Truck,
}

impl VehicleKind {
    /// Maps COCO class ids as emitted by stock YOLO vehicle models
    pub fn from_coco_id(class_id: u32) -> Option<Self> {
        match class_id {
            1 => Some(VehicleKind::Bicycle),
            2 => Some(VehicleKind::Car),
            3 => Some(VehicleKind::Motorcycle),
            5 => Some(VehicleKind::Bus),
            7 => Some(VehicleKind::Truck),
            _ => None,
        }
    }
}

/// Every class that can flow through the pipeline.
///
/// `Region` never comes from a detector: it is the pseudo-class of the box
/// enclosing a motorcycle and its riders, so the whole cluster is tracked as one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DetectionClass {
    Vehicle(VehicleKind),
    Rider,
    Helmet,
    NoHelmet,
    Region,
}

impl DetectionClass {
    /// Label used at the tracker boundary
    pub fn label(&self) -> &'static str {
        match self {
            DetectionClass::Vehicle(VehicleKind::Bicycle) => "Bicycle",
            DetectionClass::Vehicle(VehicleKind::Car) => "Car",
            DetectionClass::Vehicle(VehicleKind::Motorcycle) => "Motorcycle",
            DetectionClass::Vehicle(VehicleKind::Bus) => "Bus",
            DetectionClass::Vehicle(VehicleKind::Truck) => "Truck",
            DetectionClass::Rider => "Rider",
            DetectionClass::Helmet => "Helmet",
            DetectionClass::NoHelmet => "No_Helmet",
            DetectionClass::Region => "Region",
        }
    }
    /// Inverse of [`DetectionClass::label`], case-insensitive
    pub fn from_label(label: &str) -> Option<Self> {
        let class = match label.to_ascii_lowercase().as_str() {
            "bicycle" => DetectionClass::Vehicle(VehicleKind::Bicycle),
            "car" => DetectionClass::Vehicle(VehicleKind::Car),
            "motorcycle" => DetectionClass::Vehicle(VehicleKind::Motorcycle),
            "bus" => DetectionClass::Vehicle(VehicleKind::Bus),
            "truck" => DetectionClass::Vehicle(VehicleKind::Truck),
            "rider" => DetectionClass::Rider,
            "helmet" => DetectionClass::Helmet,
            "no_helmet" | "nohelmet" => DetectionClass::NoHelmet,
            "region" => DetectionClass::Region,
            _ => return None,
        };
        Some(class)
    }
    pub fn is_motorcycle(&self) -> bool {
        matches!(self, DetectionClass::Vehicle(VehicleKind::Motorcycle))
    }
    /// Output classes of the helmet model
    pub fn is_head(&self) -> bool {
        matches!(self, DetectionClass::Helmet | DetectionClass::NoHelmet)
    }
}

impl fmt::Display for DetectionClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<String> for DetectionClass {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        DetectionClass::from_label(&value).ok_or_else(|| format!("unknown detection class '{}'", value))
    }
}

impl From<DetectionClass> for String {
    fn from(class: DetectionClass) -> Self {
        class.label().to_string()
    }
}

/// Single detector output for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: DetectionClass,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(class: DetectionClass, bbox: BoundingBox, confidence: f32) -> Self {
        Detection {
            class,
            bbox,
            confidence,
        }
    }
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}
