use serde::Serialize;

use crate::rider::Detection;
use crate::utils::{bounding_rect, contains_point, convex_hull, to_polygon, BoundingBox, Polygon, Rect};

/// Motorcycle, its riders and the region enclosing all of them.
/// The unit classified for violations and tracked as one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub motorcycle: BoundingBox,
    pub riders: Vec<Detection>,
    pub region: Polygon,
}

impl Group {
    pub fn new(motorcycle: BoundingBox, riders: Vec<Detection>) -> Self {
        let region = build_region(&motorcycle, &riders);
        Group {
            motorcycle,
            riders,
            region,
        }
    }
    pub fn rider_count(&self) -> usize {
        self.riders.len()
    }
}

/// Smallest convex region around the motorcycle and its riders.
///
/// Without riders this is the motorcycle box itself. If the hull collapses
/// (all corners on one line) the raw corners are returned; such a region
/// is not usable and callers skip it.
pub fn build_region(motorcycle: &BoundingBox, riders: &[Detection]) -> Polygon {
    if riders.is_empty() {
        return to_polygon(motorcycle);
    }
    let mut combined = to_polygon(motorcycle).points;
    for rider in riders {
        combined.extend(to_polygon(&rider.bbox).points);
    }
    let hull = convex_hull(&combined);
    if hull.len() > 2 {
        hull
    } else {
        Polygon::new(combined)
    }
}

/// Axis-aligned crop handed to the helmet detector for a region.
/// None when the crop is less than a pixel wide or tall.
pub fn helmet_crop(region: &Polygon) -> Option<Rect> {
    let bbox = bounding_rect(region)?;
    if bbox.w < 1.0 || bbox.h < 1.0 {
        return None;
    }
    Some(Rect::from(bbox))
}

/// Moves a detection made inside `crop` back to full-frame coordinates
pub fn to_full_frame(detection: &Detection, crop: &Rect) -> Detection {
    Detection {
        bbox: detection.bbox.translate(crop.x, crop.y),
        ..*detection
    }
}

/// Whether the detection's center lies inside the region polygon
pub fn center_in_region(detection: &Detection, region: &Polygon) -> bool {
    contains_point(region, &detection.center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rider::DetectionClass;
    use crate::utils::Point;

    fn rider(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(DetectionClass::Rider, BoundingBox::new(x, y, w, h), 0.8)
    }

    #[test]
    fn test_region_without_riders_is_motorcycle_box() {
        let motorcycle = BoundingBox::new(100.0, 100.0, 40.0, 60.0);
        let region = build_region(&motorcycle, &[]);
        assert_eq!(region, to_polygon(&motorcycle));
        assert_eq!(region.len(), 4);
    }

    #[test]
    fn test_region_contains_every_corner() {
        let motorcycle = BoundingBox::new(100.0, 120.0, 60.0, 40.0);
        let riders = vec![
            rider(90.0, 90.0, 20.0, 50.0),
            rider(110.0, 85.0, 22.0, 48.0),
            rider(128.5, 95.0, 18.0, 44.0),
        ];
        let region = build_region(&motorcycle, &riders);
        assert!(region.is_usable());
        assert!(region.is_convex());
        let mut corners = to_polygon(&motorcycle).points;
        for r in riders.iter() {
            corners.extend(to_polygon(&r.bbox).points);
        }
        for corner in corners {
            assert!(contains_point(&region, &corner), "corner {:?} is outside", corner);
        }
        // Region is not just the union bounding box: the hull cuts off the empty top corners
        let rect = bounding_rect(&region).unwrap();
        assert!(region.area() < rect.w * rect.h);
    }

    #[test]
    fn test_degenerate_region_falls_back_to_raw_points() {
        let motorcycle = BoundingBox::new(100.0, 100.0, 40.0, 0.0);
        let riders = vec![rider(110.0, 100.0, 10.0, 0.0)];
        let region = build_region(&motorcycle, &riders);
        assert_eq!(region.len(), 8);
        assert!(!region.is_usable());
    }

    #[test]
    fn test_helmet_crop_and_translation() {
        let region = Polygon::new(vec![
            Point::new(80.0, 60.0),
            Point::new(120.0, 70.0),
            Point::new(120.0, 130.0),
            Point::new(80.0, 130.0),
        ]);
        let crop = helmet_crop(&region).unwrap();
        assert_eq!(crop, Rect::new(80.0, 60.0, 40.0, 70.0));

        let local = Detection::new(DetectionClass::Helmet, BoundingBox::new(10.0, 5.0, 8.0, 8.0), 0.7);
        let full = to_full_frame(&local, &crop);
        assert_eq!(full.bbox, BoundingBox::new(90.0, 65.0, 8.0, 8.0));
        assert_eq!(full.class, DetectionClass::Helmet);
        // Top-right corner of the crop is cut off by the region
        let corner = Detection::new(DetectionClass::Helmet, BoundingBox::new(118.0, 61.0, 2.0, 2.0), 0.7);
        assert!(center_in_region(&full, &region));
        assert!(!center_in_region(&corner, &region));

        let thin = to_polygon(&BoundingBox::new(10.0, 10.0, 0.5, 20.0));
        assert_eq!(helmet_crop(&thin), None);
    }
}
