use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in corner form: (x, y) is the top-left corner.
///
/// This is the representation handed to trackers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn default() -> Self {
        Rect {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
    /// Left, top, right, bottom
    pub fn to_ltrb(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }
    pub fn center(&self) -> Point {
        Point::new(self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

impl From<BoundingBox> for Rect {
    fn from(b: BoundingBox) -> Self {
        Rect::new(b.x - b.w / 2.0, b.y - b.h / 2.0, b.w, b.h)
    }
}

/// Detector box in center form: (x, y) is the center, (w, h) the full extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        BoundingBox { x, y, w, h }
    }
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
    /// Shifts the center by (dx, dy), keeping the size
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        BoundingBox::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

impl From<Rect> for BoundingBox {
    fn from(r: Rect) -> Self {
        BoundingBox::new(r.x + r.width / 2.0, r.y + r.height / 2.0, r.width, r.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn default() -> Self {
        Point { x: 0.0, y: 0.0 }
    }
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

/// Intersection over union of two axis-aligned rectangles.
/// Empty rectangles give 0.0
pub fn iou(r1: &Rect, r2: &Rect) -> f32 {
    let (l1, t1, r1x, b1) = r1.to_ltrb();
    let (l2, t2, r2x, b2) = r2.to_ltrb();
    let inter_w = f32::min(r1x, r2x) - f32::max(l1, l2);
    let inter_h = f32::min(b1, b2) - f32::max(t1, t2);
    if inter_w <= 0.0 || inter_h <= 0.0 {
        return 0.0;
    }
    let intersection = inter_w * inter_h;
    let union = r1.area() + r2.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}
