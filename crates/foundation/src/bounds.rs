use crate::math::ScreenPoint;

/// Axis-aligned bounding box in screen pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Box of `width` x `height` centered on `center`.
    pub fn centered(center: ScreenPoint, width: f64, height: f64) -> Self {
        let hw = 0.5 * width.max(0.0);
        let hh = 0.5 * height.max(0.0);
        Aabb2 {
            min: [center.x - hw, center.y - hh],
            max: [center.x + hw, center.y + hh],
        }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }
}
