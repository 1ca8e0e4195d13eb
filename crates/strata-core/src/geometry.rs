use crate::transform::Transform;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned box returned by client-rect queries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClientRect {
    pub const ZERO: ClientRect = ClientRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn union(&self, other: &ClientRect) -> ClientRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        ClientRect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    /// Bounding box of the four corners after applying `t`.
    pub fn transformed(&self, t: &Transform) -> ClientRect {
        let corners = [
            t.point(Point::new(self.x, self.y)),
            t.point(Point::new(self.right(), self.y)),
            t.point(Point::new(self.right(), self.bottom())),
            t.point(Point::new(self.x, self.bottom())),
        ];
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in corners {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        ClientRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

impl From<Rect> for ClientRect {
    fn from(r: Rect) -> Self {
        ClientRect::new(r.x0, r.y0, r.width(), r.height())
    }
}

impl From<ClientRect> for Rect {
    fn from(r: ClientRect) -> Self {
        Rect::new(r.x, r.y, r.right(), r.bottom())
    }
}
