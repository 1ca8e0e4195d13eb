//! 2D affine transform with canvas-style composition.
//!
//! The matrix is stored as `[a, b, c, d, e, f]`, the same layout as
//! `CanvasRenderingContext2D.setTransform` and `kurbo::Affine`:
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```
//!
//! `translate`, `scale`, `rotate` and `skew` post-multiply the new operation
//! onto the accumulated matrix, so a chain reads in the order a canvas
//! transform stack would apply it to a point drawn afterwards.

use crate::settings;
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

/// A 2D affine matrix plus a `dirty` flag.
///
/// `dirty` only carries meaning when the transform sits in a node's cache
/// slot: the slot is never dropped, it is marked dirty and recomputed in
/// place on the next read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    pub m: [f64; 6],
    #[serde(skip)]
    pub dirty: bool,
}

/// Translate/rotate/scale/skew components recovered by `Transform::decompose`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decomposed {
    pub x: f64,
    pub y: f64,
    /// Expressed in the global angle unit (`settings::angle_unit`).
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.m == other.m
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        dirty: false,
    };

    pub const fn new(m: [f64; 6]) -> Self {
        Self { m, dirty: false }
    }

    /// An identity slot that must be computed before first use.
    pub const fn dirty_slot() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            dirty: true,
        }
    }

    pub fn from_translation(x: f64, y: f64) -> Self {
        Self::new([1.0, 0.0, 0.0, 1.0, x, y])
    }

    pub fn reset(&mut self) {
        self.m = Self::IDENTITY.m;
    }

    pub fn copy(&self) -> Self {
        Self::new(self.m)
    }

    /// Write this matrix into caller-owned storage without allocating.
    pub fn copy_into(&self, target: &mut Transform) {
        target.m = self.m;
    }

    pub fn matrix(&self) -> [f64; 6] {
        self.m
    }

    pub fn point(&self, p: Point) -> Point {
        let m = &self.m;
        Point::new(m[0] * p.x + m[2] * p.y + m[4], m[1] * p.x + m[3] * p.y + m[5])
    }

    pub fn translate(&mut self, x: f64, y: f64) -> &mut Self {
        self.m[4] += self.m[0] * x + self.m[2] * y;
        self.m[5] += self.m[1] * x + self.m[3] * y;
        self
    }

    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.m[0] *= sx;
        self.m[1] *= sx;
        self.m[2] *= sy;
        self.m[3] *= sy;
        self
    }

    /// Rotate by `radians` (always radians, independent of the angle unit).
    pub fn rotate(&mut self, radians: f64) -> &mut Self {
        let (s, c) = radians.sin_cos();
        let m = self.m;
        self.m[0] = m[0] * c + m[2] * s;
        self.m[1] = m[1] * c + m[3] * s;
        self.m[2] = m[0] * -s + m[2] * c;
        self.m[3] = m[1] * -s + m[3] * c;
        self
    }

    pub fn skew(&mut self, sx: f64, sy: f64) -> &mut Self {
        let m = self.m;
        self.m[0] = m[0] + m[2] * sy;
        self.m[1] = m[1] + m[3] * sy;
        self.m[2] = m[2] + m[0] * sx;
        self.m[3] = m[3] + m[1] * sx;
        self
    }

    /// `self = self ∘ other`: `other` is applied to points first.
    pub fn multiply(&mut self, other: &Transform) -> &mut Self {
        let m = self.m;
        let n = &other.m;
        self.m = [
            m[0] * n[0] + m[2] * n[1],
            m[1] * n[0] + m[3] * n[1],
            m[0] * n[2] + m[2] * n[3],
            m[1] * n[2] + m[3] * n[3],
            m[0] * n[4] + m[2] * n[5] + m[4],
            m[1] * n[4] + m[3] * n[5] + m[5],
        ];
        self
    }

    pub fn determinant(&self) -> f64 {
        self.m[0] * self.m[3] - self.m[1] * self.m[2]
    }

    /// In-place inverse.
    ///
    /// A zero determinant is not guarded: the entries become infinite or NaN
    /// and propagate into whatever consumes the matrix next. Use
    /// [`Transform::try_invert`] when the caller can react to a singular
    /// matrix.
    pub fn invert(&mut self) -> &mut Self {
        let m = self.m;
        let d = 1.0 / (m[0] * m[3] - m[1] * m[2]);
        self.m = [
            m[3] * d,
            -m[1] * d,
            -m[2] * d,
            m[0] * d,
            d * (m[2] * m[5] - m[3] * m[4]),
            d * (m[1] * m[4] - m[0] * m[5]),
        ];
        self
    }

    /// Inverse, or `None` when the matrix is singular.
    pub fn try_invert(&self) -> Option<Transform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let mut inv = self.copy();
        inv.invert();
        Some(inv)
    }

    pub fn translation(&self) -> Point {
        Point::new(self.m[4], self.m[5])
    }

    pub fn is_identity(&self) -> bool {
        self.m == Self::IDENTITY.m
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }

    pub fn approx_eq(&self, other: &Transform, eps: f64) -> bool {
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Recover translate/rotate/scale/skew components.
    ///
    /// Inverse of building a matrix as `translate → rotate → skew → scale`.
    /// When the first column is zero (scale X collapsed) the second column
    /// drives the decomposition instead, and the skew lands in `skew_y`.
    pub fn decompose(&self) -> Decomposed {
        let [a, b, c, d, e, f] = self.m;
        let delta = a * d - b * c;

        let mut result = Decomposed {
            x: e,
            y: f,
            ..Decomposed::default()
        };

        if a != 0.0 || b != 0.0 {
            let r = (a * a + b * b).sqrt();
            result.rotation = if b > 0.0 {
                (a / r).acos()
            } else {
                -(a / r).acos()
            };
            result.scale_x = r;
            result.scale_y = delta / r;
            result.skew_x = (a * c + b * d) / delta;
            result.skew_y = 0.0;
        } else if c != 0.0 || d != 0.0 {
            let s = (c * c + d * d).sqrt();
            result.rotation = std::f64::consts::FRAC_PI_2
                - if d > 0.0 {
                    (-c / s).acos()
                } else {
                    -(c / s).acos()
                };
            result.scale_x = delta / s;
            result.scale_y = s;
            result.skew_x = 0.0;
            result.skew_y = (a * c + b * d) / delta;
        }

        result.rotation = settings::angle_unit().from_radians(result.rotation);
        result
    }
}

impl From<Transform> for Affine {
    fn from(t: Transform) -> Self {
        Affine::new(t.m)
    }
}

impl From<Affine> for Transform {
    fn from(a: Affine) -> Self {
        Transform::new(a.as_coeffs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    #[test]
    fn translate_then_scale_applies_scale_first_to_points() {
        let mut t = Transform::IDENTITY;
        t.translate(10.0, 10.0).scale(2.0, 2.0);
        assert!(close(t.point(Point::new(5.0, 5.0)), Point::new(20.0, 20.0)));
    }

    #[test]
    fn rotate_quarter_turn() {
        let mut t = Transform::IDENTITY;
        t.rotate(FRAC_PI_2);
        assert!(close(t.point(Point::new(1.0, 0.0)), Point::new(0.0, 1.0)));
    }

    #[test]
    fn multiply_applies_other_first() {
        let mut a = Transform::from_translation(5.0, 0.0);
        let mut b = Transform::IDENTITY;
        b.scale(3.0, 3.0);
        a.multiply(&b);
        assert!(close(a.point(Point::new(1.0, 1.0)), Point::new(8.0, 3.0)));
    }

    #[test]
    fn invert_roundtrip() {
        let mut t = Transform::IDENTITY;
        t.translate(3.0, -4.0).rotate(0.7).scale(2.0, 0.5);
        let mut twice = t.copy();
        twice.invert().invert();
        assert!(twice.approx_eq(&t, EPS));
    }

    #[test]
    fn singular_invert_is_silent() {
        let mut t = Transform::new([0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(t.try_invert().is_none());
        t.invert();
        assert!(!t.is_finite());
    }

    #[test]
    fn copy_into_overwrites_without_touching_dirty() {
        let src = Transform::from_translation(7.0, 8.0);
        let mut slot = Transform::dirty_slot();
        src.copy_into(&mut slot);
        assert_eq!(slot.translation(), Point::new(7.0, 8.0));
        assert!(slot.dirty);
    }

    #[test]
    fn decompose_collapsed_first_column() {
        let t = Transform::new([0.0, 0.0, 0.0, 2.0, 1.0, 2.0]);
        let d = t.decompose();
        assert_eq!(d.x, 1.0);
        assert_eq!(d.y, 2.0);
        assert!((d.scale_y - 2.0).abs() < EPS);
    }

    #[test]
    fn kurbo_conversion() {
        let t = Transform::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let a: Affine = t.into();
        assert_eq!(a.as_coeffs(), t.m);
        assert_eq!(Transform::from(a), t);
    }
}
