//! Shape geometry and the drawing context handed to draw routines.
//!
//! A shape draws the same path twice per frame: once on the scene surface
//! with its real style, once on the hit surface with its color key as both
//! fill and stroke. `ShapeContext` hides which pass is running, so built-in
//! geometry and user callbacks share one code path.

use crate::surface::{RenderSurface, StrokeStyle};
use kurbo::{BezPath, Circle, Ellipse, Point, Rect, RoundedRect, Shape as _};
use std::fmt;
use std::rc::Rc;
use strata_core::attrs::{set_bool, set_f64, type_error};
use strata_core::{Applied, Attr, AttrValue, ClientRect, ColorKey, NodeAttrs, Result, ShapeStyle};

/// Path flattening tolerance for curves, in logical units.
const TOLERANCE: f64 = 0.1;

/// User draw routine for custom shapes.
pub type SceneFunc = Rc<dyn Fn(&mut ShapeContext<'_>)>;

#[derive(Clone)]
pub struct CustomShape {
    pub scene_func: SceneFunc,
    /// Silhouette used on hit surfaces; defaults to `scene_func`.
    pub hit_func: Option<SceneFunc>,
}

impl fmt::Debug for CustomShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomShape")
            .field("hit_func", &self.hit_func.is_some())
            .finish_non_exhaustive()
    }
}

/// Outline of a shape in its local coordinates.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// `width` × `height` box at the origin.
    Rect { corner_radius: f64 },
    /// Centered on the origin.
    Circle { radius: f64 },
    Ellipse { radius_x: f64, radius_y: f64 },
    /// Flat `[x0, y0, x1, y1, ...]` list. Closed lines are filled.
    Line { points: Vec<f64>, closed: bool },
    Custom(CustomShape),
}

impl Geometry {
    pub fn rect() -> Self {
        Geometry::Rect { corner_radius: 0.0 }
    }

    pub fn circle(radius: f64) -> Self {
        Geometry::Circle { radius }
    }

    pub fn ellipse(radius_x: f64, radius_y: f64) -> Self {
        Geometry::Ellipse { radius_x, radius_y }
    }

    pub fn line(points: Vec<f64>, closed: bool) -> Self {
        Geometry::Line { points, closed }
    }

    pub fn custom(scene_func: impl Fn(&mut ShapeContext<'_>) + 'static) -> Self {
        Geometry::Custom(CustomShape {
            scene_func: Rc::new(scene_func),
            hit_func: None,
        })
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Geometry::Rect { .. } => "Rect",
            Geometry::Circle { .. } => "Circle",
            Geometry::Ellipse { .. } => "Ellipse",
            Geometry::Line { .. } => "Line",
            Geometry::Custom(_) => "Shape",
        }
    }

    /// Geometry attributes, including `width`/`height` on round shapes
    /// where they are derived from the radii.
    pub fn get_attr(&self, attr: Attr) -> Option<AttrValue> {
        match (self, attr) {
            (Geometry::Rect { corner_radius }, Attr::CornerRadius) => Some((*corner_radius).into()),
            (Geometry::Circle { radius }, Attr::Radius) => Some((*radius).into()),
            (Geometry::Circle { radius }, Attr::Width | Attr::Height) => Some((radius * 2.0).into()),
            (Geometry::Ellipse { radius_x, .. }, Attr::RadiusX) => Some((*radius_x).into()),
            (Geometry::Ellipse { radius_y, .. }, Attr::RadiusY) => Some((*radius_y).into()),
            (Geometry::Ellipse { radius_x, .. }, Attr::Width) => Some((radius_x * 2.0).into()),
            (Geometry::Ellipse { radius_y, .. }, Attr::Height) => Some((radius_y * 2.0).into()),
            (Geometry::Line { points, .. }, Attr::Points) => Some(points.clone().into()),
            (Geometry::Line { closed, .. }, Attr::Closed) => Some((*closed).into()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, attr: Attr, value: &AttrValue) -> Result<Applied> {
        match (self, attr) {
            (Geometry::Rect { corner_radius }, Attr::CornerRadius) => set_f64(corner_radius, attr, value),
            (Geometry::Circle { radius }, Attr::Radius) => set_f64(radius, attr, value),
            (Geometry::Circle { radius }, Attr::Width | Attr::Height) => {
                set_diameter(radius, attr, value)
            }
            (Geometry::Ellipse { radius_x, .. }, Attr::RadiusX) => set_f64(radius_x, attr, value),
            (Geometry::Ellipse { radius_y, .. }, Attr::RadiusY) => set_f64(radius_y, attr, value),
            (Geometry::Ellipse { radius_x, .. }, Attr::Width) => set_diameter(radius_x, attr, value),
            (Geometry::Ellipse { radius_y, .. }, Attr::Height) => set_diameter(radius_y, attr, value),
            (Geometry::Line { points, .. }, Attr::Points) => {
                let new = match value {
                    AttrValue::Numbers(v) => v.clone(),
                    AttrValue::Null => Vec::new(),
                    _ => return Err(type_error(attr, "a list of numbers")),
                };
                if *points == new {
                    return Ok(Applied::Unchanged);
                }
                let old = std::mem::replace(points, new);
                Ok(Applied::Changed { old: old.into() })
            }
            (Geometry::Line { closed, .. }, Attr::Closed) => set_bool(closed, attr, value),
            _ => Ok(Applied::NotHandled),
        }
    }

    /// Stored geometry attributes that differ from their defaults.
    pub fn non_default(&self) -> Vec<(Attr, AttrValue)> {
        let stored: &[Attr] = match self {
            Geometry::Rect { .. } => &[Attr::CornerRadius],
            Geometry::Circle { .. } => &[Attr::Radius],
            Geometry::Ellipse { .. } => &[Attr::RadiusX, Attr::RadiusY],
            Geometry::Line { .. } => &[Attr::Points, Attr::Closed],
            Geometry::Custom(_) => &[],
        };
        stored
            .iter()
            .filter_map(|&attr| {
                let value = self.get_attr(attr)?;
                let is_default = matches!(
                    &value,
                    AttrValue::Number(v) if *v == 0.0
                ) || matches!(&value, AttrValue::Bool(false))
                    || matches!(&value, AttrValue::Numbers(v) if v.is_empty());
                (!is_default).then_some((attr, value))
            })
            .collect()
    }

    /// Untransformed bounds of the fill area, ignoring stroke and shadow.
    pub fn self_rect(&self, attrs: &NodeAttrs) -> ClientRect {
        match self {
            Geometry::Rect { .. } | Geometry::Custom(_) => {
                ClientRect::new(0.0, 0.0, attrs.width, attrs.height)
            }
            Geometry::Circle { radius } => ClientRect::new(-radius, -radius, radius * 2.0, radius * 2.0),
            Geometry::Ellipse { radius_x, radius_y } => {
                ClientRect::new(-radius_x, -radius_y, radius_x * 2.0, radius_y * 2.0)
            }
            Geometry::Line { points, .. } => {
                if points.len() < 4 {
                    return ClientRect::new(
                        points.first().copied().unwrap_or(0.0),
                        points.get(1).copied().unwrap_or(0.0),
                        0.0,
                        0.0,
                    );
                }
                let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
                let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for p in points.chunks_exact(2) {
                    min_x = min_x.min(p[0]);
                    max_x = max_x.max(p[0]);
                    min_y = min_y.min(p[1]);
                    max_y = max_y.max(p[1]);
                }
                ClientRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
            }
        }
    }

    /// Run the draw routine for the current pass.
    pub(crate) fn draw(&self, ctx: &mut ShapeContext<'_>) {
        match self {
            Geometry::Rect { corner_radius } => {
                let (w, h) = (ctx.attrs.width, ctx.attrs.height);
                ctx.begin_path();
                let radius = corner_radius.min(w.abs() / 2.0).min(h.abs() / 2.0);
                if radius > 0.0 {
                    ctx.add_shape(&RoundedRect::new(0.0, 0.0, w, h, radius));
                } else {
                    ctx.add_shape(&Rect::new(0.0, 0.0, w, h));
                }
                ctx.fill_stroke_shape();
            }
            Geometry::Circle { radius } => {
                ctx.begin_path();
                ctx.add_shape(&Circle::new(Point::ZERO, radius.abs()));
                ctx.fill_stroke_shape();
            }
            Geometry::Ellipse { radius_x, radius_y } => {
                ctx.begin_path();
                ctx.add_shape(&Ellipse::new(Point::ZERO, (radius_x.abs(), radius_y.abs()), 0.0));
                ctx.fill_stroke_shape();
            }
            Geometry::Line { points, closed } => {
                if points.len() < 2 {
                    return;
                }
                ctx.begin_path();
                ctx.move_to(points[0], points[1]);
                for p in points[2..].chunks_exact(2) {
                    ctx.line_to(p[0], p[1]);
                }
                if *closed {
                    ctx.close_path();
                    ctx.fill_stroke_shape();
                } else {
                    ctx.stroke_shape();
                }
            }
            Geometry::Custom(custom) => {
                let func = match ctx.pass {
                    Pass::Hit(_) => custom.hit_func.as_ref().unwrap_or(&custom.scene_func),
                    Pass::Scene => &custom.scene_func,
                };
                func(ctx);
            }
        }
    }
}

fn set_diameter(radius: &mut f64, attr: Attr, value: &AttrValue) -> Result<Applied> {
    let diameter = value.as_f64().ok_or_else(|| type_error(attr, "a number"))?;
    let old = *radius * 2.0;
    if old == diameter {
        return Ok(Applied::Unchanged);
    }
    *radius = diameter / 2.0;
    Ok(Applied::Changed { old: old.into() })
}

// ─── Drawing context ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    Scene,
    Hit(ColorKey),
}

/// Path builder plus style-aware fill/stroke, bound to one surface and one
/// draw pass.
pub struct ShapeContext<'a> {
    surface: &'a mut RenderSurface,
    attrs: &'a NodeAttrs,
    style: &'a ShapeStyle,
    pass: Pass,
    path: BezPath,
}

impl<'a> ShapeContext<'a> {
    pub(crate) fn new(
        surface: &'a mut RenderSurface,
        attrs: &'a NodeAttrs,
        style: &'a ShapeStyle,
        pass: Pass,
    ) -> Self {
        Self {
            surface,
            attrs,
            style,
            pass,
            path: BezPath::new(),
        }
    }

    pub fn attrs(&self) -> &NodeAttrs {
        self.attrs
    }

    pub fn style(&self) -> &ShapeStyle {
        self.style
    }

    pub fn is_hit_pass(&self) -> bool {
        matches!(self.pass, Pass::Hit(_))
    }

    /// Direct access for callbacks that paint outside the fill/stroke model.
    pub fn surface(&mut self) -> &mut RenderSurface {
        self.surface
    }

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    pub fn begin_path(&mut self) {
        self.path = BezPath::new();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to((x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.path.line_to((x, y));
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.path.quad_to((cx, cy), (x, y));
    }

    pub fn curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.path.curve_to((c1x, c1y), (c2x, c2y), (x, y));
    }

    pub fn close_path(&mut self) {
        self.path.close_path();
    }

    /// Append any `kurbo` shape to the current path.
    pub fn add_shape(&mut self, shape: &impl kurbo::Shape) {
        self.path.extend(shape.path_elements(TOLERANCE));
    }

    pub fn fill_shape(&mut self) {
        match self.pass {
            Pass::Scene => {
                if let Some(fill) = self.style.fill
                    && self.style.fill_enabled
                {
                    self.surface.fill_path(&self.path, fill);
                }
            }
            Pass::Hit(key) => {
                if self.style.fill_enabled {
                    self.surface.fill_path(&self.path, key.color());
                }
            }
        }
    }

    pub fn stroke_shape(&mut self) {
        let style = self.style;
        match self.pass {
            Pass::Scene => {
                let Some(color) = style.stroke.filter(|_| style.has_stroke()) else {
                    return;
                };
                let stroke = StrokeStyle {
                    width: style.stroke_width,
                    join: style.line_join,
                    cap: style.line_cap,
                };
                if style.shadow_for_stroke_enabled {
                    self.surface.stroke_path(&self.path, color, &stroke);
                } else {
                    self.surface.save();
                    self.surface.set_shadow(None);
                    self.surface.stroke_path(&self.path, color, &stroke);
                    self.surface.restore();
                }
            }
            Pass::Hit(key) => {
                if style.has_hit_stroke() {
                    let stroke = StrokeStyle {
                        width: style.hit_stroke_width_value(),
                        join: style.line_join,
                        cap: style.line_cap,
                    };
                    self.surface.stroke_path(&self.path, key.color(), &stroke);
                }
            }
        }
    }

    pub fn fill_stroke_shape(&mut self) {
        self.fill_shape();
        self.stroke_shape();
    }
}

/// Flatten a clip rectangle into a path.
pub(crate) fn rect_path(x: f64, y: f64, width: f64, height: f64) -> BezPath {
    Rect::new(x, y, x + width, y + height).to_path(TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strata_core::AttrTable;

    #[test]
    fn round_shapes_derive_size_from_radius() {
        let mut circle = Geometry::circle(10.0);
        assert_eq!(circle.get_attr(Attr::Width), Some(AttrValue::Number(20.0)));
        let applied = circle.set_attr(Attr::Height, &AttrValue::Number(50.0)).unwrap();
        assert_eq!(applied, Applied::Changed { old: AttrValue::Number(20.0) });
        assert_eq!(circle.get_attr(Attr::Radius), Some(AttrValue::Number(25.0)));

        let mut ellipse = Geometry::ellipse(4.0, 8.0);
        ellipse.set_attr(Attr::Width, &AttrValue::Number(30.0)).unwrap();
        assert_eq!(ellipse.get_attr(Attr::RadiusX), Some(AttrValue::Number(15.0)));
        assert_eq!(ellipse.get_attr(Attr::Height), Some(AttrValue::Number(16.0)));
    }

    #[test]
    fn rect_ignores_foreign_geometry_attrs() {
        let mut rect = Geometry::rect();
        assert_eq!(rect.set_attr(Attr::Radius, &5.0.into()).unwrap(), Applied::NotHandled);
        assert_eq!(rect.get_attr(Attr::Width), None);
    }

    #[test]
    fn line_points_report_previous_value() {
        let mut line = Geometry::line(vec![0.0, 0.0], false);
        let applied = line.set_attr(Attr::Points, &vec![1.0, 2.0, 3.0, 4.0].into()).unwrap();
        assert_eq!(applied, Applied::Changed { old: AttrValue::Numbers(vec![0.0, 0.0]) });
        assert!(line.set_attr(Attr::Points, &"nope".into()).is_err());
    }

    #[test]
    fn self_rects() {
        let attrs = NodeAttrs {
            width: 30.0,
            height: 20.0,
            ..NodeAttrs::default()
        };
        assert_eq!(Geometry::rect().self_rect(&attrs), ClientRect::new(0.0, 0.0, 30.0, 20.0));
        assert_eq!(Geometry::circle(5.0).self_rect(&attrs), ClientRect::new(-5.0, -5.0, 10.0, 10.0));
        assert_eq!(
            Geometry::line(vec![10.0, 5.0, -2.0, 40.0, 6.0, 0.0], false).self_rect(&attrs),
            ClientRect::new(-2.0, 0.0, 12.0, 40.0)
        );
        assert_eq!(Geometry::line(vec![3.0, 4.0], false).self_rect(&attrs), ClientRect::new(3.0, 4.0, 0.0, 0.0));
    }

    #[test]
    fn non_default_skips_zero_geometry() {
        assert!(Geometry::rect().non_default().is_empty());
        assert_eq!(Geometry::circle(3.0).non_default(), vec![(Attr::Radius, AttrValue::Number(3.0))]);
    }

    #[test]
    fn hit_pass_paints_key_even_without_fill_color() {
        let mut surface = RenderSurface::hit(10.0, 10.0, 1.0).unwrap();
        let attrs = NodeAttrs {
            width: 10.0,
            height: 10.0,
            ..NodeAttrs::default()
        };
        let style = ShapeStyle::default();
        let key = ColorKey::from_u32(0x123456);
        let mut ctx = ShapeContext::new(&mut surface, &attrs, &style, Pass::Hit(key));
        Geometry::rect().draw(&mut ctx);
        assert_eq!(surface.pixel(5, 5), Some([0x12, 0x34, 0x56, 255]));
    }

    #[test]
    fn custom_hit_func_replaces_scene_silhouette() {
        let custom = Geometry::Custom(CustomShape {
            scene_func: Rc::new(|ctx: &mut ShapeContext<'_>| {
                ctx.begin_path();
                ctx.add_shape(&kurbo::Rect::new(0.0, 0.0, 2.0, 2.0));
                ctx.fill_stroke_shape();
            }),
            hit_func: Some(Rc::new(|ctx: &mut ShapeContext<'_>| {
                ctx.begin_path();
                ctx.add_shape(&kurbo::Rect::new(0.0, 0.0, 10.0, 10.0));
                ctx.fill_stroke_shape();
            })),
        });
        let attrs = NodeAttrs::default();
        let style = ShapeStyle::default();
        let mut surface = RenderSurface::hit(10.0, 10.0, 1.0).unwrap();
        let key = ColorKey::from_u32(0x0a0b0c);
        custom.draw(&mut ShapeContext::new(&mut surface, &attrs, &style, Pass::Hit(key)));
        assert_eq!(surface.pixel(8, 8), Some([0x0a, 0x0b, 0x0c, 255]));
    }

    #[test]
    fn scene_pass_uses_style() {
        let mut surface = RenderSurface::scene(10.0, 10.0, 1.0).unwrap();
        let attrs = NodeAttrs {
            width: 10.0,
            height: 10.0,
            ..NodeAttrs::default()
        };
        let mut style = ShapeStyle::default();
        style.set_attr(Attr::Fill, &"blue".into()).unwrap();
        let mut ctx = ShapeContext::new(&mut surface, &attrs, &style, Pass::Scene);
        Geometry::rect().draw(&mut ctx);
        assert_eq!(surface.pixel(5, 5), Some([0, 0, 255, 255]));
    }
}
