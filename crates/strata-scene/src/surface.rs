//! Render surfaces: a `tiny-skia` pixmap behind a canvas-like facade.
//!
//! A surface tracks a logical size and a pixel ratio; the backing pixmap is
//! `ceil(logical × ratio)` physical pixels and the device transform scales
//! logical units onto it. Drawing state (transform, clip, global alpha,
//! composite operation, shadow) lives on a save/restore stack.
//!
//! `Hit` surfaces only ever receive opaque color-key silhouettes: global
//! alpha, shadows and composite operations are ignored on them so a pixel
//! decodes back to exactly one key.

use kurbo::{BezPath, PathEl, Point};
use std::fmt;
use std::rc::Rc;
use strata_core::attrs::{CompositeOp, LineCap, LineJoin};
use strata_core::error::{Result, SceneError};
use strata_core::{Color, Transform};
use tiny_skia::{
    BlendMode, FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Scene,
    Hit,
}

/// Image sampling used when one surface is drawn into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    Smooth,
    /// Keeps color keys intact when blitting hit snapshots.
    Nearest,
}

/// Shadow painted under every fill, stroke and image on scene surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceShadow {
    /// Alpha already includes the shadow opacity.
    pub color: Color,
    /// Logical units, applied in device space (not rotated by the transform).
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub join: Option<LineJoin>,
    pub cap: Option<LineCap>,
}

#[derive(Clone)]
struct DrawState {
    /// Includes the device pixel-ratio scale.
    transform: Transform,
    clip: Option<Rc<Mask>>,
    global_alpha: f64,
    composite: CompositeOp,
    shadow: Option<SurfaceShadow>,
}

impl DrawState {
    fn device(pixel_ratio: f64) -> Self {
        let mut transform = Transform::IDENTITY;
        transform.scale(pixel_ratio, pixel_ratio);
        Self {
            transform,
            clip: None,
            global_alpha: 1.0,
            composite: CompositeOp::SourceOver,
            shadow: None,
        }
    }
}

pub struct RenderSurface {
    kind: SurfaceKind,
    width: f64,
    height: f64,
    pixel_ratio: f64,
    pixmap: Option<Pixmap>,
    state: DrawState,
    stack: Vec<DrawState>,
    is_cache: bool,
    anti_alias: bool,
}

impl fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSurface")
            .field("kind", &self.kind)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("allocated", &self.pixmap.is_some())
            .field("is_cache", &self.is_cache)
            .finish()
    }
}

impl RenderSurface {
    /// Zero-sized surfaces are valid and hold no pixels until resized.
    pub fn new(kind: SurfaceKind, width: f64, height: f64, pixel_ratio: f64) -> Result<Self> {
        let mut surface = Self {
            kind,
            width: width.max(0.0),
            height: height.max(0.0),
            pixel_ratio,
            pixmap: None,
            state: DrawState::device(pixel_ratio),
            stack: Vec::new(),
            is_cache: false,
            anti_alias: true,
        };
        surface.allocate()?;
        Ok(surface)
    }

    pub fn scene(width: f64, height: f64, pixel_ratio: f64) -> Result<Self> {
        Self::new(SurfaceKind::Scene, width, height, pixel_ratio)
    }

    pub fn hit(width: f64, height: f64, pixel_ratio: f64) -> Result<Self> {
        Self::new(SurfaceKind::Hit, width, height, pixel_ratio)
    }

    fn allocate(&mut self) -> Result<()> {
        let (pw, ph) = self.physical_size();
        self.pixmap = if pw == 0 || ph == 0 {
            None
        } else {
            Some(Pixmap::new(pw, ph).ok_or(SceneError::SurfaceSize {
                width: pw,
                height: ph,
            })?)
        };
        self.stack.clear();
        self.state = DrawState::device(self.pixel_ratio);
        Ok(())
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// `ceil(logical × ratio)` in each dimension.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_ratio).ceil() as u32,
            (self.height * self.pixel_ratio).ceil() as u32,
        )
    }

    pub fn is_allocated(&self) -> bool {
        self.pixmap.is_some()
    }

    /// Whether this surface is a node snapshot rather than a layer surface.
    pub fn is_cache(&self) -> bool {
        self.is_cache
    }

    pub fn set_cache(&mut self, is_cache: bool) {
        self.is_cache = is_cache;
    }

    pub fn set_anti_alias(&mut self, enabled: bool) {
        self.anti_alias = enabled;
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Reallocate for a new logical size. Existing pixels are discarded.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        if self.width == width && self.height == height && self.pixmap.is_some() {
            return Ok(());
        }
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.allocate()
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) -> Result<()> {
        if self.pixel_ratio == pixel_ratio {
            return Ok(());
        }
        self.pixel_ratio = pixel_ratio;
        self.allocate()
    }

    /// Drop the pixel buffer. Reads report no pixel until the next resize.
    pub fn release(&mut self) {
        self.pixmap = None;
        self.stack.clear();
    }

    pub(crate) fn same_pixel_size(&self, other: &RenderSurface) -> bool {
        match (&self.pixmap, &other.pixmap) {
            (Some(a), Some(b)) => a.width() == b.width() && a.height() == b.height(),
            _ => false,
        }
    }

    // ─── State stack ─────────────────────────────────────────────────────

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn state_depth(&self) -> usize {
        self.stack.len()
    }

    /// Post-multiply `t` onto the current transform.
    pub fn transform(&mut self, t: &Transform) {
        self.state.transform.multiply(t);
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.state.transform.translate(x, y);
    }

    pub fn scale(&mut self, x: f64, y: f64) {
        self.state.transform.scale(x, y);
    }

    /// Current transform, device scale included.
    pub fn current_transform(&self) -> Transform {
        self.state.transform
    }

    pub fn set_transform(&mut self, t: Transform) {
        self.state.transform = t;
    }

    pub fn set_global_alpha(&mut self, alpha: f64) {
        self.state.global_alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn global_alpha(&self) -> f64 {
        self.state.global_alpha
    }

    pub fn set_composite(&mut self, op: CompositeOp) {
        self.state.composite = op;
    }

    pub fn composite(&self) -> CompositeOp {
        self.state.composite
    }

    pub fn set_shadow(&mut self, shadow: Option<SurfaceShadow>) {
        self.state.shadow = shadow;
    }

    /// Intersect the clip region with `path` under the current transform.
    pub fn clip(&mut self, path: &BezPath) {
        let Some(pixmap) = self.pixmap.as_ref() else {
            return;
        };
        let Some(sk_path) = to_sk_path(path) else {
            // An empty clip path clips everything away.
            self.state.clip = Mask::new(pixmap.width(), pixmap.height()).map(Rc::new);
            return;
        };
        let t = to_sk_transform(&self.state.transform);
        let mask = match self.state.clip.as_deref() {
            Some(existing) => {
                let mut mask = existing.clone();
                mask.intersect_path(&sk_path, FillRule::Winding, self.anti_alias, t);
                Some(mask)
            }
            None => Mask::new(pixmap.width(), pixmap.height()).map(|mut mask| {
                mask.fill_path(&sk_path, FillRule::Winding, self.anti_alias, t);
                mask
            }),
        };
        self.state.clip = mask.map(Rc::new);
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Clear every pixel, ignoring transform and clip.
    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    fn paint_for(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint {
            anti_alias: self.anti_alias,
            ..Paint::default()
        };
        match self.kind {
            SurfaceKind::Scene => {
                let mut c = tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a);
                c.apply_opacity(self.state.global_alpha as f32);
                paint.set_color(c);
                paint.blend_mode = blend_mode(self.state.composite);
            }
            SurfaceKind::Hit => paint.set_color_rgba8(color.r, color.g, color.b, 255),
        }
        paint
    }

    fn shadow_paint(&self) -> Option<(Paint<'static>, tiny_skia::Transform)> {
        if self.kind == SurfaceKind::Hit {
            return None;
        }
        let shadow = self.state.shadow?;
        if shadow.color.a == 0 {
            return None;
        }
        let mut paint = self.paint_for(shadow.color);
        paint.blend_mode = blend_mode(self.state.composite);
        Some((paint, to_sk_transform(&self.shadow_transform(&shadow, self.state.transform))))
    }

    fn shadow_transform(&self, shadow: &SurfaceShadow, base: Transform) -> Transform {
        let mut shifted = Transform::from_translation(
            shadow.offset_x * self.pixel_ratio,
            shadow.offset_y * self.pixel_ratio,
        );
        shifted.multiply(&base);
        shifted
    }

    pub fn fill_path(&mut self, path: &BezPath, color: Color) {
        let Some(sk_path) = to_sk_path(path) else {
            return;
        };
        let paint = self.paint_for(color);
        let shadow = self.shadow_paint();
        let t = to_sk_transform(&self.state.transform);
        let clip = self.state.clip.clone();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if let Some((shadow_paint, shadow_t)) = shadow {
            pixmap.fill_path(&sk_path, &shadow_paint, FillRule::Winding, shadow_t, clip.as_deref());
        }
        pixmap.fill_path(&sk_path, &paint, FillRule::Winding, t, clip.as_deref());
    }

    pub fn stroke_path(&mut self, path: &BezPath, color: Color, style: &StrokeStyle) {
        if style.width <= 0.0 {
            return;
        }
        let Some(sk_path) = to_sk_path(path) else {
            return;
        };
        let stroke = Stroke {
            width: style.width as f32,
            line_join: style.join.map_or(tiny_skia::LineJoin::Miter, line_join),
            line_cap: style.cap.map_or(tiny_skia::LineCap::Butt, line_cap),
            ..Stroke::default()
        };
        let paint = self.paint_for(color);
        let shadow = self.shadow_paint();
        let t = to_sk_transform(&self.state.transform);
        let clip = self.state.clip.clone();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if let Some((shadow_paint, shadow_t)) = shadow {
            pixmap.stroke_path(&sk_path, &shadow_paint, &stroke, shadow_t, clip.as_deref());
        }
        pixmap.stroke_path(&sk_path, &paint, &stroke, t, clip.as_deref());
    }

    /// Draw `src` scaled into the logical box `(x, y, width, height)` under
    /// the current transform.
    pub fn draw_surface(
        &mut self,
        src: &RenderSurface,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        sampling: Sampling,
    ) {
        let Some(image) = src.pixmap.as_ref() else {
            return;
        };
        let mut t = self.state.transform;
        t.translate(x, y)
            .scale(width / f64::from(image.width()), height / f64::from(image.height()));
        self.draw_image(image, t, sampling);
    }

    /// Composite `src` pixel-for-pixel, ignoring the current transform.
    /// Used for the shape buffer, which is always sized like its target.
    pub fn draw_device_image(&mut self, src: &RenderSurface) {
        if let Some(image) = src.pixmap.as_ref() {
            self.draw_image(image, Transform::IDENTITY, Sampling::Nearest);
        }
    }

    fn draw_image(&mut self, image: &Pixmap, t: Transform, sampling: Sampling) {
        let quality = match sampling {
            Sampling::Smooth => FilterQuality::Bilinear,
            Sampling::Nearest => FilterQuality::Nearest,
        };
        let (opacity, blend) = match self.kind {
            SurfaceKind::Scene => (self.state.global_alpha as f32, blend_mode(self.state.composite)),
            SurfaceKind::Hit => (1.0, BlendMode::SourceOver),
        };
        let paint = PixmapPaint {
            opacity,
            blend_mode: blend,
            quality,
        };
        let shadow = match (self.kind, self.state.shadow) {
            (SurfaceKind::Scene, Some(shadow)) if shadow.color.a > 0 => {
                Some((tinted(image, shadow.color), self.shadow_transform(&shadow, t)))
            }
            _ => None,
        };
        let clip = self.state.clip.clone();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if let Some((silhouette, shadow_t)) = shadow {
            pixmap.draw_pixmap(
                0,
                0,
                silhouette.as_ref(),
                &paint,
                to_sk_transform(&shadow_t),
                clip.as_deref(),
            );
        }
        pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, to_sk_transform(&t), clip.as_deref());
    }

    // ─── Read-back ───────────────────────────────────────────────────────

    /// Straight-alpha RGBA at a physical pixel, `None` outside the buffer.
    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        let pixmap = self.pixmap.as_ref()?;
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        let c = pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Pixel under a logical point, rounded to the nearest physical pixel.
    pub fn pixel_at(&self, p: Point) -> Option<[u8; 4]> {
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        self.pixel(
            (p.x * self.pixel_ratio).round() as i64,
            (p.y * self.pixel_ratio).round() as i64,
        )
    }

    pub fn encode_png(&self) -> std::result::Result<Vec<u8>, String> {
        match self.pixmap.as_ref() {
            Some(pixmap) => pixmap.encode_png().map_err(|e| e.to_string()),
            None => Err(format!(
                "surface has no pixel buffer ({}x{} at ratio {})",
                self.width, self.height, self.pixel_ratio
            )),
        }
    }
}

// ─── tiny-skia conversions ───────────────────────────────────────────────

pub(crate) fn to_sk_transform(t: &Transform) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = t.m;
    tiny_skia::Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

pub(crate) fn to_sk_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn blend_mode(op: CompositeOp) -> BlendMode {
    match op {
        CompositeOp::SourceOver => BlendMode::SourceOver,
        CompositeOp::SourceIn => BlendMode::SourceIn,
        CompositeOp::SourceOut => BlendMode::SourceOut,
        CompositeOp::SourceAtop => BlendMode::SourceAtop,
        CompositeOp::DestinationOver => BlendMode::DestinationOver,
        CompositeOp::DestinationIn => BlendMode::DestinationIn,
        CompositeOp::DestinationOut => BlendMode::DestinationOut,
        CompositeOp::DestinationAtop => BlendMode::DestinationAtop,
        CompositeOp::Lighter => BlendMode::Plus,
        CompositeOp::Copy => BlendMode::Source,
        CompositeOp::Xor => BlendMode::Xor,
        CompositeOp::Multiply => BlendMode::Multiply,
        CompositeOp::Screen => BlendMode::Screen,
        CompositeOp::Overlay => BlendMode::Overlay,
        CompositeOp::Darken => BlendMode::Darken,
        CompositeOp::Lighten => BlendMode::Lighten,
        CompositeOp::ColorDodge => BlendMode::ColorDodge,
        CompositeOp::ColorBurn => BlendMode::ColorBurn,
        CompositeOp::HardLight => BlendMode::HardLight,
        CompositeOp::SoftLight => BlendMode::SoftLight,
        CompositeOp::Difference => BlendMode::Difference,
        CompositeOp::Exclusion => BlendMode::Exclusion,
        CompositeOp::Hue => BlendMode::Hue,
        CompositeOp::Saturation => BlendMode::Saturation,
        CompositeOp::Color => BlendMode::Color,
        CompositeOp::Luminosity => BlendMode::Luminosity,
    }
}

fn line_join(join: LineJoin) -> tiny_skia::LineJoin {
    match join {
        LineJoin::Miter => tiny_skia::LineJoin::Miter,
        LineJoin::Round => tiny_skia::LineJoin::Round,
        LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
    }
}

fn line_cap(cap: LineCap) -> tiny_skia::LineCap {
    match cap {
        LineCap::Butt => tiny_skia::LineCap::Butt,
        LineCap::Round => tiny_skia::LineCap::Round,
        LineCap::Square => tiny_skia::LineCap::Square,
    }
}

/// Copy of `image` with every pixel recolored to `color`, keeping coverage.
fn tinted(image: &Pixmap, color: Color) -> Pixmap {
    let mut out = image.clone();
    for px in out.data_mut().chunks_exact_mut(4) {
        let a = u32::from(px[3]) * u32::from(color.a) / 255;
        px[0] = (u32::from(color.r) * a / 255) as u8;
        px[1] = (u32::from(color.g) * a / 255) as u8;
        px[2] = (u32::from(color.b) * a / 255) as u8;
        px[3] = a as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Rect, Shape};
    use pretty_assertions::assert_eq;

    fn square(x: f64, y: f64, size: f64) -> BezPath {
        Rect::new(x, y, x + size, y + size).to_path(0.1)
    }

    #[test]
    fn physical_size_scales_and_rounds_up() {
        let s = RenderSurface::scene(10.5, 3.0, 2.0).unwrap();
        assert_eq!(s.physical_size(), (21, 6));
        assert_eq!(s.pixmap().map(|p| (p.width(), p.height())), Some((21, 6)));
    }

    #[test]
    fn zero_sized_surface_has_no_pixels() {
        let s = RenderSurface::hit(0.0, 10.0, 1.0).unwrap();
        assert!(!s.is_allocated());
        assert_eq!(s.pixel(0, 0), None);
    }

    #[test]
    fn pixel_ratio_maps_logical_units() {
        let mut s = RenderSurface::scene(10.0, 10.0, 2.0).unwrap();
        s.fill_path(&square(0.0, 0.0, 5.0), Color::rgb(255, 0, 0));
        assert_eq!(s.pixel(9, 9), Some([255, 0, 0, 255]));
        assert_eq!(s.pixel(11, 11).map(|p| p[3]), Some(0));
        assert_eq!(s.pixel_at(Point::new(2.0, 2.0)), Some([255, 0, 0, 255]));
    }

    #[test]
    fn hit_surface_ignores_alpha() {
        let mut s = RenderSurface::hit(10.0, 10.0, 1.0).unwrap();
        s.set_global_alpha(0.2);
        s.fill_path(&square(0.0, 0.0, 10.0), Color::rgba(1, 2, 3, 40));
        assert_eq!(s.pixel(5, 5), Some([1, 2, 3, 255]));
    }

    #[test]
    fn save_restore_scopes_state() {
        let mut s = RenderSurface::scene(20.0, 20.0, 1.0).unwrap();
        s.save();
        s.translate(10.0, 10.0);
        s.set_global_alpha(0.5);
        s.restore();
        assert_eq!(s.current_transform(), Transform::IDENTITY);
        assert_eq!(s.global_alpha(), 1.0);
        assert_eq!(s.state_depth(), 0);
    }

    #[test]
    fn clip_limits_fills() {
        let mut s = RenderSurface::scene(20.0, 20.0, 1.0).unwrap();
        s.set_anti_alias(false);
        s.clip(&square(0.0, 0.0, 10.0));
        s.fill_path(&square(0.0, 0.0, 20.0), Color::rgb(0, 0, 255));
        assert_eq!(s.pixel(5, 5).map(|p| p[3]), Some(255));
        assert_eq!(s.pixel(15, 15).map(|p| p[3]), Some(0));
    }

    #[test]
    fn shadow_is_offset_in_device_space() {
        let mut s = RenderSurface::scene(30.0, 30.0, 1.0).unwrap();
        s.set_shadow(Some(SurfaceShadow {
            color: Color::rgb(0, 0, 0),
            offset_x: 10.0,
            offset_y: 0.0,
        }));
        s.fill_path(&square(0.0, 0.0, 10.0), Color::rgb(255, 255, 255));
        assert_eq!(s.pixel(5, 5), Some([255, 255, 255, 255]));
        assert_eq!(s.pixel(15, 5), Some([0, 0, 0, 255]));
    }

    #[test]
    fn release_drops_pixels_until_resize() {
        let mut s = RenderSurface::scene(4.0, 4.0, 1.0).unwrap();
        s.release();
        assert!(!s.is_allocated());
        s.resize(8.0, 8.0).unwrap();
        assert_eq!(s.physical_size(), (8, 8));
        assert!(s.is_allocated());
    }

    #[test]
    fn draw_surface_scales_into_box() {
        let mut src = RenderSurface::scene(2.0, 2.0, 1.0).unwrap();
        src.fill_path(&square(0.0, 0.0, 2.0), Color::rgb(0, 255, 0));
        let mut dst = RenderSurface::scene(10.0, 10.0, 1.0).unwrap();
        dst.draw_surface(&src, 2.0, 2.0, 4.0, 4.0, Sampling::Nearest);
        assert_eq!(dst.pixel(4, 4), Some([0, 255, 0, 255]));
        assert_eq!(dst.pixel(8, 8).map(|p| p[3]), Some(0));
    }

    #[test]
    fn png_export_of_unallocated_surface_fails() {
        let s = RenderSurface::scene(0.0, 0.0, 1.0).unwrap();
        assert!(s.encode_png().is_err());
        let ok = RenderSurface::scene(2.0, 2.0, 1.0).unwrap();
        assert!(ok.encode_png().unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
