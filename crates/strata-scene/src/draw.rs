//! Scene and hit draw passes.
//!
//! Both passes walk the tree from a starting node in child order. `top`
//! selects the coordinate space: `None` draws in root coordinates, `Some`
//! draws relative to that ancestor (used while rasterizing snapshots).
//! Subtrees holding a snapshot are blitted instead of walked.
//!
//! The passes only borrow the scene immutably; surfaces are lent in by the
//! caller, which takes them out of their owners first.

use crate::node::{Node, ShapeData, Snapshot};
use crate::scene::Scene;
use crate::shape::{Pass, ShapeContext, rect_path};
use crate::surface::{RenderSurface, Sampling, SurfaceShadow};
use kurbo::BezPath;
use petgraph::stable_graph::NodeIndex;
use strata_core::{Color, CompositeOp, ShapeStyle, settings};

impl Scene {
    /// Draw `node` and its subtree onto a scene surface.
    ///
    /// `buffer` is scratch space for shapes that need isolated compositing;
    /// it must have the same pixel size as `surface` to be used.
    pub fn draw_scene(
        &self,
        node: NodeIndex,
        surface: &mut RenderSurface,
        top: Option<NodeIndex>,
        buffer: Option<&mut RenderSurface>,
    ) {
        let Some(n) = self.graph.node_weight(node) else {
            return;
        };
        let caching_self = top == Some(node);
        if !caching_self && !self.visible_in_pass(node, top) {
            return;
        }
        if let Some(snapshot) = &n.snapshot {
            let opacity = self.get_absolute_opacity(node);
            surface.save();
            surface.transform(&self.get_absolute_transform(node, top));
            blit_snapshot(surface, snapshot, false, opacity, n.attrs.global_composite_operation);
            surface.restore();
            return;
        }
        match n.shape() {
            Some(shape) => self.draw_shape_scene(node, n, shape, surface, top, buffer),
            None => self.draw_children(node, n, surface, top, buffer, false),
        }
    }

    /// Draw color-key silhouettes of `node` and its subtree onto a hit
    /// surface. Hidden or non-listening nodes are skipped.
    pub fn draw_hit(&self, node: NodeIndex, surface: &mut RenderSurface, top: Option<NodeIndex>) {
        let Some(n) = self.graph.node_weight(node) else {
            return;
        };
        if !self.should_draw_hit(node, top) {
            return;
        }
        if let Some(snapshot) = &n.snapshot {
            surface.save();
            surface.transform(&self.get_absolute_transform(node, top));
            blit_snapshot(surface, snapshot, true, 1.0, CompositeOp::SourceOver);
            surface.restore();
            return;
        }
        match n.shape() {
            Some(shape) => self.draw_shape_hit(node, n, shape, surface, top),
            None => self.draw_children(node, n, surface, top, None, true),
        }
    }

    fn visible_in_pass(&self, node: NodeIndex, top: Option<NodeIndex>) -> bool {
        match top {
            Some(top) => self.is_visible_relative(node, top),
            None => self.is_visible(node),
        }
    }

    fn draw_children(
        &self,
        node: NodeIndex,
        n: &Node,
        surface: &mut RenderSurface,
        top: Option<NodeIndex>,
        mut buffer: Option<&mut RenderSurface>,
        hit: bool,
    ) {
        let Some(container) = &n.container else {
            return;
        };
        let clip = match &container.clip_func {
            Some(func) => {
                let mut path = BezPath::new();
                func(&mut path);
                Some(path)
            }
            None => container.clip.clip_rect().map(|(x, y, w, h)| rect_path(x, y, w, h)),
        };
        if let Some(path) = &clip {
            surface.save();
            let outer = surface.current_transform();
            surface.transform(&self.get_absolute_transform(node, top));
            surface.clip(path);
            surface.set_transform(outer);
        }
        let op = n.attrs.global_composite_operation;
        let composite = !hit && top != Some(node) && op != CompositeOp::SourceOver;
        if composite {
            surface.save();
            surface.set_composite(op);
        }

        log::trace!(
            "{} pass over {} children of #{}",
            if hit { "hit" } else { "scene" },
            container.children.len(),
            node.index()
        );
        for &child in &container.children {
            if hit {
                self.draw_hit(child, surface, top);
            } else {
                self.draw_scene(child, surface, top, buffer.as_deref_mut());
            }
        }

        if composite {
            surface.restore();
        }
        if clip.is_some() {
            surface.restore();
        }
    }

    fn draw_shape_scene(
        &self,
        node: NodeIndex,
        n: &Node,
        shape: &ShapeData,
        surface: &mut RenderSurface,
        top: Option<NodeIndex>,
        buffer: Option<&mut RenderSurface>,
    ) {
        let caching_self = top == Some(node);
        let style = &shape.style;
        let abs = self.get_absolute_transform(node, top);
        let opacity = self.get_absolute_opacity(node);
        let op = n.attrs.global_composite_operation;
        let shadow = style.has_shadow().then(|| self.shadow_for(node, style));

        let buffer = buffer.filter(|b| {
            !surface.is_cache() && use_buffer(style, opacity) && b.same_pixel_size(surface)
        });
        surface.save();
        if let Some(buffer) = buffer {
            // Draw opaque in isolation, then composite once so fill and
            // stroke do not blend into each other.
            buffer.clear();
            buffer.save();
            let mut full = surface.current_transform();
            full.multiply(&abs);
            buffer.set_transform(full);
            shape
                .geometry
                .draw(&mut ShapeContext::new(buffer, &n.attrs, style, Pass::Scene));
            buffer.restore();

            surface.set_shadow(shadow);
            surface.set_global_alpha(opacity);
            surface.set_composite(op);
            surface.draw_device_image(buffer);
        } else {
            if !caching_self {
                surface.transform(&abs);
                surface.set_global_alpha(opacity);
                surface.set_composite(op);
            }
            surface.set_shadow(shadow);
            shape
                .geometry
                .draw(&mut ShapeContext::new(surface, &n.attrs, style, Pass::Scene));
        }
        surface.restore();
    }

    fn draw_shape_hit(
        &self,
        node: NodeIndex,
        n: &Node,
        shape: &ShapeData,
        surface: &mut RenderSurface,
        top: Option<NodeIndex>,
    ) {
        let Some(key) = shape.color_key else {
            settings::warn(format_args!(
                "shape #{} has no color key and cannot be hit-drawn",
                node.index()
            ));
            return;
        };
        surface.save();
        if top != Some(node) {
            surface.transform(&self.get_absolute_transform(node, top));
        }
        shape
            .geometry
            .draw(&mut ShapeContext::new(surface, &n.attrs, &shape.style, Pass::Hit(key)));
        surface.restore();
    }

    /// Shadow offsets follow the shape's absolute scale.
    fn shadow_for(&self, node: NodeIndex, style: &ShapeStyle) -> SurfaceShadow {
        let scale = self.get_absolute_scale(node);
        SurfaceShadow {
            color: style
                .shadow_color
                .unwrap_or(Color::BLACK)
                .with_opacity(style.shadow_opacity),
            offset_x: style.shadow_offset_x * scale.x,
            offset_y: style.shadow_offset_y * scale.y,
        }
    }
}

/// Fill and stroke must be composited together when the shape is
/// translucent or its shadow covers the stroke.
fn use_buffer(style: &ShapeStyle, opacity: f64) -> bool {
    style.perfect_draw_enabled
        && style.has_fill()
        && style.has_stroke()
        && (opacity != 1.0 || (style.has_shadow() && style.shadow_for_stroke_enabled))
}

/// Draw a snapshot at its recorded origin in the current (node-local) space.
fn blit_snapshot(surface: &mut RenderSurface, snapshot: &Snapshot, hit: bool, opacity: f64, op: CompositeOp) {
    let src = if hit { &snapshot.hit } else { &snapshot.scene };
    let (pw, ph) = src.physical_size();
    let ratio = src.pixel_ratio();
    surface.save();
    if !hit {
        surface.set_global_alpha(opacity);
        surface.set_composite(op);
    }
    surface.translate(snapshot.x, snapshot.y);
    let sampling = if hit { Sampling::Nearest } else { Sampling::Smooth };
    surface.draw_surface(src, 0.0, 0.0, f64::from(pw) / ratio, f64::from(ph) / ratio, sampling);
    surface.restore();
}
