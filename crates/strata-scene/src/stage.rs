//! Stage bookkeeping: layer surfaces, resizing, pointer position and
//! single-shape hit checks.

use crate::node::NodeKind;
use crate::scene::Scene;
use crate::surface::RenderSurface;
use kurbo::Point;
use petgraph::stable_graph::NodeIndex;
use strata_core::{Result, settings};

/// Layer count above which every additional layer logs a warning.
const MAX_LAYERS: usize = 5;

impl Scene {
    /// Draw a freshly linked layer. Its surfaces were sized before linking.
    pub(crate) fn attach_layer(&mut self, stage: NodeIndex, layer: NodeIndex) {
        let count = self.get_children(stage).len();
        if count > MAX_LAYERS {
            settings::warn(format_args!(
                "stage #{} has {count} layers; each layer is a separate surface, \
                 so keep it to {MAX_LAYERS} or fewer",
                stage.index()
            ));
        }
        self.draw_layer(layer);
    }

    /// (Re)allocate a layer's surfaces to the stage size.
    pub(crate) fn size_layer(&mut self, stage: NodeIndex, layer: NodeIndex) -> Result<()> {
        let (width, height) = self.stage_size(stage);
        let ratio = self.stage_pixel_ratio(stage);
        let Some(data) = self.graph[layer].layer_data_mut() else {
            return Ok(());
        };
        let mut scene = RenderSurface::scene(width, height, ratio)?;
        let mut hit = RenderSurface::hit(width, height, data.config.hit_pixel_ratio)?;
        scene.set_anti_alias(true);
        hit.set_anti_alias(data.config.hit_anti_alias);
        data.scene = Some(scene);
        data.hit = Some(hit);
        Ok(())
    }

    fn stage_size(&self, stage: NodeIndex) -> (f64, f64) {
        let attrs = &self.graph[stage].attrs;
        (attrs.width, attrs.height)
    }

    /// Resize the stage buffers and every layer to the stage's `width` and
    /// `height`, then redraw.
    pub(crate) fn resize_stage(&mut self, stage: NodeIndex) {
        if let Err(err) = self.try_resize_stage(stage) {
            log::error!("failed to resize stage #{}: {err}", stage.index());
        }
    }

    fn try_resize_stage(&mut self, stage: NodeIndex) -> Result<()> {
        let (width, height) = self.stage_size(stage);
        let Some(data) = self.graph[stage].stage_data_mut() else {
            return Ok(());
        };
        data.buffer = Some(RenderSurface::scene(width, height, data.pixel_ratio)?);
        data.buffer_hit = Some(RenderSurface::hit(width, height, 1.0)?);
        log::debug!("stage #{} resized to {width}x{height}", stage.index());

        for layer in self.get_children(stage).to_vec() {
            self.size_layer(stage, layer)?;
            self.draw_layer(layer);
        }
        Ok(())
    }

    pub fn set_stage_size(&mut self, stage: NodeIndex, width: f64, height: f64) {
        self.set_size(stage, width, height);
    }

    /// Change the device pixel ratio of the stage's scene surfaces.
    pub fn set_pixel_ratio(&mut self, stage: NodeIndex, pixel_ratio: f64) -> Result<()> {
        self.check_live(stage)?;
        let Some(data) = self.graph[stage].stage_data_mut() else {
            settings::warn(format_args!("set_pixel_ratio ignored: #{} is not a stage", stage.index()));
            return Ok(());
        };
        if data.pixel_ratio == pixel_ratio {
            return Ok(());
        }
        data.pixel_ratio = pixel_ratio;
        self.try_resize_stage(stage)
    }

    pub fn pixel_ratio(&self, stage: NodeIndex) -> f64 {
        self.stage_pixel_ratio(stage)
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Record the pointer position in stage coordinates, or `None` when the
    /// pointer left the stage.
    pub fn set_pointer_position(&mut self, stage: NodeIndex, pos: Option<Point>) {
        if !self.live(stage, "set_pointer_position") {
            return;
        }
        match self.graph[stage].stage_data_mut() {
            Some(data) => data.pointer = pos,
            None => settings::warn(format_args!(
                "set_pointer_position ignored: #{} is not a stage",
                stage.index()
            )),
        }
    }

    pub fn get_pointer_position(&self, stage: NodeIndex) -> Option<Point> {
        self.graph.node_weight(stage)?.stage_data()?.pointer
    }

    /// Pointer position in `node`'s local coordinates.
    pub fn get_relative_pointer_position(&self, node: NodeIndex) -> Option<Point> {
        let stage = self.get_stage(node)?;
        let pos = self.get_pointer_position(stage)?;
        let inverse = self.get_absolute_transform(node, None).try_invert()?;
        Some(inverse.point(pos))
    }

    /// Topmost shape under the recorded pointer position.
    pub fn get_pointer_target(&self, stage: NodeIndex) -> Option<NodeIndex> {
        let pos = self.get_pointer_position(stage)?;
        self.get_intersection(stage, pos)
    }

    // ─── Single-shape hit check ──────────────────────────────────────────

    /// Whether `shape` covers `point` (stage coordinates), judged by drawing
    /// only its silhouette into the stage's scratch hit surface.
    pub fn intersects(&mut self, shape: NodeIndex, point: Point) -> bool {
        if !self.live(shape, "intersects") {
            return false;
        }
        if !matches!(self.graph[shape].kind, NodeKind::Shape(_)) {
            settings::warn(format_args!("intersects expects a shape, got #{}", shape.index()));
            return false;
        }
        let Some(stage) = self.get_stage(shape) else {
            return false;
        };
        let Some(mut buffer) = self.graph[stage].stage_data_mut().and_then(|d| d.buffer_hit.take()) else {
            return false;
        };
        buffer.clear();
        self.draw_hit(shape, &mut buffer, None);
        let inside = buffer.pixel_at(point).is_some_and(|p| p[3] > 0);
        if let Some(data) = self.graph[stage].stage_data_mut() {
            data.buffer_hit = Some(buffer);
        }
        inside
    }
}
