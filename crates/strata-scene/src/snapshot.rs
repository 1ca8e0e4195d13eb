//! Offscreen snapshots of a subtree.
//!
//! `cache` rasterizes a node (with everything below it) once into a scene
//! and a hit surface, axis-aligned in the node's local space. Later draws
//! blit those surfaces under the node's live absolute transform, so moving
//! the node or its ancestors never re-rasterizes the subtree.

use crate::config::{CacheConfig, ClientRectConfig};
use crate::node::{CacheSlot, Snapshot};
use crate::scene::Scene;
use crate::surface::RenderSurface;
use petgraph::stable_graph::NodeIndex;
use strata_core::Result;

impl Scene {
    /// Freeze `node` into a snapshot. Returns `Ok(false)` when the measured
    /// box is empty and nothing was cached.
    pub fn cache(&mut self, node: NodeIndex, config: CacheConfig) -> Result<bool> {
        self.check_live(node)?;
        // Measure and draw without the previous snapshot in place.
        let previous = self.graph[node].snapshot.take();
        if previous.is_some() {
            self.clear_caches(node);
        }

        let measured = (!config.has_explicit_box()).then(|| {
            self.get_client_rect(
                node,
                &ClientRectConfig {
                    skip_transform: true,
                    relative_to: self.parent(node),
                    ..ClientRectConfig::default()
                },
            )
        });
        let rect = measured.unwrap_or_default();
        let mut width = config.width.filter(|&w| w != 0.0).unwrap_or(rect.width).ceil();
        let mut height = config.height.filter(|&h| h != 0.0).unwrap_or(rect.height).ceil();
        let mut x = config.x.unwrap_or(rect.x.floor());
        let mut y = config.y.unwrap_or(rect.y.floor());

        if width == 0.0 || height == 0.0 {
            log::error!(
                "cannot cache node #{}: its box is {width}x{height}; pass an explicit size in CacheConfig",
                node.index()
            );
            return Ok(false);
        }

        // Flooring the origin shifts content by a fraction of a pixel; one
        // extra pixel keeps the far edge inside the snapshot.
        if measured.is_some() {
            if (rect.x.round() - x).abs() > 0.5 {
                width += 1.0;
            }
            if (rect.y.round() - y).abs() > 0.5 {
                height += 1.0;
            }
        }
        x -= config.offset;
        y -= config.offset;
        width += config.offset * 2.0;
        height += config.offset * 2.0;

        let ratio = config.pixel_ratio.unwrap_or_else(|| self.stage_pixel_ratio(node));
        let mut scene_surface = RenderSurface::scene(width, height, ratio)?;
        let mut hit_surface = RenderSurface::hit(width, height, config.hit_pixel_ratio)?;
        scene_surface.set_cache(true);
        hit_surface.set_cache(true);
        scene_surface.save();
        hit_surface.save();
        scene_surface.translate(-x, -y);
        hit_surface.translate(-x, -y);

        // Opacity and scale of the subtree are measured from this node while
        // it is being rasterized.
        self.graph[node].under_cache.set(true);
        self.clear_self_and_descendant_cache(node, CacheSlot::AbsoluteOpacity);
        self.clear_self_and_descendant_cache(node, CacheSlot::AbsoluteScale);

        self.draw_scene(node, &mut scene_surface, Some(node), None);
        self.draw_hit(node, &mut hit_surface, Some(node));

        self.graph[node].under_cache.set(false);
        self.clear_self_and_descendant_cache(node, CacheSlot::AbsoluteOpacity);
        self.clear_self_and_descendant_cache(node, CacheSlot::AbsoluteScale);

        scene_surface.restore();
        hit_surface.restore();
        self.graph[node].snapshot = Some(Snapshot {
            scene: scene_surface,
            hit: hit_surface,
            x,
            y,
        });
        log::debug!(
            "cached node #{} as {width}x{height} at ({x}, {y}), ratio {ratio}",
            node.index()
        );
        self.request_draw(node);
        Ok(true)
    }

    /// Drop the snapshot and go back to live drawing.
    pub fn clear_cache(&mut self, node: NodeIndex) {
        if !self.live(node, "clear_cache") {
            return;
        }
        if self.graph[node].snapshot.take().is_some() {
            self.clear_caches(node);
            log::debug!("cleared snapshot of node #{}", node.index());
            self.request_draw(node);
        }
    }

    pub fn is_cached(&self, node: NodeIndex) -> bool {
        self.graph.node_weight(node).is_some_and(|n| n.snapshot.is_some())
    }
}
