//! Layer redraw scheduling and hit-surface decoding.
//!
//! A layer is either idle or waiting for the next frame. `batch_draw` moves
//! it to waiting and enqueues it once; the host drives frames by calling
//! `tick`, which redraws every waiting layer in request order.

use crate::node::{NodeKind, NodeType};
use crate::scene::Scene;
use crate::surface::RenderSurface;
use kurbo::{Point, Vec2};
use petgraph::stable_graph::NodeIndex;
use strata_core::{ColorKey, EventData, settings};

/// Sample offsets of one spiral ring, scaled by the ring radius.
const INTERSECTION_OFFSETS: [Vec2; 5] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, 1.0),
];

/// Result of reading one hit pixel.
enum Sample {
    Hit(NodeIndex),
    /// Partial alpha or an unregistered key: keep searching nearby.
    Antialiased,
    Miss,
}

impl Scene {
    // ─── Scheduling ──────────────────────────────────────────────────────

    /// Request a redraw on the next `tick`. Stages fan out to their layers;
    /// groups and shapes forward to their layer.
    pub fn batch_draw(&mut self, node: NodeIndex) {
        let Some(n) = self.graph.node_weight(node) else {
            return;
        };
        match n.node_type() {
            NodeType::Stage => {
                for layer in self.get_children(node).to_vec() {
                    self.batch_draw(layer);
                }
            }
            NodeType::Layer => {
                if let Some(data) = self.graph[node].layer_data_mut()
                    && !data.waiting_for_draw
                {
                    data.waiting_for_draw = true;
                    self.frame_queue.push(node);
                }
            }
            NodeType::Group | NodeType::Shape => {
                if let Some(layer) = self.get_layer(node) {
                    self.batch_draw(layer);
                }
            }
        }
    }

    /// Whether a redraw is queued for this layer.
    pub fn is_waiting_for_draw(&self, layer: NodeIndex) -> bool {
        self.graph
            .node_weight(layer)
            .and_then(|n| n.layer_data())
            .is_some_and(|d| d.waiting_for_draw)
    }

    /// Redraw every waiting layer. Returns how many layers were drawn.
    ///
    /// Redraws requested while this frame is drawing wait for the next tick.
    pub fn tick(&mut self) -> usize {
        let queue = std::mem::take(&mut self.frame_queue);
        let mut drawn = 0;
        for layer in queue {
            let Some(data) = self
                .graph
                .node_weight_mut(layer)
                .and_then(|n| n.layer_data_mut())
            else {
                continue;
            };
            if !std::mem::take(&mut data.waiting_for_draw) {
                continue;
            }
            self.draw_layer(layer);
            drawn += 1;
        }
        if drawn > 0 {
            log::trace!("tick redrew {drawn} layer(s)");
        }
        drawn
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Redraw immediately: every layer of a stage, a layer itself, or the
    /// layer owning a group or shape.
    pub fn draw(&mut self, node: NodeIndex) {
        if !self.live(node, "draw") {
            return;
        }
        match self.graph[node].kind {
            NodeKind::Stage(_) => {
                for layer in self.get_children(node).to_vec() {
                    self.draw_layer(layer);
                }
            }
            _ => {
                if let Some(layer) = self.get_layer(node) {
                    self.draw_layer(layer);
                }
            }
        }
    }

    /// Clear and repaint a layer's scene and hit surfaces.
    pub(crate) fn draw_layer(&mut self, layer: NodeIndex) {
        if !self.is_alive(layer) {
            return;
        }
        self.fire(layer, "beforeDraw", EventData::None, false);

        // A `beforeDraw` handler may have destroyed the layer.
        let Some(data) = self.graph.node_weight_mut(layer).and_then(|n| n.layer_data_mut()) else {
            return;
        };
        let clear = data.config.clear_before_draw;
        let (Some(mut scene), Some(mut hit)) = (data.scene.take(), data.hit.take()) else {
            log::debug!("layer #{} has no surfaces; add it to a stage first", layer.index());
            return;
        };
        let stage = self.get_stage(layer);
        let mut buffer = stage
            .and_then(|s| self.graph[s].stage_data_mut())
            .and_then(|d| d.buffer.take());

        if clear {
            scene.clear();
            hit.clear();
        }
        self.draw_scene(layer, &mut scene, None, buffer.as_mut());
        self.draw_hit(layer, &mut hit, None);

        if let Some(data) = self.graph.node_weight_mut(layer).and_then(|n| n.layer_data_mut()) {
            data.scene = Some(scene);
            data.hit = Some(hit);
            data.waiting_for_draw = false;
        }
        if let Some(stage) = stage
            && let Some(data) = self.graph[stage].stage_data_mut()
        {
            data.buffer = buffer;
        }
        self.fire(layer, "draw", EventData::None, false);
    }

    pub fn scene_surface(&self, layer: NodeIndex) -> Option<&RenderSurface> {
        self.graph.node_weight(layer)?.layer_data()?.scene.as_ref()
    }

    pub fn hit_surface(&self, layer: NodeIndex) -> Option<&RenderSurface> {
        self.graph.node_weight(layer)?.layer_data()?.hit.as_ref()
    }

    // ─── Hit decoding ────────────────────────────────────────────────────

    /// Topmost listening shape under `pos` (stage coordinates). A stage
    /// asks its layers from top to bottom.
    pub fn get_intersection(&self, node: NodeIndex, pos: Point) -> Option<NodeIndex> {
        let n = self.graph.node_weight(node)?;
        match &n.kind {
            NodeKind::Stage(_) => self
                .get_children(node)
                .iter()
                .rev()
                .find_map(|&layer| self.get_intersection(layer, pos)),
            NodeKind::Layer(data) => {
                if !self.is_listening(node) || !self.is_visible(node) {
                    return None;
                }
                let Some(hit) = data.hit.as_ref().filter(|h| h.is_allocated()) else {
                    settings::warn(format_args!(
                        "layer #{} has no hit pixels to read; treating as no hit",
                        node.index()
                    ));
                    return None;
                };
                self.spiral_search(hit, pos)
            }
            NodeKind::Group | NodeKind::Shape(_) => {
                settings::warn(format_args!(
                    "get_intersection expects a stage or layer, got {}",
                    n.class_name()
                ));
                None
            }
        }
    }

    /// Sample around `pos` in growing rings until a registered opaque key is
    /// found or a fully transparent pixel ends the search.
    fn spiral_search(&self, hit: &RenderSurface, pos: Point) -> Option<NodeIndex> {
        let mut radius = 1.0;
        loop {
            let mut keep_searching = false;
            for offset in INTERSECTION_OFFSETS {
                match self.sample_key(hit, pos + offset * radius) {
                    Sample::Hit(shape) => return Some(shape),
                    Sample::Antialiased => keep_searching = true,
                    Sample::Miss => {
                        keep_searching = false;
                        break;
                    }
                }
            }
            if !keep_searching {
                return None;
            }
            radius += 1.0;
        }
    }

    fn sample_key(&self, hit: &RenderSurface, p: Point) -> Sample {
        match hit.pixel_at(p) {
            Some([r, g, b, 255]) => match self.registry.lookup(ColorKey::from_rgb(r, g, b)) {
                Some(shape) => Sample::Hit(shape),
                None => Sample::Antialiased,
            },
            Some([.., a]) if a > 0 => Sample::Antialiased,
            _ => Sample::Miss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerConfig, StageConfig};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use strata_core::Attr;

    fn setup() -> (Scene, NodeIndex, NodeIndex) {
        let mut scene = Scene::with_seed(8);
        let stage = scene
            .create_stage(StageConfig {
                width: 50.0,
                height: 50.0,
                pixel_ratio: 1.0,
            })
            .unwrap();
        let layer = scene.create_layer(LayerConfig::default());
        scene.add(stage, layer).unwrap();
        scene.tick();
        (scene, stage, layer)
    }

    #[test]
    fn batch_draw_enqueues_once() {
        let (mut scene, _, layer) = setup();
        scene.batch_draw(layer);
        scene.batch_draw(layer);
        assert!(scene.is_waiting_for_draw(layer));
        assert_eq!(scene.frame_queue, vec![layer]);
        assert_eq!(scene.tick(), 1);
        assert!(!scene.is_waiting_for_draw(layer));
        assert_eq!(scene.tick(), 0);
    }

    #[test]
    fn attribute_writes_schedule_the_owning_layer() {
        let (mut scene, _, layer) = setup();
        let group = scene.create_group();
        let rect = scene.create_rect(0.0, 0.0, 10.0, 10.0);
        scene.add(layer, group).unwrap();
        scene.add(group, rect).unwrap();
        scene.tick();
        scene.set(rect, Attr::Fill, "red").unwrap();
        assert!(scene.is_waiting_for_draw(layer));
        scene.tick();
        assert_eq!(scene.scene_surface(layer).and_then(|s| s.pixel(5, 5)), Some([255, 0, 0, 255]));
    }

    #[test]
    fn destroyed_layers_are_skipped_by_tick() {
        let (mut scene, _, layer) = setup();
        scene.batch_draw(layer);
        scene.destroy(layer).unwrap();
        assert_eq!(scene.tick(), 0);
    }

    #[test]
    fn layer_destroyed_by_before_draw_is_left_alone() {
        let (mut scene, _, layer) = setup();
        scene.on(layer, "beforeDraw", |scene, e| {
            let _ = scene.destroy(e.current_target);
        });
        scene.draw(layer);
        assert!(!scene.is_alive(layer));
        assert!(scene.scene_surface(layer).is_none());
    }

    #[test]
    fn draw_fires_before_and_after_events() {
        let (mut scene, _, layer) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["beforeDraw", "draw"] {
            let log = Rc::clone(&log);
            scene.on(layer, name, move |_, e| log.borrow_mut().push(e.event_type.clone()));
        }
        scene.draw(layer);
        assert_eq!(*log.borrow(), vec!["beforeDraw".to_string(), "draw".to_string()]);
    }

    #[test]
    fn keeping_old_pixels_when_clearing_is_off() {
        let mut scene = Scene::with_seed(8);
        let stage = scene
            .create_stage(StageConfig {
                width: 20.0,
                height: 20.0,
                pixel_ratio: 1.0,
            })
            .unwrap();
        let layer = scene.create_layer(LayerConfig {
            clear_before_draw: false,
            ..LayerConfig::default()
        });
        scene.add(stage, layer).unwrap();
        let rect = scene.create_rect(0.0, 0.0, 5.0, 5.0);
        scene.set(rect, Attr::Fill, "red").unwrap();
        scene.add(layer, rect).unwrap();
        scene.draw(layer);
        scene.set_x(rect, 10.0);
        scene.draw(layer);
        let surface = scene.scene_surface(layer).unwrap();
        assert_eq!(surface.pixel(2, 2).map(|p| p[3]), Some(255));
        assert_eq!(surface.pixel(12, 2).map(|p| p[3]), Some(255));
    }

    #[test]
    fn intersection_finds_the_shape_under_the_point() {
        let (mut scene, _, layer) = setup();
        let circle = scene.create_circle(25.0, 25.0, 10.0);
        scene.set(circle, Attr::Fill, "green").unwrap();
        scene.add(layer, circle).unwrap();
        scene.draw(layer);
        assert_eq!(scene.get_intersection(layer, Point::new(25.0, 25.0)), Some(circle));
        assert_eq!(scene.get_intersection(layer, Point::new(2.0, 2.0)), None);
        assert_eq!(scene.get_intersection(layer, Point::new(-5.0, 500.0)), None);

        scene.set_listening(layer, false);
        assert_eq!(scene.get_intersection(layer, Point::new(25.0, 25.0)), None);
    }

    #[test]
    fn antialiased_edges_resolve_to_a_nearby_key() {
        let (mut scene, _, layer) = setup();
        // Half-pixel edges: columns 10 and 20 are partially covered.
        let rect = scene.create_rect(10.5, 10.0, 10.0, 10.0);
        scene.set(rect, Attr::Fill, "green").unwrap();
        scene.add(layer, rect).unwrap();
        scene.draw(layer);
        let edge = scene.hit_surface(layer).and_then(|h| h.pixel(20, 15)).unwrap();
        assert!(edge[3] > 0 && edge[3] < 255);
        // The first ring finds an opaque pixel up and to the left.
        assert_eq!(scene.get_intersection(layer, Point::new(20.0, 15.0)), Some(rect));
        // A transparent pixel in the ring ends the search.
        assert_eq!(scene.get_intersection(layer, Point::new(10.0, 15.0)), None);
    }

    #[test]
    fn stage_asks_layers_top_down() {
        let (mut scene, stage, bottom) = setup();
        let top = scene.create_layer(LayerConfig::default());
        scene.add(stage, top).unwrap();
        let a = scene.create_rect(0.0, 0.0, 20.0, 20.0);
        let b = scene.create_rect(0.0, 0.0, 20.0, 20.0);
        scene.set(a, Attr::Fill, "red").unwrap();
        scene.set(b, Attr::Fill, "blue").unwrap();
        scene.add(bottom, a).unwrap();
        scene.add(top, b).unwrap();
        scene.draw(stage);
        assert_eq!(scene.get_intersection(stage, Point::new(5.0, 5.0)), Some(b));
        scene.set_visible(top, false);
        assert_eq!(scene.get_intersection(stage, Point::new(5.0, 5.0)), Some(a));
    }
}
