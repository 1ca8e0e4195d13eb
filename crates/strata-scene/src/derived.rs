//! Ancestor-dependent values and their invalidation.
//!
//! Every getter here reads through the node's `DerivedCache`. Slots are
//! filled lazily and emptied by the engine listeners registered in
//! `Scene::insert_node` whenever a governing attribute changes, and in full
//! whenever a node is reparented.

use crate::node::{CacheSlot, Node, NodeKind};
use crate::scene::Scene;
use kurbo::{Point, Vec2};
use petgraph::stable_graph::NodeIndex;
use strata_core::{NodeAttrs, Transform, TransformsEnabled, settings};

/// Local transform from position, rotation, skew, scale and offset.
fn local_transform(attrs: &NodeAttrs) -> Transform {
    let mut m = Transform::IDENTITY;
    if attrs.x != 0.0 || attrs.y != 0.0 {
        m.translate(attrs.x, attrs.y);
    }
    if attrs.rotation != 0.0 {
        m.rotate(settings::angle_unit().to_radians(attrs.rotation));
    }
    if attrs.skew_x != 0.0 || attrs.skew_y != 0.0 {
        m.skew(attrs.skew_x, attrs.skew_y);
    }
    if attrs.scale_x != 1.0 || attrs.scale_y != 1.0 {
        m.scale(attrs.scale_x, attrs.scale_y);
    }
    if attrs.offset_x != 0.0 || attrs.offset_y != 0.0 {
        m.translate(-attrs.offset_x, -attrs.offset_y);
    }
    m
}

impl Scene {
    // ─── Transforms ──────────────────────────────────────────────────────

    pub fn get_transform(&self, node: NodeIndex) -> Transform {
        let Some(n) = self.graph.node_weight(node) else {
            return Transform::IDENTITY;
        };
        let cached = n.cache.transform.get();
        if !cached.dirty {
            return cached;
        }
        let t = local_transform(&n.attrs);
        n.cache.transform.set(t);
        t
    }

    fn apply_local(&self, at: &mut Transform, node: NodeIndex, n: &Node) {
        match n.attrs.transforms_enabled {
            TransformsEnabled::All => {
                at.multiply(&self.get_transform(node));
            }
            TransformsEnabled::Position => {
                at.translate(n.attrs.x - n.attrs.offset_x, n.attrs.y - n.attrs.offset_y);
            }
            TransformsEnabled::None => {}
        }
    }

    /// Transform from `node`'s local space to the root, or to the space of
    /// `top` when given. Only the root-relative value is cached.
    pub fn get_absolute_transform(&self, node: NodeIndex, top: Option<NodeIndex>) -> Transform {
        match top {
            Some(_) => self.relative_transform(node, top),
            None => self.cached_absolute_transform(node),
        }
    }

    fn cached_absolute_transform(&self, node: NodeIndex) -> Transform {
        let Some(n) = self.graph.node_weight(node) else {
            return Transform::IDENTITY;
        };
        let cached = n.cache.absolute_transform.get();
        if !cached.dirty {
            return cached;
        }
        let mut at = match self.parent(node) {
            Some(parent) => self.cached_absolute_transform(parent),
            None => Transform::IDENTITY,
        };
        self.apply_local(&mut at, node, n);
        at.dirty = false;
        n.cache.absolute_transform.set(at);
        at
    }

    /// Uncached walk from the topmost ancestor below `top` down to `node`.
    /// `top` itself does not contribute; `None` walks to the root.
    fn relative_transform(&self, node: NodeIndex, top: Option<NodeIndex>) -> Transform {
        if top == Some(node) {
            return Transform::IDENTITY;
        }
        let mut family = vec![node];
        let mut parent = self.parent(node);
        while let Some(p) = parent {
            if Some(p) == top {
                break;
            }
            family.push(p);
            parent = self.parent(p);
        }
        let mut at = Transform::IDENTITY;
        for &idx in family.iter().rev() {
            self.apply_local(&mut at, idx, &self.graph[idx]);
        }
        at
    }

    /// Position of the node's origin (before offset) in root coordinates,
    /// or in `top`'s coordinates.
    pub fn get_absolute_position(&self, node: NodeIndex, top: Option<NodeIndex>) -> Point {
        let mut t = self.get_absolute_transform(node, top);
        if let Some(n) = self.graph.node_weight(node) {
            t.translate(n.attrs.offset_x, n.attrs.offset_y);
        }
        t.translation()
    }

    /// Move the node so its absolute position becomes `pos`.
    pub fn set_absolute_position(&mut self, node: NodeIndex, pos: Point) {
        if !self.live(node, "set_absolute_position") {
            return;
        }
        let parent_abs = self
            .parent(node)
            .map_or(Transform::IDENTITY, |p| self.get_absolute_transform(p, None));
        let Some(inverse) = parent_abs.try_invert() else {
            settings::warn(format_args!(
                "set_absolute_position ignored: parent transform of #{} is not invertible",
                node.index()
            ));
            return;
        };
        let mut local = inverse.point(pos);
        let attrs = &self.graph[node].attrs;
        if attrs.transforms_enabled == TransformsEnabled::None {
            local.x += attrs.x;
            local.y += attrs.y;
        }
        self.set_position(node, local);
    }

    // ─── Opacity, scale, visibility, listening ───────────────────────────

    /// Product of opacities up to the root, or up to an ancestor that is
    /// being rasterized into a snapshot.
    pub fn get_absolute_opacity(&self, node: NodeIndex) -> f64 {
        let Some(n) = self.graph.node_weight(node) else {
            return 1.0;
        };
        if let Some(v) = n.cache.absolute_opacity.get() {
            return v;
        }
        let inherited = self
            .parent(node)
            .filter(|&p| !self.graph[p].under_cache.get())
            .map_or(1.0, |p| self.get_absolute_opacity(p));
        let v = n.attrs.opacity * inherited;
        n.cache.absolute_opacity.set(Some(v));
        v
    }

    pub fn get_absolute_scale(&self, node: NodeIndex) -> Vec2 {
        let Some(n) = self.graph.node_weight(node) else {
            return Vec2::new(1.0, 1.0);
        };
        if let Some(v) = n.cache.absolute_scale.get() {
            return v;
        }
        // Inside a snapshot pass, scale is measured from the outermost node
        // being rasterized.
        let top = std::iter::once(node)
            .chain(self.ancestors(node))
            .filter(|&a| self.graph[a].under_cache.get())
            .last();
        let d = self.get_absolute_transform(node, top).decompose();
        let v = Vec2::new(d.scale_x, d.scale_y);
        n.cache.absolute_scale.set(Some(v));
        v
    }

    pub fn is_visible(&self, node: NodeIndex) -> bool {
        let Some(n) = self.graph.node_weight(node) else {
            return false;
        };
        if let Some(v) = n.cache.visible.get() {
            return v;
        }
        let v = n.attrs.visible && self.parent(node).is_none_or(|p| self.is_visible(p));
        n.cache.visible.set(Some(v));
        v
    }

    pub fn is_listening(&self, node: NodeIndex) -> bool {
        let Some(n) = self.graph.node_weight(node) else {
            return false;
        };
        if let Some(v) = n.cache.listening.get() {
            return v;
        }
        let v = n.attrs.listening && self.parent(node).is_none_or(|p| self.is_listening(p));
        n.cache.listening.set(Some(v));
        v
    }

    /// Visibility of `node` considering ancestors strictly below
    /// `relative_to`. Uncached.
    pub fn is_visible_relative(&self, node: NodeIndex, relative_to: NodeIndex) -> bool {
        self.flag_relative(node, relative_to, |a| a.visible)
    }

    pub fn is_listening_relative(&self, node: NodeIndex, relative_to: NodeIndex) -> bool {
        self.flag_relative(node, relative_to, |a| a.listening)
    }

    fn flag_relative(&self, node: NodeIndex, relative_to: NodeIndex, flag: impl Fn(&NodeAttrs) -> bool) -> bool {
        let mut current = node;
        loop {
            let Some(n) = self.graph.node_weight(current) else {
                return false;
            };
            if !flag(&n.attrs) {
                return false;
            }
            if current == relative_to {
                return true;
            }
            match self.parent(current) {
                Some(p) if p != relative_to => current = p,
                _ => return true,
            }
        }
    }

    /// Whether a hit pass should paint this node.
    pub fn should_draw_hit(&self, node: NodeIndex, top: Option<NodeIndex>) -> bool {
        match top {
            Some(top) => self.is_visible_relative(node, top) && self.is_listening_relative(node, top),
            None => self.is_listening(node) && self.is_visible(node),
        }
    }

    // ─── Stage and layer ─────────────────────────────────────────────────

    pub fn get_stage(&self, node: NodeIndex) -> Option<NodeIndex> {
        let n = self.graph.node_weight(node)?;
        if let Some(v) = n.cache.stage.get() {
            return v;
        }
        let v = match n.kind {
            NodeKind::Stage(_) => Some(node),
            _ => self.parent(node).and_then(|p| self.get_stage(p)),
        };
        n.cache.stage.set(Some(v));
        v
    }

    /// The layer that owns `node`, or the node itself when it is a layer.
    pub fn get_layer(&self, node: NodeIndex) -> Option<NodeIndex> {
        let mut current = Some(node);
        while let Some(idx) = current {
            if matches!(self.graph.node_weight(idx)?.kind, NodeKind::Layer(_)) {
                return Some(idx);
            }
            current = self.parent(idx);
        }
        None
    }

    /// Pixel ratio of the owning stage, 1 for detached nodes.
    pub(crate) fn stage_pixel_ratio(&self, node: NodeIndex) -> f64 {
        self.get_stage(node)
            .and_then(|s| self.graph[s].stage_data())
            .map_or(1.0, |d| d.pixel_ratio)
    }

    // ─── Invalidation ────────────────────────────────────────────────────

    /// Clear `slot` on the node and its whole subtree, snapshot holders
    /// included.
    pub(crate) fn clear_self_and_descendant_cache(&self, node: NodeIndex, slot: CacheSlot) {
        let Some(n) = self.graph.node_weight(node) else {
            return;
        };
        n.cache.clear(slot);
        for &child in n.children() {
            self.clear_self_and_descendant_cache(child, slot);
        }
    }

    pub(crate) fn clear_caches(&self, node: NodeIndex) {
        self.clear_self_and_descendant_cache(node, CacheSlot::All);
    }

    pub(crate) fn on_transform_change(&mut self, node: NodeIndex) {
        let Some(n) = self.graph.node_weight_mut(node) else {
            return;
        };
        if n.batching_transform {
            n.need_transform_clear = true;
            return;
        }
        n.cache.clear(CacheSlot::Transform);
        self.clear_self_and_descendant_cache(node, CacheSlot::AbsoluteTransform);
        self.clear_self_and_descendant_cache(node, CacheSlot::AbsoluteScale);
    }

    /// Run `f` with transform invalidation deferred, then invalidate once.
    pub(crate) fn batch_transform_changes<R>(&mut self, node: NodeIndex, f: impl FnOnce(&mut Self) -> R) -> R {
        let nested = match self.graph.node_weight_mut(node) {
            Some(n) => std::mem::replace(&mut n.batching_transform, true),
            None => return f(self),
        };
        let out = f(self);
        if !nested && let Some(n) = self.graph.node_weight_mut(node) {
            n.batching_transform = false;
            if std::mem::take(&mut n.need_transform_clear) {
                self.on_transform_change(node);
            }
        }
        out
    }

    // ─── Redraw requests ─────────────────────────────────────────────────

    /// Schedule a redraw of whatever displays `node`, when auto-draw is on.
    pub(crate) fn request_draw(&mut self, node: NodeIndex) {
        if !settings::auto_draw_enabled() {
            return;
        }
        if let Some(target) = self.get_layer(node).or_else(|| self.get_stage(node)) {
            self.batch_draw(target);
        }
    }
}
