//! Tree structure: parent links, ordered children, reordering, destruction
//! and selector search.
//!
//! The parent → child edge in the graph and the container's `children`
//! vector always agree, and every child's `index` is its position in that
//! vector.

use crate::node::{Node, NodeKind, NodeType};
use crate::scene::Scene;
use petgraph::stable_graph::NodeIndex;
use strata_core::{EventData, Result, SceneError, Selector, settings};

impl Scene {
    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph.parent(node)
    }

    pub fn get_children(&self, node: NodeIndex) -> &[NodeIndex] {
        self.graph.node_weight(node).map(Node::children).unwrap_or_default()
    }

    pub fn index(&self, node: NodeIndex) -> usize {
        self.graph.node_weight(node).map_or(0, |n| n.index)
    }

    /// Parent first, root last.
    pub fn ancestors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    pub fn is_ancestor_of(&self, ancestor: NodeIndex, node: NodeIndex) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Number of ancestors: 0 for a stage, 1 for its layers.
    pub fn get_depth(&self, node: NodeIndex) -> usize {
        self.ancestors(node).len()
    }

    pub fn node_type(&self, node: NodeIndex) -> Option<NodeType> {
        self.graph.node_weight(node).map(Node::node_type)
    }

    // ─── Adding and removing ─────────────────────────────────────────────

    /// Append `child` to `container`, detaching it from its current parent.
    ///
    /// Adding a node to the parent it already has is a no-op.
    pub fn add(&mut self, container: NodeIndex, child: NodeIndex) -> Result<()> {
        self.check_live(container)?;
        self.check_live(child)?;
        self.validate_add(container, child)?;
        if self.parent(child) == Some(container) {
            return Ok(());
        }
        let joins_stage = matches!(self.graph[container].kind, NodeKind::Stage(_));
        if joins_stage {
            self.size_layer(container, child)?;
        }
        if let Some(old_parent) = self.detach(child) {
            self.fire(old_parent, "remove", EventData::Child { index: child.index() }, false);
            self.request_draw(old_parent);
        }

        self.graph.add_edge(container, child);
        let children = self.children_mut(container);
        children.push(child);
        let index = children.len() - 1;
        self.graph[child].index = index;
        self.clear_caches(child);
        log::trace!("added #{} to #{} at {index}", child.index(), container.index());

        if joins_stage {
            self.attach_layer(container, child);
        }
        self.fire(container, "add", EventData::Child { index: child.index() }, false);
        self.request_draw(container);
        Ok(())
    }

    fn validate_add(&self, container: NodeIndex, child: NodeIndex) -> Result<()> {
        let parent = &self.graph[container];
        if !parent.is_container() {
            return Err(SceneError::NotAContainer(parent.class_name()));
        }
        if container == child || self.is_ancestor_of(child, container) {
            return Err(SceneError::Cycle);
        }
        let child_node = &self.graph[child];
        let child_type = child_node.node_type();
        match parent.node_type() {
            NodeType::Stage if child_type != NodeType::Layer => {
                Err(SceneError::StageChild(child_node.class_name()))
            }
            NodeType::Layer if !matches!(child_type, NodeType::Group | NodeType::Shape) => {
                Err(SceneError::LayerChild(child_node.class_name()))
            }
            NodeType::Group if !matches!(child_type, NodeType::Group | NodeType::Shape) => {
                Err(SceneError::GroupChild(child_node.class_name()))
            }
            _ => Ok(()),
        }
    }

    /// `add` with the arguments the other way round.
    pub fn move_to(&mut self, node: NodeIndex, container: NodeIndex) -> Result<()> {
        self.add(container, node)
    }

    /// Detach `node` from its parent without destroying it.
    pub fn remove(&mut self, node: NodeIndex) {
        if !self.live(node, "remove") {
            return;
        }
        if let Some(parent) = self.detach(node) {
            self.fire(parent, "remove", EventData::Child { index: node.index() }, false);
            self.request_draw(parent);
        }
    }

    /// Unlink from the parent and reindex the remaining siblings.
    pub(crate) fn detach(&mut self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.parent(node)?;
        self.graph.unlink(parent, node);
        let children = self.children_mut(parent);
        if let Some(pos) = children.iter().position(|&c| c == node) {
            children.remove(pos);
        }
        self.graph[node].index = 0;
        self.reindex(parent);
        self.clear_caches(node);
        Some(parent)
    }

    fn children_mut(&mut self, container: NodeIndex) -> &mut Vec<NodeIndex> {
        &mut self.graph[container]
            .container
            .get_or_insert_with(Default::default)
            .children
    }

    fn reindex(&mut self, container: NodeIndex) {
        let children = self.get_children(container).to_vec();
        for (i, child) in children.into_iter().enumerate() {
            self.graph[child].index = i;
        }
    }

    pub fn remove_children(&mut self, container: NodeIndex) {
        if !self.live(container, "remove_children") {
            return;
        }
        for child in self.get_children(container).to_vec() {
            self.detach(child);
        }
        self.request_draw(container);
    }

    /// Destroy `node` and its whole subtree.
    ///
    /// Color keys are released and every node's payload is dropped. The
    /// handles stay retired and are never handed out again.
    pub fn destroy(&mut self, node: NodeIndex) -> Result<()> {
        self.check_live(node)?;
        if let Some(parent) = self.detach(node) {
            self.fire(parent, "remove", EventData::Child { index: node.index() }, false);
            self.request_draw(parent);
        }
        self.destroy_subtree(node);
        Ok(())
    }

    pub fn destroy_children(&mut self, container: NodeIndex) -> Result<()> {
        self.check_live(container)?;
        for child in self.get_children(container).to_vec() {
            self.destroy(child)?;
        }
        Ok(())
    }

    fn destroy_subtree(&mut self, node: NodeIndex) {
        for child in self.get_children(node).to_vec() {
            self.destroy_subtree(child);
        }
        let Some(retired) = self.graph.retire(node) else {
            return;
        };
        if let NodeKind::Shape(shape) = &retired.kind {
            if let Some(key) = shape.color_key {
                self.registry.release(key);
            }
        }
        self.frame_queue.retain(|&queued| queued != node);
        log::debug!("destroyed #{}", node.index());
    }

    // ─── Reordering ──────────────────────────────────────────────────────

    /// Move `node` within its parent. `target` maps `(index, len)` to the
    /// new index, or `None` when the node stays put.
    fn reorder(&mut self, node: NodeIndex, op: &str, target: impl FnOnce(usize, usize) -> Option<usize>) -> bool {
        if !self.live(node, op) {
            return false;
        }
        let Some(parent) = self.parent(node) else {
            settings::warn(format_args!("node #{} has no parent; {op} is ignored", node.index()));
            return false;
        };
        let from = self.graph[node].index;
        let len = self.get_children(parent).len();
        let Some(to) = target(from, len).filter(|&to| to != from) else {
            return false;
        };
        let children = self.children_mut(parent);
        let moved = children.remove(from);
        children.insert(to, moved);
        self.reindex(parent);
        self.request_draw(parent);
        true
    }

    pub fn move_up(&mut self, node: NodeIndex) -> bool {
        self.reorder(node, "move_up", |i, len| (i + 1 < len).then_some(i + 1))
    }

    pub fn move_down(&mut self, node: NodeIndex) -> bool {
        self.reorder(node, "move_down", |i, _| i.checked_sub(1))
    }

    pub fn move_to_top(&mut self, node: NodeIndex) -> bool {
        self.reorder(node, "move_to_top", |_, len| Some(len - 1))
    }

    pub fn move_to_bottom(&mut self, node: NodeIndex) -> bool {
        self.reorder(node, "move_to_bottom", |_, _| Some(0))
    }

    /// Move to position `z` among the siblings. Out-of-range values warn.
    pub fn set_z_index(&mut self, node: NodeIndex, z: usize) -> bool {
        self.reorder(node, "set_z_index", |_, len| {
            if z >= len {
                settings::warn(format_args!(
                    "unexpected z-index {z}; expected a value from 0 to {}",
                    len.saturating_sub(1)
                ));
                return None;
            }
            Some(z)
        })
    }

    // ─── Search ──────────────────────────────────────────────────────────

    /// Descendants matching `selector`, depth-first pre-order.
    pub fn find(&self, node: NodeIndex, selector: &str) -> Vec<NodeIndex> {
        let selector = Selector::parse(selector);
        self.find_by(node, |n| selector.matches(n))
    }

    pub fn find_one(&self, node: NodeIndex, selector: &str) -> Option<NodeIndex> {
        let selector = Selector::parse(selector);
        self.find_one_by(node, |n| selector.matches(n))
    }

    pub fn find_by(&self, node: NodeIndex, pred: impl Fn(&Node) -> bool) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        self.walk_descendants(node, &mut |idx, n| {
            if pred(n) {
                out.push(idx);
            }
            false
        });
        out
    }

    pub fn find_one_by(&self, node: NodeIndex, pred: impl Fn(&Node) -> bool) -> Option<NodeIndex> {
        let mut found = None;
        self.walk_descendants(node, &mut |idx, n| {
            if pred(n) {
                found = Some(idx);
                return true;
            }
            false
        });
        found
    }

    /// Visit descendants in pre-order until `visit` returns `true`.
    fn walk_descendants(&self, node: NodeIndex, visit: &mut dyn FnMut(NodeIndex, &Node) -> bool) -> bool {
        for &child in self.get_children(node) {
            let n = &self.graph[child];
            if visit(child, n) || self.walk_descendants(child, visit) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use pretty_assertions::assert_eq;
    use strata_core::Attr;

    fn assert_contiguous(scene: &Scene, container: NodeIndex) {
        for (i, &child) in scene.get_children(container).iter().enumerate() {
            assert_eq!(scene.index(child), i);
            assert_eq!(scene.parent(child), Some(container));
        }
    }

    #[test]
    fn move_down_swaps_last_two() {
        let mut scene = Scene::with_seed(9);
        let group = scene.create_group();
        let a = scene.create_group();
        let b = scene.create_group();
        scene.add(group, a).unwrap();
        scene.add(group, b).unwrap();
        assert!(scene.move_down(b));
        assert_eq!(scene.get_children(group), &[b, a]);
        assert_eq!((scene.index(b), scene.index(a)), (0, 1));
        assert!(!scene.move_down(b));
    }

    #[test]
    fn reorders_keep_indices_contiguous() {
        let mut scene = Scene::with_seed(9);
        let group = scene.create_group();
        let kids: Vec<_> = (0..5).map(|_| scene.create_group()).collect();
        for &k in &kids {
            scene.add(group, k).unwrap();
        }
        assert!(scene.move_to_top(kids[0]));
        assert!(scene.move_to_bottom(kids[4]));
        assert!(scene.set_z_index(kids[2], 3));
        assert!(!scene.set_z_index(kids[2], 99));
        scene.remove(kids[1]);
        assert_contiguous(&scene, group);
        assert_eq!(scene.get_children(group), &[kids[4], kids[3], kids[2], kids[0]]);
    }

    #[test]
    fn reorder_without_parent_is_ignored() {
        let mut scene = Scene::with_seed(9);
        let orphan = scene.create_group();
        assert!(!scene.move_up(orphan));
        assert!(!scene.move_to_top(orphan));
    }

    #[test]
    fn add_reparents() {
        let mut scene = Scene::with_seed(9);
        let a = scene.create_group();
        let b = scene.create_group();
        let child = scene.create_group();
        scene.add(a, child).unwrap();
        scene.add(b, child).unwrap();
        assert!(scene.get_children(a).is_empty());
        assert_eq!(scene.parent(child), Some(b));
        scene.add(b, child).unwrap();
        assert_eq!(scene.get_children(b), &[child]);
    }

    #[test]
    fn invalid_children_are_rejected() {
        let mut scene = Scene::with_seed(9);
        let stage = scene.create_stage(Default::default()).unwrap();
        let layer = scene.create_layer(LayerConfig::default());
        let group = scene.create_group();
        let inner = scene.create_group();
        let rect = scene.create_rect(0.0, 0.0, 1.0, 1.0);

        assert!(matches!(scene.add(stage, group), Err(SceneError::StageChild("Group"))));
        assert!(matches!(scene.add(layer, stage), Err(SceneError::LayerChild("Stage"))));
        assert!(matches!(scene.add(group, layer), Err(SceneError::GroupChild("Layer"))));
        assert!(matches!(scene.add(rect, group), Err(SceneError::NotAContainer("Rect"))));

        scene.add(group, inner).unwrap();
        assert!(matches!(scene.add(inner, group), Err(SceneError::Cycle)));
        assert!(matches!(scene.add(group, group), Err(SceneError::Cycle)));
    }

    #[test]
    fn destroy_releases_subtree() {
        let mut scene = Scene::with_seed(9);
        let group = scene.create_group();
        let rect = scene.create_rect(0.0, 0.0, 1.0, 1.0);
        scene.add(group, rect).unwrap();
        let key = scene.node(rect).and_then(Node::color_key).unwrap();

        scene.destroy(group).unwrap();
        assert!(!scene.is_alive(rect));
        assert_eq!(scene.shape_for_key(key), None);
        assert!(matches!(scene.destroy(group), Err(SceneError::Destroyed(_))));
        assert!(matches!(scene.add(group, rect), Err(SceneError::Destroyed(_))));
    }

    #[test]
    fn removed_nodes_can_be_re_added() {
        let mut scene = Scene::with_seed(9);
        let a = scene.create_group();
        let child = scene.create_group();
        scene.add(a, child).unwrap();
        scene.set_x(a, 10.0);
        assert_eq!(scene.get_absolute_position(child, None).x, 10.0);
        scene.remove(child);
        assert_eq!(scene.parent(child), None);
        assert_eq!(scene.get_absolute_position(child, None).x, 0.0);
        scene.add(a, child).unwrap();
        assert_eq!(scene.get_absolute_position(child, None).x, 10.0);
    }

    #[test]
    fn find_by_selector_in_pre_order() {
        let mut scene = Scene::with_seed(9);
        let root = scene.create_group();
        let panel = scene.create_group();
        let a = scene.create_rect(0.0, 0.0, 1.0, 1.0);
        let b = scene.create_circle(0.0, 0.0, 1.0);
        let c = scene.create_rect(0.0, 0.0, 1.0, 1.0);
        scene.add(root, panel).unwrap();
        scene.add(panel, a).unwrap();
        scene.add(panel, b).unwrap();
        scene.add(root, c).unwrap();
        scene.set(panel, Attr::Name, "card").unwrap();
        scene.set(b, Attr::Id, "dot").unwrap();

        assert_eq!(scene.find(root, "Rect"), vec![a, c]);
        assert_eq!(scene.find(root, "Shape"), vec![a, b, c]);
        assert_eq!(scene.find(root, ".card, #dot"), vec![panel, b]);
        assert_eq!(scene.find_one(root, "Circle"), Some(b));
        assert_eq!(scene.find(root, "!!, Rect"), vec![a, c]);
        assert_eq!(scene.find_one_by(root, |n| n.is_container()), Some(panel));
    }

    #[test]
    fn depth_counts_ancestors() {
        let mut scene = Scene::with_seed(9);
        let a = scene.create_group();
        let b = scene.create_group();
        scene.add(a, b).unwrap();
        assert_eq!(scene.get_depth(a), 0);
        assert_eq!(scene.get_depth(b), 1);
        assert!(scene.is_ancestor_of(a, b));
        assert!(!scene.is_ancestor_of(b, a));
    }
}
