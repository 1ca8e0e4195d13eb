//! Node storage behind [`Scene`](crate::Scene).
//!
//! A `StableDiGraph` keyed by `NodeIndex`, with edges running parent →
//! child. A destroyed node gives up its payload and edges but keeps its
//! slot as an empty marker, so the graph never hands its index to a later
//! node and stale handles can still be told apart from unknown ones.

use crate::node::Node;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::ops::{Index, IndexMut};

enum Slot {
    Live(Box<Node>),
    Retired,
}

#[derive(Default)]
pub(crate) struct Arena {
    graph: StableDiGraph<Slot, ()>,
    live: usize,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, node: Node) -> NodeIndex {
        self.live += 1;
        self.graph.add_node(Slot::Live(Box::new(node)))
    }

    /// `None` for unknown and retired handles alike.
    pub(crate) fn node_weight(&self, idx: NodeIndex) -> Option<&Node> {
        match self.graph.node_weight(idx)? {
            Slot::Live(node) => Some(&**node),
            Slot::Retired => None,
        }
    }

    pub(crate) fn node_weight_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        match self.graph.node_weight_mut(idx)? {
            Slot::Live(node) => Some(&mut **node),
            Slot::Retired => None,
        }
    }

    pub(crate) fn is_retired(&self, idx: NodeIndex) -> bool {
        matches!(self.graph.node_weight(idx), Some(Slot::Retired))
    }

    /// Number of live nodes.
    pub(crate) fn live_count(&self) -> usize {
        self.live
    }

    /// Number of slots ever handed out, retired ones included.
    pub(crate) fn slot_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Unlink `idx` from its parent and children and take its payload.
    pub(crate) fn retire(&mut self, idx: NodeIndex) -> Option<Box<Node>> {
        let edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        for edge in edges {
            self.graph.remove_edge(edge);
        }
        let slot = self.graph.node_weight_mut(idx)?;
        match std::mem::replace(slot, Slot::Retired) {
            Slot::Live(node) => {
                self.live -= 1;
                Some(node)
            }
            Slot::Retired => None,
        }
    }

    pub(crate) fn add_edge(&mut self, parent: NodeIndex, child: NodeIndex) -> EdgeIndex {
        self.graph.add_edge(parent, child, ())
    }

    pub(crate) fn unlink(&mut self, parent: NodeIndex, child: NodeIndex) {
        if let Some(edge) = self.graph.find_edge(parent, child) {
            self.graph.remove_edge(edge);
        }
    }

    pub(crate) fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }
}

impl Index<NodeIndex> for Arena {
    type Output = Node;

    /// Panics on a retired or unknown handle; callers check liveness first.
    fn index(&self, idx: NodeIndex) -> &Node {
        match &self.graph[idx] {
            Slot::Live(node) => &**node,
            Slot::Retired => panic!("node {} was destroyed", idx.index()),
        }
    }
}

impl IndexMut<NodeIndex> for Arena {
    fn index_mut(&mut self, idx: NodeIndex) -> &mut Node {
        match &mut self.graph[idx] {
            Slot::Live(node) => &mut **node,
            Slot::Retired => panic!("node {} was destroyed", idx.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn retired_slots_keep_their_index() {
        let mut arena = Arena::new();
        let parent = arena.add_node(Node::new(NodeKind::Group));
        let child = arena.add_node(Node::new(NodeKind::Group));
        arena.add_edge(parent, child);

        assert!(arena.retire(child).is_some());
        assert_eq!(arena.parent(child), None);
        assert!(arena.is_retired(child));
        assert!(arena.node_weight(child).is_none());
        assert!(arena.retire(child).is_none());

        let next = arena.add_node(Node::new(NodeKind::Group));
        assert_ne!(next, child);
        assert_eq!(arena.live_count(), 2);
        assert_eq!(arena.slot_count(), 3);
    }
}
