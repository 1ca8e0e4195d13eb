//! The node arena and event dispatch.
//!
//! A `Scene` owns every node of every stage created through it. Handles are
//! `NodeIndex` values into an `Arena` whose edges run parent → child; a
//! destroyed node's slot is retired so a handle is never reused for a
//! different node.
//!
//! Behavior is split across the other modules as `impl Scene` blocks:
//! `tree` (structure), `derived` (cached ancestor-dependent values),
//! `access` (attributes), `draw`, `snapshot`, `bounds`, `layer`, `stage`,
//! `serialize` and `export`.

use crate::arena::Arena;
use crate::config::{LayerConfig, StageConfig};
use crate::node::{CacheSlot, Event, Handler, LayerData, Node, NodeKind, ShapeData, StageData};
use crate::registry::HitRegistry;
use crate::shape::{Geometry, ShapeContext};
use crate::surface::RenderSurface;
use petgraph::stable_graph::NodeIndex;
use std::fmt;
use std::rc::Rc;
use strata_core::{Attr, EventData, RESERVED_NAMESPACE, Result, SceneError, ShapeStyle, settings};

/// Engine listeners shared by every node.
#[derive(Clone)]
struct Builtins {
    transform: Handler,
    opacity: Handler,
    visible: Handler,
    listening: Handler,
    stage_size: Handler,
}

impl Builtins {
    fn new() -> Self {
        Self {
            transform: Rc::new(|scene: &mut Scene, event: &mut Event| {
                scene.on_transform_change(event.current_target);
            }),
            opacity: Rc::new(|scene: &mut Scene, event: &mut Event| {
                scene.clear_self_and_descendant_cache(event.current_target, CacheSlot::AbsoluteOpacity);
            }),
            visible: Rc::new(|scene: &mut Scene, event: &mut Event| {
                scene.clear_self_and_descendant_cache(event.current_target, CacheSlot::Visible);
            }),
            listening: Rc::new(|scene: &mut Scene, event: &mut Event| {
                scene.clear_self_and_descendant_cache(event.current_target, CacheSlot::Listening);
            }),
            stage_size: Rc::new(|scene: &mut Scene, event: &mut Event| {
                scene.resize_stage(event.current_target);
            }),
        }
    }
}

pub struct Scene {
    pub(crate) graph: Arena,
    pub(crate) registry: HitRegistry,
    /// Layers waiting for the next `tick`, in request order.
    pub(crate) frame_queue: Vec<NodeIndex>,
    builtins: Builtins,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.graph.live_count())
            .field("slots", &self.graph.slot_count())
            .field("shapes", &self.registry.len())
            .field("frame_queue", &self.frame_queue)
            .finish()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_registry(HitRegistry::new())
    }

    /// A scene whose color keys come from a seeded generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_registry(HitRegistry::with_seed(seed))
    }

    fn with_registry(registry: HitRegistry) -> Self {
        Self {
            graph: Arena::new(),
            registry,
            frame_queue: Vec::new(),
            builtins: Builtins::new(),
        }
    }

    // ─── Node creation ───────────────────────────────────────────────────

    fn insert_node(&mut self, kind: NodeKind) -> NodeIndex {
        let is_stage = matches!(kind, NodeKind::Stage(_));
        let idx = self.graph.add_node(Node::new(kind));
        let builtins = self.builtins.clone();
        let listeners = &mut self.graph[idx].listeners;

        let transform_events = Attr::TRANSFORM
            .iter()
            .map(|attr| format!("{}.{RESERVED_NAMESPACE}", attr.change_event()))
            .collect::<Vec<_>>()
            .join(" ");
        listeners.on(&transform_events, builtins.transform);
        listeners.on(&format!("opacityChange.{RESERVED_NAMESPACE}"), builtins.opacity);
        listeners.on(&format!("visibleChange.{RESERVED_NAMESPACE}"), builtins.visible);
        listeners.on(&format!("listeningChange.{RESERVED_NAMESPACE}"), builtins.listening);
        if is_stage {
            listeners.on(
                &format!("widthChange.{RESERVED_NAMESPACE} heightChange.{RESERVED_NAMESPACE}"),
                builtins.stage_size,
            );
        }
        idx
    }

    pub fn create_stage(&mut self, config: StageConfig) -> Result<NodeIndex> {
        let buffer = RenderSurface::scene(config.width, config.height, config.pixel_ratio)?;
        let buffer_hit = RenderSurface::hit(config.width, config.height, 1.0)?;
        let idx = self.insert_node(NodeKind::Stage(Box::new(StageData {
            pixel_ratio: config.pixel_ratio,
            buffer: Some(buffer),
            buffer_hit: Some(buffer_hit),
            pointer: None,
        })));
        let attrs = &mut self.graph[idx].attrs;
        attrs.width = config.width;
        attrs.height = config.height;
        log::debug!(
            "created stage #{} ({}x{} @{})",
            idx.index(),
            config.width,
            config.height,
            config.pixel_ratio
        );
        Ok(idx)
    }

    /// Surfaces are allocated when the layer is added to a stage.
    pub fn create_layer(&mut self, config: LayerConfig) -> NodeIndex {
        self.insert_node(NodeKind::Layer(Box::new(LayerData::new(config))))
    }

    pub fn create_group(&mut self) -> NodeIndex {
        self.insert_node(NodeKind::Group)
    }

    /// Create a shape and register a fresh color key for it.
    pub fn create_shape(&mut self, geometry: Geometry) -> NodeIndex {
        let idx = self.insert_node(NodeKind::Shape(Box::new(ShapeData {
            color_key: None,
            geometry,
            style: ShapeStyle::default(),
        })));
        let key = self.registry.allocate(idx);
        if let Some(shape) = self.graph[idx].shape_mut() {
            shape.color_key = Some(key);
        }
        idx
    }

    pub fn create_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> NodeIndex {
        let idx = self.create_shape(Geometry::rect());
        let attrs = &mut self.graph[idx].attrs;
        attrs.x = x;
        attrs.y = y;
        attrs.width = width;
        attrs.height = height;
        idx
    }

    pub fn create_circle(&mut self, x: f64, y: f64, radius: f64) -> NodeIndex {
        let idx = self.create_shape(Geometry::circle(radius));
        let attrs = &mut self.graph[idx].attrs;
        attrs.x = x;
        attrs.y = y;
        idx
    }

    pub fn create_ellipse(&mut self, x: f64, y: f64, radius_x: f64, radius_y: f64) -> NodeIndex {
        let idx = self.create_shape(Geometry::ellipse(radius_x, radius_y));
        let attrs = &mut self.graph[idx].attrs;
        attrs.x = x;
        attrs.y = y;
        idx
    }

    /// `points` is a flat `[x0, y0, x1, y1, ...]` list.
    pub fn create_line(&mut self, points: Vec<f64>, closed: bool) -> NodeIndex {
        self.create_shape(Geometry::line(points, closed))
    }

    pub fn create_custom(&mut self, scene_func: impl Fn(&mut ShapeContext<'_>) + 'static) -> NodeIndex {
        self.create_shape(Geometry::custom(scene_func))
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    /// `None` once the node is destroyed.
    pub fn node(&self, node: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(node)
    }

    pub fn is_alive(&self, node: NodeIndex) -> bool {
        self.graph.node_weight(node).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.graph.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape currently bound to a hit color key.
    pub fn shape_for_key(&self, key: strata_core::ColorKey) -> Option<NodeIndex> {
        self.registry.lookup(key)
    }

    /// Error for structural calls on unknown or destroyed handles.
    pub(crate) fn check_live(&self, node: NodeIndex) -> Result<()> {
        if self.graph.node_weight(node).is_some() {
            Ok(())
        } else if self.graph.is_retired(node) {
            Err(SceneError::Destroyed(node.index()))
        } else {
            Err(SceneError::UnknownNode(node.index()))
        }
    }

    /// Misuse guard for calls that have no error channel.
    pub(crate) fn live(&self, node: NodeIndex, op: &str) -> bool {
        match self.check_live(node) {
            Ok(()) => true,
            Err(err) => {
                settings::warn(format_args!("{op} ignored: {err}"));
                false
            }
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Register a listener. `types` may list several space-separated
    /// `type.namespace` entries.
    pub fn on(
        &mut self,
        node: NodeIndex,
        types: &str,
        handler: impl Fn(&mut Scene, &mut Event) + 'static,
    ) {
        if !self.live(node, "on") {
            return;
        }
        self.graph[node].listeners.on(types, Rc::new(handler));
    }

    /// Remove listeners. Engine listeners survive unless their namespace is
    /// named explicitly.
    pub fn off(&mut self, node: NodeIndex, types: &str) {
        if !self.live(node, "off") {
            return;
        }
        self.graph[node].listeners.off(types);
    }

    /// Deliver an event to `node`, then to each listening ancestor when
    /// `bubble` is set, until a handler sets `cancel_bubble`.
    pub fn fire(&mut self, node: NodeIndex, event_type: &str, data: EventData, bubble: bool) {
        if !self.live(node, "fire") {
            return;
        }
        let mut event = Event {
            event_type: event_type.to_string(),
            target: node,
            current_target: node,
            data,
            cancel_bubble: false,
        };
        let mut current = Some(node);
        while let Some(idx) = current {
            event.current_target = idx;
            self.dispatch(idx, &mut event);
            if !bubble || event.cancel_bubble {
                break;
            }
            current = self.parent(idx).filter(|&p| self.is_listening(p));
        }
    }

    fn dispatch(&mut self, node: NodeIndex, event: &mut Event) {
        let Some(n) = self.graph.node_weight(node) else {
            return;
        };
        let handlers = n.listeners.handlers(&event.event_type);
        for handler in handlers {
            handler(self, event);
        }
    }
}
