//! Arena entries: the per-node record stored in the scene graph.

use crate::config::LayerConfig;
use crate::scene::Scene;
use crate::shape::Geometry;
use crate::surface::RenderSurface;
use kurbo::{BezPath, Point, Vec2};
use petgraph::stable_graph::NodeIndex;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use strata_core::{
    Applied, Attr, AttrTable, AttrValue, ColorKey, ContainerAttrs, EventData, ListenerRegistry,
    NodeAttrs, Result, SceneError, Selectable, ShapeStyle, Transform,
};

/// Event listener. Receives the whole scene so handlers can mutate it.
pub type Handler = Rc<dyn Fn(&mut Scene, &mut Event)>;

/// Builds a custom clip region in the container's local coordinates.
pub type ClipFunc = Rc<dyn Fn(&mut BezPath)>;

/// An event being delivered to a node and, when bubbling, its ancestors.
#[derive(Debug, Clone)]
pub struct Event {
    /// Base type without namespace, e.g. `xChange`.
    pub event_type: String,
    pub target: NodeIndex,
    /// Node whose listeners are currently running.
    pub current_target: NodeIndex,
    pub data: EventData,
    /// Set by a handler to stop bubbling after the current node.
    pub cancel_bubble: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Stage,
    Layer,
    Group,
    Shape,
}

impl NodeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Stage => "Stage",
            NodeType::Layer => "Layer",
            NodeType::Group => "Group",
            NodeType::Shape => "Shape",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Kind payloads ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct StageData {
    pub(crate) pixel_ratio: f64,
    /// Scratch scene surface, stage-sized, shared by every layer for
    /// buffered shape compositing.
    pub(crate) buffer: Option<RenderSurface>,
    /// Scratch hit surface for `Scene::intersects`, always at ratio 1.
    pub(crate) buffer_hit: Option<RenderSurface>,
    pub(crate) pointer: Option<Point>,
}

/// A layer's surfaces stay `None` until it is attached to a stage.
#[derive(Debug)]
pub struct LayerData {
    pub(crate) config: LayerConfig,
    pub(crate) scene: Option<RenderSurface>,
    pub(crate) hit: Option<RenderSurface>,
    pub(crate) waiting_for_draw: bool,
}

impl LayerData {
    pub(crate) fn new(config: LayerConfig) -> Self {
        Self {
            config,
            scene: None,
            hit: None,
            waiting_for_draw: false,
        }
    }
}

#[derive(Debug)]
pub struct ShapeData {
    /// `None` until the hit registry binds one.
    pub(crate) color_key: Option<ColorKey>,
    pub(crate) geometry: Geometry,
    pub(crate) style: ShapeStyle,
}

#[derive(Debug)]
pub enum NodeKind {
    Stage(Box<StageData>),
    Layer(Box<LayerData>),
    Group,
    Shape(Box<ShapeData>),
}

/// Ordered children plus clip settings, present on every container.
#[derive(Default)]
pub struct ContainerData {
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) clip: ContainerAttrs,
    pub(crate) clip_func: Option<ClipFunc>,
}

impl fmt::Debug for ContainerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerData")
            .field("children", &self.children)
            .field("clip", &self.clip)
            .field("clip_func", &self.clip_func.is_some())
            .finish()
    }
}

/// Frozen rendering of a subtree, blitted in place of a live draw.
#[derive(Debug)]
pub struct Snapshot {
    pub(crate) scene: RenderSurface,
    pub(crate) hit: RenderSurface,
    /// Local-space origin of the snapshot box.
    pub(crate) x: f64,
    pub(crate) y: f64,
}

impl Snapshot {
    pub fn scene(&self) -> &RenderSurface {
        &self.scene
    }

    pub fn hit(&self) -> &RenderSurface {
        &self.hit
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// ─── Derived-value cache ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSlot {
    Transform,
    AbsoluteTransform,
    AbsoluteOpacity,
    AbsoluteScale,
    Visible,
    Listening,
    Stage,
    All,
}

/// Values computed from a node's ancestor chain.
///
/// Transform slots are never emptied: invalidation sets their `dirty` bit
/// and the next read recomputes in place. The other slots are plain
/// `Option`s.
#[derive(Debug)]
pub(crate) struct DerivedCache {
    pub transform: Cell<Transform>,
    pub absolute_transform: Cell<Transform>,
    pub absolute_opacity: Cell<Option<f64>>,
    pub absolute_scale: Cell<Option<Vec2>>,
    pub visible: Cell<Option<bool>>,
    pub listening: Cell<Option<bool>>,
    pub stage: Cell<Option<Option<NodeIndex>>>,
}

impl Default for DerivedCache {
    fn default() -> Self {
        Self {
            transform: Cell::new(Transform::dirty_slot()),
            absolute_transform: Cell::new(Transform::dirty_slot()),
            absolute_opacity: Cell::new(None),
            absolute_scale: Cell::new(None),
            visible: Cell::new(None),
            listening: Cell::new(None),
            stage: Cell::new(None),
        }
    }
}

fn mark_dirty(cell: &Cell<Transform>) {
    let mut t = cell.get();
    t.dirty = true;
    cell.set(t);
}

impl DerivedCache {
    pub fn clear(&self, slot: CacheSlot) {
        match slot {
            CacheSlot::Transform => mark_dirty(&self.transform),
            CacheSlot::AbsoluteTransform => mark_dirty(&self.absolute_transform),
            CacheSlot::AbsoluteOpacity => self.absolute_opacity.set(None),
            CacheSlot::AbsoluteScale => self.absolute_scale.set(None),
            CacheSlot::Visible => self.visible.set(None),
            CacheSlot::Listening => self.listening.set(None),
            CacheSlot::Stage => self.stage.set(None),
            CacheSlot::All => {
                mark_dirty(&self.transform);
                mark_dirty(&self.absolute_transform);
                self.absolute_opacity.set(None);
                self.absolute_scale.set(None);
                self.visible.set(None);
                self.listening.set(None);
                self.stage.set(None);
            }
        }
    }
}

// ─── Node ────────────────────────────────────────────────────────────────

pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) attrs: NodeAttrs,
    /// `Some` for stages, layers and groups.
    pub(crate) container: Option<ContainerData>,
    /// Position in the parent's child list.
    pub(crate) index: usize,
    pub(crate) cache: DerivedCache,
    pub(crate) listeners: ListenerRegistry<Handler>,
    pub(crate) snapshot: Option<Snapshot>,
    /// Set while this node's subtree is being rasterized into a snapshot.
    pub(crate) under_cache: Cell<bool>,
    pub(crate) batching_transform: bool,
    pub(crate) need_transform_clear: bool,
    pub(crate) fire_change_events: bool,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("class", &self.class_name())
            .field("index", &self.index)
            .field("attrs", &self.attrs)
            .field("cached", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        let container = match kind {
            NodeKind::Shape(_) => None,
            _ => Some(ContainerData::default()),
        };
        Self {
            kind,
            attrs: NodeAttrs::default(),
            container,
            index: 0,
            cache: DerivedCache::default(),
            listeners: ListenerRegistry::new(),
            snapshot: None,
            under_cache: Cell::new(false),
            batching_transform: false,
            need_transform_clear: false,
            fire_change_events: true,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Stage(_) => NodeType::Stage,
            NodeKind::Layer(_) => NodeType::Layer,
            NodeKind::Group => NodeType::Group,
            NodeKind::Shape(_) => NodeType::Shape,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Shape(shape) => shape.geometry.class_name(),
            _ => self.node_type().as_str(),
        }
    }

    pub fn attrs(&self) -> &NodeAttrs {
        &self.attrs
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn children(&self) -> &[NodeIndex] {
        self.container
            .as_ref()
            .map(|c| c.children.as_slice())
            .unwrap_or_default()
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    pub fn shape(&self) -> Option<&ShapeData> {
        match &self.kind {
            NodeKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub(crate) fn shape_mut(&mut self) -> Option<&mut ShapeData> {
        match &mut self.kind {
            NodeKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn color_key(&self) -> Option<ColorKey> {
        self.shape().and_then(|s| s.color_key)
    }

    pub fn style(&self) -> Option<&ShapeStyle> {
        self.shape().map(|s| &s.style)
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.shape().map(|s| &s.geometry)
    }

    pub(crate) fn layer_data(&self) -> Option<&LayerData> {
        match &self.kind {
            NodeKind::Layer(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn layer_data_mut(&mut self) -> Option<&mut LayerData> {
        match &mut self.kind {
            NodeKind::Layer(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn stage_data(&self) -> Option<&StageData> {
        match &self.kind {
            NodeKind::Stage(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn stage_data_mut(&mut self) -> Option<&mut StageData> {
        match &mut self.kind {
            NodeKind::Stage(data) => Some(data),
            _ => None,
        }
    }

    // ─── Attribute dispatch ──────────────────────────────────────────────

    /// Read an attribute from whichever table owns it.
    pub fn get_attr(&self, attr: Attr) -> Option<AttrValue> {
        if let Some(shape) = self.shape() {
            if let Some(v) = shape.geometry.get_attr(attr) {
                return Some(v);
            }
            if let Some(v) = shape.style.get_attr(attr) {
                return Some(v);
            }
        }
        if let Some(v) = self.attrs.get_attr(attr) {
            return Some(v);
        }
        self.container.as_ref().and_then(|c| c.clip.get_attr(attr))
    }

    /// Write an attribute into the table that owns it.
    ///
    /// Attributes no table of this node kind owns are an error.
    pub(crate) fn apply_attr(&mut self, attr: Attr, value: &AttrValue) -> Result<Applied> {
        let class = self.class_name();
        if let Some(shape) = self.shape_mut() {
            match shape.geometry.set_attr(attr, value)? {
                Applied::NotHandled => {}
                applied => return Ok(applied),
            }
            match shape.style.set_attr(attr, value)? {
                Applied::NotHandled => {}
                applied => return Ok(applied),
            }
        }
        match self.attrs.set_attr(attr, value)? {
            Applied::NotHandled => {}
            applied => return Ok(applied),
        }
        if let Some(container) = self.container.as_mut() {
            match container.clip.set_attr(attr, value)? {
                Applied::NotHandled => {}
                applied => return Ok(applied),
            }
        }
        Err(SceneError::AttrNotApplicable {
            attr: attr.name(),
            class,
        })
    }

    /// Every attribute that differs from its default, in table order.
    pub fn non_default_attrs(&self) -> Vec<(Attr, AttrValue)> {
        let mut out = self.attrs.non_default();
        if let Some(shape) = self.shape() {
            // Round shapes report width/height through their radii.
            if matches!(shape.geometry, Geometry::Circle { .. } | Geometry::Ellipse { .. }) {
                out.retain(|(attr, _)| !matches!(attr, Attr::Width | Attr::Height));
            }
            out.extend(shape.geometry.non_default());
            out.extend(shape.style.non_default());
        }
        if let Some(container) = &self.container {
            out.extend(container.clip.non_default());
        }
        out
    }
}

impl Selectable for Node {
    fn selector_id(&self) -> Option<&str> {
        self.attrs.id.as_ref().map(|id| id.as_str())
    }

    fn has_name(&self, name: &str) -> bool {
        self.attrs.has_name(name)
    }

    fn class_name(&self) -> &str {
        Node::class_name(self)
    }

    fn node_type(&self) -> &str {
        Node::node_type(self).as_str()
    }
}
