//! Attribute reads and writes.
//!
//! Every write goes through `set_attr_value`: the owning table is updated,
//! `<attr>Change` fires on the node (engine listeners invalidate derived
//! caches) and a redraw of the owning layer is requested.

use crate::node::ClipFunc;
use crate::scene::Scene;
use kurbo::{BezPath, Point};
use petgraph::stable_graph::NodeIndex;
use std::rc::Rc;
use strata_core::{Applied, Attr, AttrValue, EventData, Result, settings};

impl Scene {
    /// String-keyed write, e.g. `set_attr(node, "scaleX", 2.0)`.
    pub fn set_attr(&mut self, node: NodeIndex, name: &str, value: impl Into<AttrValue>) -> Result<()> {
        let attr: Attr = name.parse()?;
        self.set_attr_value(node, attr, value.into())
    }

    /// String-keyed read. Unset optional attributes read as `None`.
    pub fn get_attr(&self, node: NodeIndex, name: &str) -> Result<Option<AttrValue>> {
        let attr: Attr = name.parse()?;
        Ok(self.get(node, attr))
    }

    pub fn set(&mut self, node: NodeIndex, attr: Attr, value: impl Into<AttrValue>) -> Result<()> {
        self.set_attr_value(node, attr, value.into())
    }

    pub fn get(&self, node: NodeIndex, attr: Attr) -> Option<AttrValue> {
        self.graph.node_weight(node)?.get_attr(attr)
    }

    /// Attributes that differ from their defaults.
    pub fn get_attrs(&self, node: NodeIndex) -> Vec<(Attr, AttrValue)> {
        self.graph
            .node_weight(node)
            .map(|n| n.non_default_attrs())
            .unwrap_or_default()
    }

    /// Write several attributes with transform invalidation batched into a
    /// single pass. Stops at the first failing attribute.
    pub fn set_attrs<I>(&mut self, node: NodeIndex, attrs: I) -> Result<()>
    where
        I: IntoIterator<Item = (Attr, AttrValue)>,
    {
        self.check_live(node)?;
        self.batch_transform_changes(node, |scene| {
            attrs
                .into_iter()
                .try_for_each(|(attr, value)| scene.set_attr_value(node, attr, value))
        })
    }

    pub(crate) fn set_attr_value(&mut self, node: NodeIndex, attr: Attr, value: AttrValue) -> Result<()> {
        self.check_live(node)?;
        let n = &mut self.graph[node];
        let Applied::Changed { old } = n.apply_attr(attr, &value)? else {
            return Ok(());
        };
        if n.fire_change_events {
            let new = n.get_attr(attr).unwrap_or(AttrValue::Null);
            self.fire(node, &attr.change_event(), EventData::AttrChange { old, new }, false);
        }
        self.request_draw(node);
        Ok(())
    }

    /// Enable or disable `<attr>Change` events for this node. Engine cache
    /// invalidation rides on those events, so this is only safe for
    /// attributes that no derived value depends on.
    pub fn set_fire_change_events(&mut self, node: NodeIndex, enabled: bool) {
        if self.live(node, "set_fire_change_events") {
            self.graph[node].fire_change_events = enabled;
        }
    }

    fn warn_on_error(op: &str, result: Result<()>) {
        if let Err(err) = result {
            settings::warn(format_args!("{op}: {err}"));
        }
    }

    // ─── Grouped setters ─────────────────────────────────────────────────

    pub fn get_position(&self, node: NodeIndex) -> Point {
        Point::new(self.x(node), self.y(node))
    }

    pub fn set_position(&mut self, node: NodeIndex, pos: Point) {
        let result = self.set_attrs(node, [(Attr::X, pos.x.into()), (Attr::Y, pos.y.into())]);
        Self::warn_on_error("set_position", result);
    }

    pub fn set_scale(&mut self, node: NodeIndex, x: f64, y: f64) {
        let result = self.set_attrs(node, [(Attr::ScaleX, x.into()), (Attr::ScaleY, y.into())]);
        Self::warn_on_error("set_scale", result);
    }

    pub fn set_size(&mut self, node: NodeIndex, width: f64, height: f64) {
        let result = self.set_attrs(
            node,
            [(Attr::Width, width.into()), (Attr::Height, height.into())],
        );
        Self::warn_on_error("set_size", result);
    }

    /// Replace the container's clip with a path built by `func`, in the
    /// container's local coordinates. Takes precedence over `clip*`.
    pub fn set_clip_func(&mut self, node: NodeIndex, func: impl Fn(&mut BezPath) + 'static) {
        self.replace_clip_func(node, Some(Rc::new(func) as ClipFunc));
    }

    /// Go back to the rectangular `clip*` attributes.
    pub fn clear_clip_func(&mut self, node: NodeIndex) {
        self.replace_clip_func(node, None);
    }

    fn replace_clip_func(&mut self, node: NodeIndex, func: Option<ClipFunc>) {
        if !self.live(node, "set_clip_func") {
            return;
        }
        let Some(container) = self.graph[node].container.as_mut() else {
            settings::warn(format_args!("clip function ignored: #{} is not a container", node.index()));
            return;
        };
        container.clip_func = func;
        self.request_draw(node);
    }
}

macro_rules! number_accessors {
    ($($get:ident / $set:ident => $attr:ident),* $(,)?) => {
        impl Scene {
            $(
                pub fn $get(&self, node: NodeIndex) -> f64 {
                    self.get(node, Attr::$attr).and_then(|v| v.as_f64()).unwrap_or_default()
                }

                pub fn $set(&mut self, node: NodeIndex, value: f64) {
                    let result = self.set(node, Attr::$attr, value);
                    Self::warn_on_error(stringify!($set), result);
                }
            )*
        }
    };
}

macro_rules! flag_accessors {
    ($($get:ident / $set:ident => $attr:ident),* $(,)?) => {
        impl Scene {
            $(
                pub fn $get(&self, node: NodeIndex) -> bool {
                    self.get(node, Attr::$attr).and_then(|v| v.as_bool()).unwrap_or_default()
                }

                pub fn $set(&mut self, node: NodeIndex, value: bool) {
                    let result = self.set(node, Attr::$attr, value);
                    Self::warn_on_error(stringify!($set), result);
                }
            )*
        }
    };
}

number_accessors! {
    x / set_x => X,
    y / set_y => Y,
    width / set_width => Width,
    height / set_height => Height,
    rotation / set_rotation => Rotation,
    scale_x / set_scale_x => ScaleX,
    scale_y / set_scale_y => ScaleY,
    skew_x / set_skew_x => SkewX,
    skew_y / set_skew_y => SkewY,
    offset_x / set_offset_x => OffsetX,
    offset_y / set_offset_y => OffsetY,
    opacity / set_opacity => Opacity,
}

flag_accessors! {
    visible / set_visible => Visible,
    listening / set_listening => Listening,
    draggable / set_draggable => Draggable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Geometry;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use strata_core::SceneError;

    #[test]
    fn string_keyed_path() {
        let mut scene = Scene::with_seed(5);
        let rect = scene.create_rect(0.0, 0.0, 10.0, 10.0);
        scene.set_attr(rect, "fill", "rgb(0, 128, 0)").unwrap();
        assert_eq!(
            scene.get_attr(rect, "fill").unwrap(),
            Some(AttrValue::Text("#008000".into()))
        );
        assert!(matches!(
            scene.set_attr(rect, "colour", "red"),
            Err(SceneError::UnknownAttr(_))
        ));
        assert!(matches!(
            scene.set_attr(rect, "x", "ten"),
            Err(SceneError::AttrType { attr: "x", .. })
        ));
    }

    #[test]
    fn change_events_carry_old_and_new() {
        let mut scene = Scene::with_seed(5);
        let node = scene.create_group();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        scene.on(node, "opacityChange", move |_, event| sink.borrow_mut().push(event.data.clone()));
        scene.set_opacity(node, 0.5);
        scene.set_opacity(node, 0.5);
        assert_eq!(
            *seen.borrow(),
            vec![EventData::AttrChange {
                old: AttrValue::Number(1.0),
                new: AttrValue::Number(0.5),
            }]
        );
    }

    #[test]
    fn round_shapes_resize_through_width() {
        let mut scene = Scene::with_seed(5);
        let circle = scene.create_shape(Geometry::circle(5.0));
        assert_eq!(scene.width(circle), 10.0);
        scene.set_width(circle, 30.0);
        assert_eq!(scene.get(circle, Attr::Radius), Some(AttrValue::Number(15.0)));
    }

    #[test]
    fn set_attrs_applies_in_order_and_stops_on_error() {
        let mut scene = Scene::with_seed(5);
        let node = scene.create_group();
        let result = scene.set_attrs(
            node,
            [
                (Attr::X, 3.0.into()),
                (Attr::Visible, 1.0.into()),
                (Attr::Y, 4.0.into()),
            ],
        );
        assert!(result.is_err());
        assert_eq!(scene.get_position(node), Point::new(3.0, 0.0));
    }

    #[test]
    fn writes_to_destroyed_nodes_fail() {
        let mut scene = Scene::with_seed(5);
        let node = scene.create_group();
        scene.destroy(node).unwrap();
        assert!(matches!(scene.set(node, Attr::X, 1.0), Err(SceneError::Destroyed(_))));
        scene.set_x(node, 1.0);
        assert_eq!(scene.x(node), 0.0);
    }

    #[test]
    fn get_attrs_lists_changes_only() {
        let mut scene = Scene::with_seed(5);
        let node = scene.create_group();
        scene.set_attr(node, "id", "panel").unwrap();
        scene.set_x(node, 2.0);
        assert_eq!(
            scene.get_attrs(node),
            vec![
                (Attr::Id, AttrValue::Text("panel".into())),
                (Attr::X, AttrValue::Number(2.0)),
            ]
        );
    }
}
