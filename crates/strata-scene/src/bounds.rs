//! Client rects: axis-aligned bounds of what a node paints.

use crate::config::ClientRectConfig;
use crate::node::Node;
use crate::scene::Scene;
use petgraph::stable_graph::NodeIndex;
use strata_core::ClientRect;

impl Scene {
    /// Bounds of the node in root coordinates, or relative to
    /// `config.relative_to`, or in its own space with `skip_transform`.
    ///
    /// Containers union their visible children and report a zero rect when
    /// nothing visible is painted below them.
    pub fn get_client_rect(&self, node: NodeIndex, config: &ClientRectConfig) -> ClientRect {
        let Some(n) = self.graph.node_weight(node) else {
            return ClientRect::ZERO;
        };
        let rect = if n.shape().is_some() {
            shape_rect(n, config)
        } else {
            self.container_rect(node, n, config)
        };
        if config.skip_transform {
            return rect;
        }
        rect.transformed(&self.get_absolute_transform(node, config.relative_to))
    }

    fn container_rect(&self, node: NodeIndex, n: &Node, config: &ClientRectConfig) -> ClientRect {
        let child_config = ClientRectConfig {
            skip_transform: false,
            relative_to: Some(node),
            ..config.clone()
        };
        let union = n
            .children()
            .iter()
            .filter(|&&child| self.graph[child].attrs.visible)
            .map(|&child| self.get_client_rect(child, &child_config))
            .filter(|rect| !rect.is_empty())
            .reduce(|acc, rect| acc.union(&rect));

        let has_visible_shape = self
            .find_by(node, |d| d.shape().is_some())
            .into_iter()
            .any(|shape| self.is_visible_relative(shape, node));
        match union {
            Some(rect) if has_visible_shape => rect,
            _ => ClientRect::ZERO,
        }
    }
}

/// Fill rect grown by half the stroke, the shadow offset and the blur
/// radius on each side.
fn shape_rect(n: &Node, config: &ClientRectConfig) -> ClientRect {
    let (Some(geometry), Some(style)) = (n.geometry(), n.style()) else {
        return ClientRect::ZERO;
    };
    let fill = geometry.self_rect(&n.attrs);
    let stroke = if !config.skip_stroke && style.has_stroke() {
        style.stroke_width
    } else {
        0.0
    };
    let shadow = !config.skip_shadow && style.has_shadow();
    let (dx, dy, blur) = if shadow {
        (style.shadow_offset_x, style.shadow_offset_y, style.shadow_blur)
    } else {
        (0.0, 0.0, 0.0)
    };
    ClientRect::new(
        fill.x - (stroke / 2.0 + blur) + dx.min(0.0),
        fill.y - (stroke / 2.0 + blur) + dy.min(0.0),
        fill.width + stroke + dx.abs() + blur * 2.0,
        fill.height + stroke + dy.abs() + blur * 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strata_core::Attr;

    #[test]
    fn stroke_grows_the_rect_by_half_width() {
        let mut scene = Scene::with_seed(4);
        let rect = scene.create_rect(10.0, 10.0, 20.0, 10.0);
        scene.set(rect, Attr::Stroke, "black").unwrap();
        scene.set(rect, Attr::StrokeWidth, 4.0).unwrap();
        assert_eq!(
            scene.get_client_rect(rect, &ClientRectConfig::default()),
            ClientRect::new(8.0, 8.0, 24.0, 14.0)
        );
        let bare = ClientRectConfig {
            skip_stroke: true,
            skip_transform: true,
            ..ClientRectConfig::default()
        };
        assert_eq!(scene.get_client_rect(rect, &bare), ClientRect::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn shadow_extends_toward_its_offset() {
        let mut scene = Scene::with_seed(4);
        let circle = scene.create_circle(0.0, 0.0, 5.0);
        scene
            .set_attrs(
                circle,
                [
                    (Attr::ShadowColor, "black".into()),
                    (Attr::ShadowOffsetX, (-4.0).into()),
                    (Attr::ShadowBlur, 1.0.into()),
                ],
            )
            .unwrap();
        assert_eq!(
            scene.get_client_rect(circle, &ClientRectConfig::default()),
            ClientRect::new(-10.0, -6.0, 16.0, 12.0)
        );
    }

    #[test]
    fn group_unions_visible_children_under_its_transform() {
        let mut scene = Scene::with_seed(4);
        let group = scene.create_group();
        let a = scene.create_rect(0.0, 0.0, 10.0, 10.0);
        let b = scene.create_rect(20.0, 5.0, 10.0, 10.0);
        let hidden = scene.create_rect(100.0, 100.0, 10.0, 10.0);
        for child in [a, b, hidden] {
            scene.add(group, child).unwrap();
        }
        scene.set_visible(hidden, false);
        scene.set_scale(group, 2.0, 2.0);
        assert_eq!(
            scene.get_client_rect(group, &ClientRectConfig::default()),
            ClientRect::new(0.0, 0.0, 60.0, 30.0)
        );
        let local = ClientRectConfig {
            skip_transform: true,
            ..ClientRectConfig::default()
        };
        assert_eq!(scene.get_client_rect(group, &local), ClientRect::new(0.0, 0.0, 30.0, 15.0));
    }

    #[test]
    fn empty_or_invisible_subtrees_measure_zero() {
        let mut scene = Scene::with_seed(4);
        let outer = scene.create_group();
        let empty = scene.create_group();
        scene.add(outer, empty).unwrap();
        scene.set_x(outer, 50.0);
        assert!(scene.get_client_rect(outer, &ClientRectConfig::default()).is_empty());

        let rect = scene.create_rect(0.0, 0.0, 10.0, 10.0);
        scene.add(empty, rect).unwrap();
        scene.set_visible(empty, false);
        let local = ClientRectConfig {
            skip_transform: true,
            ..ClientRectConfig::default()
        };
        assert_eq!(scene.get_client_rect(outer, &local), ClientRect::ZERO);
        scene.set_visible(empty, true);
        assert_eq!(scene.get_client_rect(outer, &local), ClientRect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn relative_to_excludes_the_ancestor_transform() {
        let mut scene = Scene::with_seed(4);
        let group = scene.create_group();
        let rect = scene.create_rect(5.0, 5.0, 10.0, 10.0);
        scene.add(group, rect).unwrap();
        scene.set_position(group, kurbo::Point::new(100.0, 100.0));
        let cfg = ClientRectConfig {
            relative_to: Some(group),
            ..ClientRectConfig::default()
        };
        assert_eq!(scene.get_client_rect(rect, &cfg), ClientRect::new(5.0, 5.0, 10.0, 10.0));
    }
}
