//! Bitmap export of a node and its subtree.

use crate::config::{ClientRectConfig, ExportConfig};
use crate::scene::Scene;
use crate::surface::RenderSurface;
use petgraph::stable_graph::NodeIndex;
use strata_core::Result;

impl Scene {
    /// Draw `node` into a fresh scene surface covering its client rect, or
    /// the box given in `config`. A stage with nothing visible falls back to
    /// its own size.
    pub fn to_canvas(&self, node: NodeIndex, config: &ExportConfig) -> Result<RenderSurface> {
        self.check_live(node)?;
        let rect = self.get_client_rect(node, &ClientRectConfig::default());
        let stage_size = self
            .get_stage(node)
            .map(|s| &self.graph[s].attrs)
            .map_or((0.0, 0.0), |a| (a.width, a.height));

        let x = config.x.unwrap_or(rect.x);
        let y = config.y.unwrap_or(rect.y);
        let width = nonzero(config.width)
            .or(nonzero(Some(rect.width)))
            .unwrap_or(stage_size.0);
        let height = nonzero(config.height)
            .or(nonzero(Some(rect.height)))
            .unwrap_or(stage_size.1);

        let mut surface = RenderSurface::scene(width, height, config.pixel_ratio)?;
        let mut buffer = RenderSurface::scene(width, height, config.pixel_ratio)?;
        surface.save();
        surface.translate(-x, -y);
        self.draw_scene(node, &mut surface, None, Some(&mut buffer));
        surface.restore();
        log::debug!(
            "exported node #{} as {width}x{height} at ratio {}",
            node.index(),
            config.pixel_ratio
        );
        Ok(surface)
    }

    /// PNG bytes of `to_canvas`. Failures are logged and yield an empty
    /// vector.
    pub fn to_png(&self, node: NodeIndex, config: &ExportConfig) -> Vec<u8> {
        let encoded = self
            .to_canvas(node, config)
            .map_err(|err| err.to_string())
            .and_then(|surface| surface.encode_png());
        match encoded {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("cannot export node #{} as PNG: {err}", node.index());
                Vec::new()
            }
        }
    }
}

fn nonzero(v: Option<f64>) -> Option<f64> {
    v.filter(|&v| v != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerConfig, StageConfig};
    use pretty_assertions::assert_eq;
    use strata_core::Attr;

    #[test]
    fn export_covers_the_client_rect() {
        let mut scene = Scene::with_seed(11);
        let rect = scene.create_rect(40.0, 30.0, 8.0, 4.0);
        scene.set(rect, Attr::Fill, "blue").unwrap();
        let surface = scene.to_canvas(rect, &ExportConfig::default()).unwrap();
        assert_eq!(surface.physical_size(), (8, 4));
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(7, 3), Some([0, 0, 255, 255]));
    }

    #[test]
    fn export_honors_box_and_ratio() {
        let mut scene = Scene::with_seed(11);
        let rect = scene.create_rect(0.0, 0.0, 10.0, 10.0);
        scene.set(rect, Attr::Fill, "blue").unwrap();
        let config = ExportConfig {
            x: Some(5.0),
            y: Some(5.0),
            width: Some(10.0),
            height: Some(10.0),
            pixel_ratio: 2.0,
        };
        let surface = scene.to_canvas(rect, &config).unwrap();
        assert_eq!(surface.physical_size(), (20, 20));
        assert_eq!(surface.pixel(2, 2).map(|p| p[3]), Some(255));
        assert_eq!(surface.pixel(12, 12).map(|p| p[3]), Some(0));
    }

    #[test]
    fn empty_stage_exports_at_stage_size() {
        let mut scene = Scene::with_seed(11);
        let stage = scene
            .create_stage(StageConfig {
                width: 16.0,
                height: 9.0,
                pixel_ratio: 1.0,
            })
            .unwrap();
        let layer = scene.create_layer(LayerConfig::default());
        scene.add(stage, layer).unwrap();
        let png = scene.to_png(stage, &ExportConfig::default());
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn empty_nodes_export_nothing() {
        let mut scene = Scene::with_seed(11);
        let group = scene.create_group();
        assert!(scene.to_png(group, &ExportConfig::default()).is_empty());
    }
}
