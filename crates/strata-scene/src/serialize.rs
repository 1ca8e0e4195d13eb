//! JSON records of node trees.
//!
//! A record holds the class name, the attributes that differ from their
//! defaults and the child records. Callbacks (custom draw and clip
//! functions) and listeners are never serialized; a custom shape comes back
//! as a `Shape` that draws nothing.

use crate::config::{LayerConfig, StageConfig};
use crate::scene::Scene;
use crate::shape::Geometry;
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strata_core::{AttrValue, Result, SceneError, settings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub class_name: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl Scene {
    /// Snapshot `node` and its subtree as a record.
    pub fn to_object(&self, node: NodeIndex) -> Option<NodeRecord> {
        let mut visited = HashSet::new();
        self.record(node, &mut visited)
    }

    fn record(&self, node: NodeIndex, visited: &mut HashSet<NodeIndex>) -> Option<NodeRecord> {
        let n = self.graph.node_weight(node)?;
        if !visited.insert(node) {
            settings::warn(format_args!("node #{} reached twice while serializing", node.index()));
            return None;
        }
        let attrs = n
            .non_default_attrs()
            .into_iter()
            .map(|(attr, value)| (attr.name().to_string(), value))
            .collect();
        let children = n
            .children()
            .iter()
            .filter_map(|&child| self.record(child, visited))
            .collect();
        Some(NodeRecord {
            class_name: n.class_name().to_string(),
            attrs,
            children,
        })
    }

    pub fn to_json(&self, node: NodeIndex) -> Result<String> {
        self.check_live(node)?;
        let record = self.to_object(node).ok_or(SceneError::UnknownNode(node.index()))?;
        Ok(serde_json::to_string(&record)?)
    }

    /// Build a detached tree from a record. Shapes get fresh color keys.
    pub fn create_from_object(&mut self, record: &NodeRecord) -> Result<NodeIndex> {
        let node = self.create_for_class(record)?;
        if let Err(err) = self.hydrate(node, record) {
            // Leave no half-built tree behind.
            self.destroy(node)?;
            return Err(err);
        }
        Ok(node)
    }

    pub fn create_from_json(&mut self, json: &str) -> Result<NodeIndex> {
        let record: NodeRecord = serde_json::from_str(json)?;
        self.create_from_object(&record)
    }

    fn create_for_class(&mut self, record: &NodeRecord) -> Result<NodeIndex> {
        let number = |name: &str| record.attrs.get(name).and_then(AttrValue::as_f64).unwrap_or(0.0);
        let node = match record.class_name.as_str() {
            "Stage" => self.create_stage(StageConfig {
                width: number("width"),
                height: number("height"),
                ..StageConfig::default()
            })?,
            "Layer" => self.create_layer(LayerConfig::default()),
            "Group" => self.create_group(),
            "Rect" => self.create_shape(Geometry::rect()),
            "Circle" => self.create_shape(Geometry::circle(0.0)),
            "Ellipse" => self.create_shape(Geometry::ellipse(0.0, 0.0)),
            "Line" => self.create_shape(Geometry::line(Vec::new(), false)),
            "Shape" => self.create_shape(Geometry::custom(|_| {})),
            other => return Err(SceneError::UnknownClass(other.to_string())),
        };
        Ok(node)
    }

    fn hydrate(&mut self, node: NodeIndex, record: &NodeRecord) -> Result<()> {
        for (name, value) in &record.attrs {
            self.set_attr(node, name, value.clone())?;
        }
        for child_record in &record.children {
            let child = self.create_from_object(child_record)?;
            if let Err(err) = self.add(node, child) {
                self.destroy(child)?;
                return Err(err);
            }
        }
        Ok(())
    }
}
