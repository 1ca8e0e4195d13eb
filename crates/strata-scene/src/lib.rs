//! Retained-mode 2D scene graph.
//!
//! Nodes live in a [`Scene`] arena and are addressed by [`NodeIndex`]. A
//! stage holds layers; layers and groups hold groups and shapes. Each layer
//! paints into a scene surface and a hit surface, where every shape is
//! drawn in its own opaque color key so a single pixel read maps a point
//! back to the shape under it.

pub mod access;
mod arena;
pub mod bounds;
pub mod config;
pub mod derived;
pub mod draw;
pub mod export;
pub mod layer;
pub mod node;
pub mod registry;
pub mod scene;
pub mod serialize;
pub mod shape;
pub mod snapshot;
pub mod stage;
pub mod surface;
pub mod tree;

pub use config::{CacheConfig, ClientRectConfig, ExportConfig, LayerConfig, StageConfig};
pub use node::{Event, Handler, Node, NodeType, Snapshot};
pub use registry::HitRegistry;
pub use scene::Scene;
pub use serialize::NodeRecord;
pub use shape::{CustomShape, Geometry, ShapeContext};
pub use surface::{RenderSurface, Sampling, SurfaceKind};

pub use strata_core;

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::stable_graph::NodeIndex;
