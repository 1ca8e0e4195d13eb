//! Per-object configuration.
//!
//! Every struct has a `Default` matching the stock behavior and can be
//! deserialized from camelCase JSON, so hosts may keep scene setup in a
//! config file.

use crate::NodeIndex;
use serde::Deserialize;

/// Stage size and device pixel ratio.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageConfig {
    pub width: f64,
    pub height: f64,
    /// Physical pixels per logical unit for every layer's scene surface.
    pub pixel_ratio: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            pixel_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerConfig {
    /// Clear the scene and hit surfaces before each draw.
    pub clear_before_draw: bool,
    pub hit_pixel_ratio: f64,
    /// Antialias silhouettes on the hit surface. Edge pixels then carry
    /// partial alpha and are resolved by the spiral probe.
    pub hit_anti_alias: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            clear_before_draw: true,
            hit_pixel_ratio: 1.0,
            hit_anti_alias: true,
        }
    }
}

/// Options for freezing a subtree into an offscreen snapshot.
///
/// The box is measured from the node's client rect unless all four of
/// `x`, `y`, `width` and `height` are given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Extra padding on every side, in logical units.
    pub offset: f64,
    /// Defaults to the stage pixel ratio, or 1 for detached nodes.
    pub pixel_ratio: Option<f64>,
    pub hit_pixel_ratio: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            width: None,
            height: None,
            offset: 0.0,
            pixel_ratio: None,
            hit_pixel_ratio: 1.0,
        }
    }
}

impl CacheConfig {
    pub(crate) fn has_explicit_box(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.width.is_some() && self.height.is_some()
    }
}

/// Region and resolution for bitmap export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub pixel_ratio: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            width: None,
            height: None,
            pixel_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientRectConfig {
    /// Measure in the node's own coordinate space.
    pub skip_transform: bool,
    pub skip_shadow: bool,
    pub skip_stroke: bool,
    /// Express the rect relative to this ancestor instead of the root.
    #[serde(skip)]
    pub relative_to: Option<NodeIndex>,
}
