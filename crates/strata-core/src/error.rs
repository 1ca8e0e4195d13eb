//! Hard errors: structural invariant violations and malformed input.
//!
//! Recoverable misuse (reordering a detached node, an invalid selector part,
//! drawing a destroyed shape) is reported through `settings::warn` instead.

use thiserror::Error;

pub type Result<T, E = SceneError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("you may only add layers to the stage (got {0})")]
    StageChild(&'static str),

    #[error("you may only add groups and shapes to a layer (got {0})")]
    LayerChild(&'static str),

    #[error("you may only add groups and shapes to groups (got {0})")]
    GroupChild(&'static str),

    #[error("{0} nodes cannot have children")]
    NotAContainer(&'static str),

    #[error("cannot add a node to itself or to one of its descendants")]
    Cycle,

    #[error("node {0} has been destroyed")]
    Destroyed(usize),

    #[error("node {0} does not exist")]
    UnknownNode(usize),

    #[error("unknown attribute `{0}`")]
    UnknownAttr(String),

    #[error("attribute `{attr}` expects {expected}")]
    AttrType {
        attr: &'static str,
        expected: &'static str,
    },

    #[error("attribute `{attr}` does not apply to {class} nodes")]
    AttrNotApplicable {
        attr: &'static str,
        class: &'static str,
    },

    #[error("unknown node class `{0}`")]
    UnknownClass(String),

    #[error("cannot allocate a {width}x{height} surface")]
    SurfaceSize { width: u32, height: u32 },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
