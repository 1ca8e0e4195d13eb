pub mod attrs;
pub mod color;
pub mod error;
pub mod events;
pub mod geometry;
pub mod id;
pub mod selector;
pub mod settings;
pub mod transform;

pub use attrs::{
    Applied, Attr, AttrTable, AttrValue, CompositeOp, ContainerAttrs, HitStrokeWidth, LineCap,
    LineJoin, NodeAttrs, ShapeStyle, TransformsEnabled,
};
pub use color::{Color, ColorKey};
pub use error::{Result, SceneError};
pub use events::{EventData, ListenerRegistry, RESERVED_NAMESPACE};
pub use geometry::ClientRect;
pub use id::Ident;
pub use selector::{Selectable, Selector};
pub use settings::AngleUnit;
pub use transform::{Decomposed, Transform};

// Re-export kurbo so downstream crates share one geometry vocabulary
pub use kurbo;
