//! Typed attribute tables.
//!
//! Every node attribute is a statically-typed field on one of the tables
//! below. The string-keyed path used by serialization and animation goes
//! through the [`Attr`] enum: names resolve to a variant, and each table
//! dispatches `get_attr` / `set_attr` over the variants it owns.

use crate::color::Color;
use crate::error::{Result, SceneError};
use crate::id::Ident;
use crate::settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Attribute names ─────────────────────────────────────────────────────

macro_rules! attr_names {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every attribute known to the scene graph.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Attr {
            $($variant),*
        }

        impl Attr {
            pub const ALL: &'static [Attr] = &[$(Attr::$variant),*];

            /// The camelCase name used in change events and serialized records.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Attr::$variant => $name),*
                }
            }

            pub fn from_name(name: &str) -> Option<Attr> {
                match name {
                    $($name => Some(Attr::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

attr_names! {
    X => "x",
    Y => "y",
    Width => "width",
    Height => "height",
    Rotation => "rotation",
    ScaleX => "scaleX",
    ScaleY => "scaleY",
    SkewX => "skewX",
    SkewY => "skewY",
    OffsetX => "offsetX",
    OffsetY => "offsetY",
    Opacity => "opacity",
    Visible => "visible",
    Listening => "listening",
    Id => "id",
    Name => "name",
    TransformsEnabled => "transformsEnabled",
    GlobalCompositeOperation => "globalCompositeOperation",
    Draggable => "draggable",
    ClipX => "clipX",
    ClipY => "clipY",
    ClipWidth => "clipWidth",
    ClipHeight => "clipHeight",
    Fill => "fill",
    Stroke => "stroke",
    StrokeWidth => "strokeWidth",
    FillEnabled => "fillEnabled",
    StrokeEnabled => "strokeEnabled",
    HitStrokeWidth => "hitStrokeWidth",
    ShadowColor => "shadowColor",
    ShadowBlur => "shadowBlur",
    ShadowOffsetX => "shadowOffsetX",
    ShadowOffsetY => "shadowOffsetY",
    ShadowOpacity => "shadowOpacity",
    ShadowEnabled => "shadowEnabled",
    ShadowForStrokeEnabled => "shadowForStrokeEnabled",
    PerfectDrawEnabled => "perfectDrawEnabled",
    LineJoin => "lineJoin",
    LineCap => "lineCap",
    CornerRadius => "cornerRadius",
    Radius => "radius",
    RadiusX => "radiusX",
    RadiusY => "radiusY",
    Points => "points",
    Closed => "closed",
}

impl Attr {
    /// Attributes that feed the node's local transform.
    pub const TRANSFORM: &'static [Attr] = &[
        Attr::X,
        Attr::Y,
        Attr::Rotation,
        Attr::ScaleX,
        Attr::ScaleY,
        Attr::SkewX,
        Attr::SkewY,
        Attr::OffsetX,
        Attr::OffsetY,
        Attr::TransformsEnabled,
    ];

    /// Shape attributes that decide whether a shadow is drawn.
    pub const SHADOW: &'static [Attr] = &[
        Attr::ShadowColor,
        Attr::ShadowBlur,
        Attr::ShadowOffsetX,
        Attr::ShadowOffsetY,
        Attr::ShadowOpacity,
        Attr::ShadowEnabled,
    ];

    /// Name of the event fired after this attribute changes, e.g. `xChange`.
    pub fn change_event(self) -> String {
        format!("{}Change", self.name())
    }
}

impl FromStr for Attr {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self> {
        Attr::from_name(s).ok_or_else(|| SceneError::UnknownAttr(s.to_string()))
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Values ──────────────────────────────────────────────────────────────

/// A dynamically-typed attribute value on the string-keyed path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Unset: clears optional attributes.
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            AttrValue::Numbers(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        AttrValue::Numbers(v)
    }
}

impl From<Color> for AttrValue {
    fn from(c: Color) -> Self {
        AttrValue::Text(c.to_hex())
    }
}

/// Outcome of writing one attribute into a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Changed { old: AttrValue },
    Unchanged,
    /// The table does not own this attribute.
    NotHandled,
}

/// A table of typed attributes with string-keyed access.
pub trait AttrTable: Default {
    /// Attributes this table owns.
    const ATTRS: &'static [Attr];

    /// `None` when the attribute is unset or not owned by this table.
    fn get_attr(&self, attr: Attr) -> Option<AttrValue>;

    fn set_attr(&mut self, attr: Attr, value: &AttrValue) -> Result<Applied>;

    /// Attributes whose value differs from the table default, in `ATTRS` order.
    fn non_default(&self) -> Vec<(Attr, AttrValue)> {
        let defaults = Self::default();
        Self::ATTRS
            .iter()
            .filter_map(|&attr| {
                let value = self.get_attr(attr)?;
                (defaults.get_attr(attr).as_ref() != Some(&value)).then_some((attr, value))
            })
            .collect()
    }
}

// ─── Setter helpers ──────────────────────────────────────────────────────

pub fn type_error(attr: Attr, expected: &'static str) -> SceneError {
    SceneError::AttrType {
        attr: attr.name(),
        expected,
    }
}

fn changed<T: PartialEq>(field: &mut T, new: T, old_value: impl FnOnce(&T) -> AttrValue) -> Applied {
    if *field == new {
        return Applied::Unchanged;
    }
    let old = old_value(&*field);
    *field = new;
    Applied::Changed { old }
}

pub fn set_f64(field: &mut f64, attr: Attr, value: &AttrValue) -> Result<Applied> {
    let v = value.as_f64().ok_or_else(|| type_error(attr, "a number"))?;
    Ok(changed(field, v, |old| AttrValue::Number(*old)))
}

pub fn set_opt_f64(field: &mut Option<f64>, attr: Attr, value: &AttrValue) -> Result<Applied> {
    let v = match value {
        AttrValue::Null => None,
        other => Some(other.as_f64().ok_or_else(|| type_error(attr, "a number"))?),
    };
    Ok(changed(field, v, |old| old.map_or(AttrValue::Null, AttrValue::Number)))
}

pub fn set_bool(field: &mut bool, attr: Attr, value: &AttrValue) -> Result<Applied> {
    let v = value.as_bool().ok_or_else(|| type_error(attr, "a boolean"))?;
    Ok(changed(field, v, |old| AttrValue::Bool(*old)))
}

pub fn set_opt_color(field: &mut Option<Color>, attr: Attr, value: &AttrValue) -> Result<Applied> {
    let v = match value {
        AttrValue::Null => None,
        AttrValue::Text(s) => Some(Color::parse(s).ok_or_else(|| type_error(attr, "a color"))?),
        _ => return Err(type_error(attr, "a color")),
    };
    Ok(changed(field, v, |old| old.map_or(AttrValue::Null, AttrValue::from)))
}

fn set_keyword<T: FromStr + PartialEq + fmt::Display>(
    field: &mut T,
    attr: Attr,
    value: &AttrValue,
    expected: &'static str,
) -> Result<Applied> {
    let v = value
        .as_str()
        .and_then(|s| s.parse::<T>().ok())
        .ok_or_else(|| type_error(attr, expected))?;
    Ok(changed(field, v, |old| AttrValue::Text(old.to_string())))
}

fn set_opt_keyword<T: FromStr + PartialEq + fmt::Display>(
    field: &mut Option<T>,
    attr: Attr,
    value: &AttrValue,
    expected: &'static str,
) -> Result<Applied> {
    let v = match value {
        AttrValue::Null => None,
        other => Some(
            other
                .as_str()
                .and_then(|s| s.parse::<T>().ok())
                .ok_or_else(|| type_error(attr, expected))?,
        ),
    };
    Ok(changed(field, v, |old| {
        old.as_ref().map_or(AttrValue::Null, |k| AttrValue::Text(k.to_string()))
    }))
}

// ─── Keyword enums ───────────────────────────────────────────────────────

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $kw:literal),* $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl $name {
            pub const fn keyword(self) -> &'static str {
                match self {
                    $($name::$variant => $kw),*
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> std::result::Result<Self, ()> {
                match s {
                    $($kw => Ok($name::$variant),)*
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.keyword())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.keyword())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(|_| serde::de::Error::custom(format!("unknown {} `{s}`", stringify!($name))))
            }
        }
    };
}

keyword_enum! {
    /// How much of a node's local transform participates in absolute
    /// transform composition.
    TransformsEnabled {
        All => "all",
        Position => "position",
        None => "none",
    } default All
}

keyword_enum! {
    /// Canvas `globalCompositeOperation` values.
    CompositeOp {
        SourceOver => "source-over",
        SourceIn => "source-in",
        SourceOut => "source-out",
        SourceAtop => "source-atop",
        DestinationOver => "destination-over",
        DestinationIn => "destination-in",
        DestinationOut => "destination-out",
        DestinationAtop => "destination-atop",
        Lighter => "lighter",
        Copy => "copy",
        Xor => "xor",
        Multiply => "multiply",
        Screen => "screen",
        Overlay => "overlay",
        Darken => "darken",
        Lighten => "lighten",
        ColorDodge => "color-dodge",
        ColorBurn => "color-burn",
        HardLight => "hard-light",
        SoftLight => "soft-light",
        Difference => "difference",
        Exclusion => "exclusion",
        Hue => "hue",
        Saturation => "saturation",
        Color => "color",
        Luminosity => "luminosity",
    } default SourceOver
}

keyword_enum! {
    LineJoin {
        Miter => "miter",
        Round => "round",
        Bevel => "bevel",
    } default Miter
}

keyword_enum! {
    LineCap {
        Butt => "butt",
        Round => "round",
        Square => "square",
    } default Butt
}

/// Width of the stroke painted on hit surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HitStrokeWidth {
    /// Same as the visual stroke width.
    #[default]
    Auto,
    Fixed(f64),
}

// ─── Node attributes ─────────────────────────────────────────────────────

/// Attributes shared by every node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttrs {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// In the global angle unit.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub opacity: f64,
    pub visible: bool,
    pub listening: bool,
    pub id: Option<Ident>,
    /// Space-separated list of names, matched by `.name` selectors.
    pub name: Option<String>,
    pub transforms_enabled: TransformsEnabled,
    pub global_composite_operation: CompositeOp,
    pub draggable: bool,
}

impl Default for NodeAttrs {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            skew_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            opacity: 1.0,
            visible: true,
            listening: true,
            id: None,
            name: None,
            transforms_enabled: TransformsEnabled::All,
            global_composite_operation: CompositeOp::SourceOver,
            draggable: false,
        }
    }
}

impl NodeAttrs {
    pub fn has_name(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|names| names.split_whitespace().any(|n| n == name))
    }
}

impl AttrTable for NodeAttrs {
    const ATTRS: &'static [Attr] = &[
        Attr::Id,
        Attr::Name,
        Attr::X,
        Attr::Y,
        Attr::Width,
        Attr::Height,
        Attr::Rotation,
        Attr::ScaleX,
        Attr::ScaleY,
        Attr::SkewX,
        Attr::SkewY,
        Attr::OffsetX,
        Attr::OffsetY,
        Attr::Opacity,
        Attr::Visible,
        Attr::Listening,
        Attr::TransformsEnabled,
        Attr::GlobalCompositeOperation,
        Attr::Draggable,
    ];

    fn get_attr(&self, attr: Attr) -> Option<AttrValue> {
        Some(match attr {
            Attr::X => self.x.into(),
            Attr::Y => self.y.into(),
            Attr::Width => self.width.into(),
            Attr::Height => self.height.into(),
            Attr::Rotation => self.rotation.into(),
            Attr::ScaleX => self.scale_x.into(),
            Attr::ScaleY => self.scale_y.into(),
            Attr::SkewX => self.skew_x.into(),
            Attr::SkewY => self.skew_y.into(),
            Attr::OffsetX => self.offset_x.into(),
            Attr::OffsetY => self.offset_y.into(),
            Attr::Opacity => self.opacity.into(),
            Attr::Visible => self.visible.into(),
            Attr::Listening => self.listening.into(),
            Attr::Id => self.id?.as_str().into(),
            Attr::Name => self.name.clone()?.into(),
            Attr::TransformsEnabled => self.transforms_enabled.keyword().into(),
            Attr::GlobalCompositeOperation => self.global_composite_operation.keyword().into(),
            Attr::Draggable => self.draggable.into(),
            _ => return None,
        })
    }

    fn set_attr(&mut self, attr: Attr, value: &AttrValue) -> Result<Applied> {
        match attr {
            Attr::X => set_f64(&mut self.x, attr, value),
            Attr::Y => set_f64(&mut self.y, attr, value),
            Attr::Width => set_f64(&mut self.width, attr, value),
            Attr::Height => set_f64(&mut self.height, attr, value),
            Attr::Rotation => set_f64(&mut self.rotation, attr, value),
            Attr::ScaleX => set_f64(&mut self.scale_x, attr, value),
            Attr::ScaleY => set_f64(&mut self.scale_y, attr, value),
            Attr::SkewX => set_f64(&mut self.skew_x, attr, value),
            Attr::SkewY => set_f64(&mut self.skew_y, attr, value),
            Attr::OffsetX => set_f64(&mut self.offset_x, attr, value),
            Attr::OffsetY => set_f64(&mut self.offset_y, attr, value),
            Attr::Opacity => set_f64(&mut self.opacity, attr, value),
            Attr::Visible => set_bool(&mut self.visible, attr, value),
            Attr::Listening => set_bool(&mut self.listening, attr, value),
            Attr::Draggable => set_bool(&mut self.draggable, attr, value),
            Attr::Id => {
                let new = match value {
                    AttrValue::Null => None,
                    AttrValue::Text(s) => {
                        let id = Ident::intern(s);
                        if !id.is_selectable() {
                            settings::warn(format_args!("id \"{s}\" cannot be matched by a #id selector"));
                        }
                        Some(id)
                    }
                    _ => return Err(type_error(attr, "a string")),
                };
                Ok(changed(&mut self.id, new, |old| {
                    old.map_or(AttrValue::Null, |id| id.as_str().into())
                }))
            }
            Attr::Name => {
                let new = match value {
                    AttrValue::Null => None,
                    AttrValue::Text(s) => Some(s.clone()),
                    _ => return Err(type_error(attr, "a string")),
                };
                Ok(changed(&mut self.name, new, |old| {
                    old.clone().map_or(AttrValue::Null, AttrValue::Text)
                }))
            }
            Attr::TransformsEnabled => set_keyword(
                &mut self.transforms_enabled,
                attr,
                value,
                "one of `all`, `position`, `none`",
            ),
            Attr::GlobalCompositeOperation => set_keyword(
                &mut self.global_composite_operation,
                attr,
                value,
                "a composite operation",
            ),
            _ => Ok(Applied::NotHandled),
        }
    }
}

// ─── Container attributes ────────────────────────────────────────────────

/// Rectangular clip region of a container, in its local coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerAttrs {
    pub clip_x: Option<f64>,
    pub clip_y: Option<f64>,
    pub clip_width: Option<f64>,
    pub clip_height: Option<f64>,
}

impl ContainerAttrs {
    /// `(x, y, width, height)` when both clip dimensions are set and non-zero.
    pub fn clip_rect(&self) -> Option<(f64, f64, f64, f64)> {
        match (self.clip_width, self.clip_height) {
            (Some(w), Some(h)) if w != 0.0 && h != 0.0 => Some((
                self.clip_x.unwrap_or(0.0),
                self.clip_y.unwrap_or(0.0),
                w,
                h,
            )),
            _ => None,
        }
    }
}

impl AttrTable for ContainerAttrs {
    const ATTRS: &'static [Attr] = &[Attr::ClipX, Attr::ClipY, Attr::ClipWidth, Attr::ClipHeight];

    fn get_attr(&self, attr: Attr) -> Option<AttrValue> {
        let v = match attr {
            Attr::ClipX => self.clip_x,
            Attr::ClipY => self.clip_y,
            Attr::ClipWidth => self.clip_width,
            Attr::ClipHeight => self.clip_height,
            _ => None,
        };
        v.map(AttrValue::Number)
    }

    fn set_attr(&mut self, attr: Attr, value: &AttrValue) -> Result<Applied> {
        match attr {
            Attr::ClipX => set_opt_f64(&mut self.clip_x, attr, value),
            Attr::ClipY => set_opt_f64(&mut self.clip_y, attr, value),
            Attr::ClipWidth => set_opt_f64(&mut self.clip_width, attr, value),
            Attr::ClipHeight => set_opt_f64(&mut self.clip_height, attr, value),
            _ => Ok(Applied::NotHandled),
        }
    }
}

// ─── Shape style ─────────────────────────────────────────────────────────

/// Visual styling of a shape. Ignored entirely on hit surfaces, where the
/// shape's color key replaces fill and stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub fill_enabled: bool,
    pub stroke_enabled: bool,
    pub hit_stroke_width: HitStrokeWidth,
    pub shadow_color: Option<Color>,
    pub shadow_blur: f64,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub shadow_opacity: f64,
    pub shadow_enabled: bool,
    pub shadow_for_stroke_enabled: bool,
    pub perfect_draw_enabled: bool,
    pub line_join: Option<LineJoin>,
    pub line_cap: Option<LineCap>,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 2.0,
            fill_enabled: true,
            stroke_enabled: true,
            hit_stroke_width: HitStrokeWidth::Auto,
            shadow_color: None,
            shadow_blur: 0.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            shadow_opacity: 1.0,
            shadow_enabled: true,
            shadow_for_stroke_enabled: true,
            perfect_draw_enabled: true,
            line_join: None,
            line_cap: None,
        }
    }
}

impl ShapeStyle {
    pub fn has_fill(&self) -> bool {
        self.fill_enabled && self.fill.is_some()
    }

    pub fn has_stroke(&self) -> bool {
        self.stroke_enabled && self.stroke_width != 0.0 && self.stroke.is_some()
    }

    pub fn has_shadow(&self) -> bool {
        self.shadow_enabled
            && self.shadow_opacity != 0.0
            && (self.shadow_color.is_some()
                || self.shadow_blur != 0.0
                || self.shadow_offset_x != 0.0
                || self.shadow_offset_y != 0.0)
    }

    /// Whether a stroke is painted on hit surfaces.
    pub fn has_hit_stroke(&self) -> bool {
        match self.hit_stroke_width {
            HitStrokeWidth::Auto => self.has_stroke(),
            HitStrokeWidth::Fixed(w) => self.stroke_enabled && w != 0.0,
        }
    }

    pub fn hit_stroke_width_value(&self) -> f64 {
        match self.hit_stroke_width {
            HitStrokeWidth::Auto => self.stroke_width,
            HitStrokeWidth::Fixed(w) => w,
        }
    }
}

impl AttrTable for ShapeStyle {
    const ATTRS: &'static [Attr] = &[
        Attr::Fill,
        Attr::Stroke,
        Attr::StrokeWidth,
        Attr::FillEnabled,
        Attr::StrokeEnabled,
        Attr::HitStrokeWidth,
        Attr::ShadowColor,
        Attr::ShadowBlur,
        Attr::ShadowOffsetX,
        Attr::ShadowOffsetY,
        Attr::ShadowOpacity,
        Attr::ShadowEnabled,
        Attr::ShadowForStrokeEnabled,
        Attr::PerfectDrawEnabled,
        Attr::LineJoin,
        Attr::LineCap,
    ];

    fn get_attr(&self, attr: Attr) -> Option<AttrValue> {
        Some(match attr {
            Attr::Fill => self.fill?.into(),
            Attr::Stroke => self.stroke?.into(),
            Attr::StrokeWidth => self.stroke_width.into(),
            Attr::FillEnabled => self.fill_enabled.into(),
            Attr::StrokeEnabled => self.stroke_enabled.into(),
            Attr::HitStrokeWidth => match self.hit_stroke_width {
                HitStrokeWidth::Auto => "auto".into(),
                HitStrokeWidth::Fixed(w) => w.into(),
            },
            Attr::ShadowColor => self.shadow_color?.into(),
            Attr::ShadowBlur => self.shadow_blur.into(),
            Attr::ShadowOffsetX => self.shadow_offset_x.into(),
            Attr::ShadowOffsetY => self.shadow_offset_y.into(),
            Attr::ShadowOpacity => self.shadow_opacity.into(),
            Attr::ShadowEnabled => self.shadow_enabled.into(),
            Attr::ShadowForStrokeEnabled => self.shadow_for_stroke_enabled.into(),
            Attr::PerfectDrawEnabled => self.perfect_draw_enabled.into(),
            Attr::LineJoin => self.line_join?.keyword().into(),
            Attr::LineCap => self.line_cap?.keyword().into(),
            _ => return None,
        })
    }

    fn set_attr(&mut self, attr: Attr, value: &AttrValue) -> Result<Applied> {
        match attr {
            Attr::Fill => set_opt_color(&mut self.fill, attr, value),
            Attr::Stroke => set_opt_color(&mut self.stroke, attr, value),
            Attr::StrokeWidth => set_f64(&mut self.stroke_width, attr, value),
            Attr::FillEnabled => set_bool(&mut self.fill_enabled, attr, value),
            Attr::StrokeEnabled => set_bool(&mut self.stroke_enabled, attr, value),
            Attr::HitStrokeWidth => {
                let new = match value {
                    AttrValue::Text(s) if s == "auto" => HitStrokeWidth::Auto,
                    AttrValue::Number(w) => HitStrokeWidth::Fixed(*w),
                    _ => return Err(type_error(attr, "a number or `auto`")),
                };
                Ok(changed(&mut self.hit_stroke_width, new, |old| match old {
                    HitStrokeWidth::Auto => "auto".into(),
                    HitStrokeWidth::Fixed(w) => (*w).into(),
                }))
            }
            Attr::ShadowColor => set_opt_color(&mut self.shadow_color, attr, value),
            Attr::ShadowBlur => set_f64(&mut self.shadow_blur, attr, value),
            Attr::ShadowOffsetX => set_f64(&mut self.shadow_offset_x, attr, value),
            Attr::ShadowOffsetY => set_f64(&mut self.shadow_offset_y, attr, value),
            Attr::ShadowOpacity => set_f64(&mut self.shadow_opacity, attr, value),
            Attr::ShadowEnabled => set_bool(&mut self.shadow_enabled, attr, value),
            Attr::ShadowForStrokeEnabled => {
                set_bool(&mut self.shadow_for_stroke_enabled, attr, value)
            }
            Attr::PerfectDrawEnabled => set_bool(&mut self.perfect_draw_enabled, attr, value),
            Attr::LineJoin => set_opt_keyword(
                &mut self.line_join,
                attr,
                value,
                "one of `miter`, `round`, `bevel`",
            ),
            Attr::LineCap => set_opt_keyword(
                &mut self.line_cap,
                attr,
                value,
                "one of `butt`, `round`, `square`",
            ),
            _ => Ok(Applied::NotHandled),
        }
    }
}
