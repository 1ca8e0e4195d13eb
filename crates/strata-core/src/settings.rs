//! Process-wide settings.
//!
//! These mirror the handful of knobs every scene shares regardless of which
//! `Scene` owns a node: the unit rotation attributes are expressed in, whether
//! misuse warnings are printed, and whether attribute changes schedule a
//! redraw automatically.

use std::f64::consts::PI;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static ANGLE_DEGREES: AtomicBool = AtomicBool::new(true);
static SHOW_WARNINGS: AtomicBool = AtomicBool::new(true);
static AUTO_DRAW: AtomicBool = AtomicBool::new(true);

/// Unit used by `rotation` attributes and by `Transform::decompose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    /// Convert an angle expressed in this unit to radians.
    pub fn to_radians(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Degrees => angle * PI / 180.0,
            AngleUnit::Radians => angle,
        }
    }

    /// Convert radians to an angle expressed in this unit.
    pub fn from_radians(self, radians: f64) -> f64 {
        match self {
            AngleUnit::Degrees => radians * 180.0 / PI,
            AngleUnit::Radians => radians,
        }
    }
}

pub fn angle_unit() -> AngleUnit {
    if ANGLE_DEGREES.load(Ordering::Relaxed) {
        AngleUnit::Degrees
    } else {
        AngleUnit::Radians
    }
}

pub fn set_angle_unit(unit: AngleUnit) {
    ANGLE_DEGREES.store(unit == AngleUnit::Degrees, Ordering::Relaxed);
}

pub fn show_warnings() -> bool {
    SHOW_WARNINGS.load(Ordering::Relaxed)
}

/// Silence (or re-enable) misuse warnings for the whole process.
pub fn set_show_warnings(enabled: bool) {
    SHOW_WARNINGS.store(enabled, Ordering::Relaxed);
}

/// When enabled, every attribute change requests a batched redraw of the
/// owning layer.
pub fn auto_draw_enabled() -> bool {
    AUTO_DRAW.load(Ordering::Relaxed)
}

pub fn set_auto_draw_enabled(enabled: bool) {
    AUTO_DRAW.store(enabled, Ordering::Relaxed);
}

/// Emit a programmer-misuse warning unless warnings are silenced.
pub fn warn(args: fmt::Arguments<'_>) {
    if show_warnings() {
        log::warn!("strata: {args}");
    }
}
