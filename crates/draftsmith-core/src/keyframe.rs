//! Keyframe curves attached to segments.
//!
//! A curve animates one property of a segment. Point offsets are relative to
//! the owning segment's start. Easing uses cubic Bézier curves evaluated with
//! Newton-Raphson to map time onto the curve parameter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::id::{IdAllocator, Identifier};
use crate::time::Micros;

// ── Easing curves ───────────────────────────────────────────────

/// Cubic Bézier control points for easing (x1, y1, x2, y2).
/// The curve goes from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample_x(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * self.x1 + 3.0 * mt * t * t * self.x2 + t * t * t
    }

    fn sample_y(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * self.y1 + 3.0 * mt * t * t * self.y2 + t * t * t
    }

    fn sample_dx(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.x1 + 6.0 * mt * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }

    /// Eased progress for linear progress `x` in [0, 1].
    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut t = x;
        for _ in 0..8 {
            let x_est = self.sample_x(t) - x;
            let dx = self.sample_dx(t);
            if dx.abs() < 1e-12 {
                break;
            }
            t = (t - x_est / dx).clamp(0.0, 1.0);
            if x_est.abs() < 1e-10 {
                break;
            }
        }

        self.sample_y(t)
    }

    pub const LINEAR: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE: Self = Self::new(0.25, 0.1, 0.25, 1.0);
    pub const EASE_IN: Self = Self::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: Self = Self::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: Self = Self::new(0.42, 0.0, 0.58, 1.0);
}

/// How to interpolate from a point to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum EasingCurve {
    /// Keep the value until the next point.
    Hold,
    #[default]
    Linear,
    Bezier(CubicBezier),
}

// ── Properties ──────────────────────────────────────────────────

/// Segment property a curve animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyframeProperty {
    PositionX,
    PositionY,
    Rotation,
    ScaleX,
    ScaleY,
    UniformScale,
    Alpha,
    Saturation,
    Contrast,
    Brightness,
    Volume,
}

impl KeyframeProperty {
    pub const ALL: [Self; 11] = [
        Self::PositionX,
        Self::PositionY,
        Self::Rotation,
        Self::ScaleX,
        Self::ScaleY,
        Self::UniformScale,
        Self::Alpha,
        Self::Saturation,
        Self::Contrast,
        Self::Brightness,
        Self::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PositionX => "position_x",
            Self::PositionY => "position_y",
            Self::Rotation => "rotation",
            Self::ScaleX => "scale_x",
            Self::ScaleY => "scale_y",
            Self::UniformScale => "uniform_scale",
            Self::Alpha => "alpha",
            Self::Saturation => "saturation",
            Self::Contrast => "contrast",
            Self::Brightness => "brightness",
            Self::Volume => "volume",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Whether the property only makes sense on audible segments.
    pub fn is_audio(self) -> bool {
        matches!(self, Self::Volume)
    }
}

impl fmt::Display for KeyframeProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Keyframes ───────────────────────────────────────────────────

/// A single keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframePoint {
    pub id: Identifier,
    /// Offset from the owning segment's start.
    pub offset: Micros,
    pub value: f64,
    /// Easing used when interpolating to the next point.
    pub easing: EasingCurve,
    /// Fields of a loaded keyframe that are carried but not interpreted.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Keyframes for one property of one segment, sorted by offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeCurve {
    pub id: Identifier,
    pub property: KeyframeProperty,
    points: Vec<KeyframePoint>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl KeyframeCurve {
    pub fn new(id: Identifier, property: KeyframeProperty) -> Self {
        Self {
            id,
            property,
            points: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Build a curve from already identified points (as loaded from a file).
    pub fn from_points(
        id: Identifier,
        property: KeyframeProperty,
        mut points: Vec<KeyframePoint>,
    ) -> Self {
        points.sort_by_key(|p| p.offset);
        Self {
            id,
            property,
            points,
            extra: Map::new(),
        }
    }

    /// Insert or update the point at `offset`. New points get a fresh id.
    pub fn set(&mut self, ids: &mut IdAllocator, offset: Micros, value: f64, easing: EasingCurve) {
        if let Some(point) = self.points.iter_mut().find(|p| p.offset == offset) {
            point.value = value;
            point.easing = easing;
            return;
        }
        let pos = self
            .points
            .binary_search_by(|p| p.offset.cmp(&offset))
            .unwrap_or_else(|e| e);
        self.points.insert(
            pos,
            KeyframePoint {
                id: ids.new_id(),
                offset,
                value,
                easing,
                extra: Map::new(),
            },
        );
    }

    /// Remove the point at `offset`.
    pub fn remove(&mut self, offset: Micros) -> bool {
        if let Some(pos) = self.points.iter().position(|p| p.offset == offset) {
            self.points.remove(pos);
            true
        } else {
            false
        }
    }

    /// Value at `offset`: held before the first and after the last point.
    pub fn evaluate(&self, offset: Micros) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if offset <= first.offset {
            return Some(first.value);
        }
        if offset >= last.offset {
            return Some(last.value);
        }
        let idx = self
            .points
            .partition_point(|p| p.offset <= offset)
            .saturating_sub(1);
        Some(Self::interpolate(
            &self.points[idx],
            &self.points[idx + 1],
            offset,
        ))
    }

    fn interpolate(a: &KeyframePoint, b: &KeyframePoint, offset: Micros) -> f64 {
        let span = (b.offset - a.offset).0;
        if span <= 0 {
            return a.value;
        }
        let t = ((offset - a.offset).0 as f64 / span as f64).clamp(0.0, 1.0);

        match a.easing {
            EasingCurve::Hold => a.value,
            EasingCurve::Linear => a.value + (b.value - a.value) * t,
            EasingCurve::Bezier(bezier) => a.value + (b.value - a.value) * bezier.evaluate(t),
        }
    }

    pub fn points(&self) -> &[KeyframePoint] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [KeyframePoint] {
        &mut self.points
    }

    /// Rewrite every identifier in the curve.
    pub fn remap_ids(&mut self, mut remap: impl FnMut(&Identifier) -> Identifier) {
        self.id = remap(&self.id);
        for point in self.points_mut() {
            point.id = remap(&point.id);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest point offset, used to check curves stay inside their segment.
    pub fn last_offset(&self) -> Option<Micros> {
        self.points.last().map(|p| p.offset)
    }
}

impl fmt::Display for KeyframeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyframeCurve({}, {} points)",
            self.property,
            self.points.len()
        )
    }
}

// ── Tests ───────────────────────────────────────────────────────
