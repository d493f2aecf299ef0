//! On-disk shape of `draft_content.json`.
//!
//! Field order here is the order written to disk. The shape is pinned by the
//! golden fixture in the integration tests; change it only together with that
//! file.

use draftsmith_core::{CubicBezier, EasingCurve, Identifier, KeyframeProperty, Micros, TimeRange};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::segment::{
    CatalogRef, ClipSettings, EffectParam, MaskGeometry, TextBackground, TextBorder, TextShadow,
};

/// Format version written to new drafts. Newer files are rejected.
pub const SUPPORTED_VERSION: u32 = 360_000;
/// Editor release string written alongside the version.
pub const EDITOR_VERSION: &str = "110.0.0";
/// Duration the editor records for still images (three hours).
pub const PHOTO_DURATION: Micros = Micros(10_800_000_000);

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

/// Material lists every written draft carries, even when empty.
pub(crate) const MATERIAL_LISTS: [&str; 13] = [
    "videos",
    "audios",
    "texts",
    "speeds",
    "material_animations",
    "effects",
    "video_effects",
    "masks",
    "transitions",
    "audio_fades",
    "audio_effects",
    "canvases",
    "stickers",
];

/// Value of a field the model does not interpret but new entities need.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Fixed {
    Str(&'static str),
    Int(i64),
}

impl Fixed {
    fn to_value(self) -> Value {
        match self {
            Self::Str(s) => Value::from(s),
            Self::Int(n) => Value::from(n),
        }
    }
}

pub(crate) type Defaults = &'static [(&'static str, Fixed)];

pub(crate) const CANVAS_DEFAULTS: Defaults = &[("ratio", Fixed::Str("original"))];
pub(crate) const TRACK_DEFAULTS: Defaults = &[("flag", Fixed::Int(0))];
pub(crate) const AUDIO_DEFAULTS: Defaults = &[("type", Fixed::Str("extract_music"))];
pub(crate) const TEXT_DEFAULTS: Defaults = &[("type", Fixed::Str("text"))];
pub(crate) const SPEED_DEFAULTS: Defaults = &[("type", Fixed::Str("speed")), ("mode", Fixed::Int(0))];
pub(crate) const ANIMATION_GROUP_DEFAULTS: Defaults = &[("type", Fixed::Str("sticker_animation"))];
pub(crate) const ANIMATION_DEFAULTS: Defaults = &[("platform", Fixed::Str("all"))];
pub(crate) const FILTER_DEFAULTS: Defaults = &[("type", Fixed::Str("filter"))];
pub(crate) const VIDEO_EFFECT_DEFAULTS: Defaults = &[("type", Fixed::Str("video_effect"))];
pub(crate) const MASK_DEFAULTS: Defaults = &[("type", Fixed::Str("mask"))];
pub(crate) const TRANSITION_DEFAULTS: Defaults = &[("type", Fixed::Str("transition"))];
pub(crate) const FADE_DEFAULTS: Defaults =
    &[("type", Fixed::Str("audio_fade")), ("fade_type", Fixed::Int(0))];
pub(crate) const AUDIO_EFFECT_DEFAULTS: Defaults = &[("type", Fixed::Str("audio_effect"))];
pub(crate) const STICKER_DEFAULTS: Defaults = &[("type", Fixed::Str("sticker"))];

/// `extra` plus the defaults it lacks.
pub(crate) fn with_defaults(extra: &Map<String, Value>, defaults: Defaults) -> Map<String, Value> {
    let mut out = extra.clone();
    for (key, value) in defaults {
        out.entry(*key).or_insert_with(|| value.to_value());
    }
    out
}

/// `extra` without the fields that hold their default, which the writer
/// restores.
pub(crate) fn strip_defaults(mut extra: Map<String, Value>, defaults: Defaults) -> Map<String, Value> {
    for (key, value) in defaults {
        if extra.get(*key) == Some(&value.to_value()) {
            extra.remove(*key);
        }
    }
    extra
}

/// Top level of the file. Material lists stay raw here and are decoded one
/// entry at a time, so lists and entries the model does not know survive.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireDraft {
    pub id: Identifier,
    #[serde(default)]
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub new_version: String,
    pub fps: f64,
    pub duration: Micros,
    pub canvas_config: WireCanvas,
    pub materials: Map<String, Value>,
    pub tracks: Vec<WireTrack>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireCanvas {
    pub width: u32,
    pub height: u32,
    /// `ratio` and anything else the editor stores here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Material entries ────────────────────────────────────────────
//
// `type` tags that only name the entry kind are not modelled: they ride in
// `extra` and new entries get the editor's default.

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireVideo {
    pub id: Identifier,
    /// "video" or "photo".
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(default)]
    pub material_name: String,
    pub duration: Micros,
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireAudio {
    pub id: Identifier,
    pub path: String,
    #[serde(default)]
    pub name: String,
    pub duration: Micros,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireText {
    pub id: Identifier,
    /// JSON document of type [`WireTextContent`], stored as a string.
    pub content: String,
    #[serde(default)]
    pub alignment: u8,
    #[serde(default)]
    pub letter_spacing: f64,
    #[serde(default)]
    pub line_spacing: f64,
    #[serde(default)]
    pub border: Option<TextBorder>,
    #[serde(default)]
    pub shadow: Option<TextShadow>,
    #[serde(default)]
    pub background: Option<TextBackground>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireTextContent {
    pub styles: Vec<WireTextStyle>,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireTextStyle {
    pub range: [usize; 2],
    pub size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    pub fill: WireFill,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<CatalogRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFill {
    pub alpha: f64,
    pub content: WireFillContent,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFillContent {
    pub solid: WireSolid,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireSolid {
    pub color: [f64; 3],
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireSpeed {
    pub id: Identifier,
    pub speed: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireAnimationGroup {
    pub id: Identifier,
    pub animations: Vec<WireAnimation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireAnimation {
    #[serde(default)]
    pub name: String,
    /// Catalog effect id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(rename = "type")]
    pub slot: String,
    pub start: Micros,
    pub duration: Micros,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// With a flattened catalog ahead of `extra`, the catalog takes its own keys
// and `extra` receives the rest.

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFilter {
    pub id: Identifier,
    #[serde(flatten)]
    pub catalog: CatalogRef,
    /// Intensity, 0.0 to 1.0.
    pub value: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireVideoEffect {
    pub id: Identifier,
    #[serde(flatten)]
    pub catalog: CatalogRef,
    #[serde(default)]
    pub adjust_params: Vec<EffectParam>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireMask {
    pub id: Identifier,
    #[serde(flatten)]
    pub catalog: CatalogRef,
    pub config: MaskGeometry,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireTransition {
    pub id: Identifier,
    #[serde(flatten)]
    pub catalog: CatalogRef,
    pub duration: Micros,
    #[serde(default)]
    pub is_overlap: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFade {
    pub id: Identifier,
    pub fade_in_duration: Micros,
    pub fade_out_duration: Micros,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireAudioEffect {
    pub id: Identifier,
    #[serde(flatten)]
    pub catalog: CatalogRef,
    pub category_id: String,
    #[serde(default)]
    pub audio_adjust_params: Vec<EffectParam>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Background fill entry of the `canvases` list.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireBackground {
    pub id: Identifier,
    #[serde(rename = "type")]
    pub kind: String,
    pub blur: f64,
    pub color: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireSticker {
    pub id: Identifier,
    #[serde(flatten)]
    pub catalog: CatalogRef,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Tracks and segments ─────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireTrack {
    pub id: Identifier,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub render_index: i32,
    /// Bit 0 set when muted.
    #[serde(default)]
    pub attribute: u32,
    pub segments: Vec<WireSegment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireSegment {
    pub id: Identifier,
    pub material_id: Identifier,
    pub target_timerange: TimeRange,
    #[serde(default)]
    pub source_timerange: Option<TimeRange>,
    #[serde(default = "one")]
    pub speed: f64,
    #[serde(default = "one")]
    pub volume: f64,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default)]
    pub render_index: i32,
    #[serde(default)]
    pub clip: Option<WireClip>,
    #[serde(default)]
    pub extra_material_refs: SmallVec<[Identifier; 4]>,
    #[serde(default)]
    pub common_keyframes: Vec<WireKeyframeCurve>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireClip {
    pub alpha: f64,
    pub flip: WireFlip,
    pub rotation: f64,
    pub scale: WirePoint,
    pub transform: WirePoint,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFlip {
    pub horizontal: bool,
    pub vertical: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WirePoint {
    pub x: f64,
    pub y: f64,
}

impl From<ClipSettings> for WireClip {
    fn from(clip: ClipSettings) -> Self {
        Self {
            alpha: clip.alpha,
            flip: WireFlip {
                horizontal: clip.flip_horizontal,
                vertical: clip.flip_vertical,
            },
            rotation: clip.rotation,
            scale: WirePoint {
                x: clip.scale_x,
                y: clip.scale_y,
            },
            transform: WirePoint {
                x: clip.transform_x,
                y: clip.transform_y,
            },
        }
    }
}

impl From<WireClip> for ClipSettings {
    fn from(clip: WireClip) -> Self {
        Self {
            alpha: clip.alpha,
            flip_horizontal: clip.flip.horizontal,
            flip_vertical: clip.flip.vertical,
            rotation: clip.rotation,
            scale_x: clip.scale.x,
            scale_y: clip.scale.y,
            transform_x: clip.transform.x,
            transform_y: clip.transform.y,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireKeyframeCurve {
    pub id: Identifier,
    pub property_type: String,
    pub keyframe_list: Vec<WireKeyframe>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireKeyframe {
    pub id: Identifier,
    pub time_offset: Micros,
    pub values: SmallVec<[f64; 1]>,
    #[serde(rename = "curveType")]
    pub curve_type: String,
    /// Bézier control points, only for `"Bezier"` curves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<[f64; 4]>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Name tables ─────────────────────────────────────────────────

pub(crate) fn property_type(property: KeyframeProperty) -> &'static str {
    match property {
        KeyframeProperty::PositionX => "KFTypePositionX",
        KeyframeProperty::PositionY => "KFTypePositionY",
        KeyframeProperty::Rotation => "KFTypeRotation",
        KeyframeProperty::ScaleX => "KFTypeScaleX",
        KeyframeProperty::ScaleY => "KFTypeScaleY",
        KeyframeProperty::UniformScale => "UNIFORM_SCALE",
        KeyframeProperty::Alpha => "KFTypeGlobalAlpha",
        KeyframeProperty::Saturation => "KFTypeSaturation",
        KeyframeProperty::Contrast => "KFTypeContrast",
        KeyframeProperty::Brightness => "KFTypeBrightness",
        KeyframeProperty::Volume => "KFTypeVolume",
    }
}

pub(crate) fn property_from_type(name: &str) -> Option<KeyframeProperty> {
    KeyframeProperty::ALL
        .into_iter()
        .find(|p| property_type(*p) == name)
}

pub(crate) fn easing_to_wire(easing: EasingCurve) -> (String, Option<[f64; 4]>) {
    match easing {
        EasingCurve::Hold => ("Hold".to_string(), None),
        EasingCurve::Linear => ("Line".to_string(), None),
        EasingCurve::Bezier(b) => ("Bezier".to_string(), Some([b.x1, b.y1, b.x2, b.y2])),
    }
}

pub(crate) fn easing_from_wire(curve_type: &str, control: Option<[f64; 4]>) -> Option<EasingCurve> {
    match (curve_type, control) {
        ("Hold", _) => Some(EasingCurve::Hold),
        ("Line", _) => Some(EasingCurve::Linear),
        ("Bezier", Some([x1, y1, x2, y2])) => {
            Some(EasingCurve::Bezier(CubicBezier::new(x1, y1, x2, y2)))
        }
        _ => None,
    }
}
