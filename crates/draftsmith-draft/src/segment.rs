//! Timeline segments and the modifiers attached to them.

use std::collections::HashMap;

use draftsmith_core::{
    IdAllocator, IdRemapper, Identifier, KeyframeCurve, KeyframeProperty, Micros, TimeRange,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::track::TrackKind;

/// Entry of an external catalog (effect, filter, font, animation...).
/// The library never interprets these values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRef {
    pub name: String,
    pub effect_id: String,
    pub resource_id: String,
}

impl CatalogRef {
    pub fn new(
        name: impl Into<String>,
        effect_id: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            effect_id: effect_id.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// Placement of a visual segment on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSettings {
    pub alpha: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// Clockwise, in degrees.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Offset in half-canvas units: -1.0 to 1.0 spans the canvas.
    pub transform_x: f64,
    pub transform_y: f64,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            flip_horizontal: false,
            flip_vertical: false,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            transform_x: 0.0,
            transform_y: 0.0,
        }
    }
}

// ── Text ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    /// RGB, each channel 0.0 to 1.0.
    pub color: [f64; 3],
    pub alpha: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<CatalogRef>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 8.0,
            color: [1.0, 1.0, 1.0],
            alpha: 1.0,
            bold: false,
            italic: false,
            underline: false,
            font: None,
        }
    }
}

/// Styling for the characters `start..end` of a text payload.
/// Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRun {
    pub start: usize,
    pub end: usize,
    pub style: TextStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBorder {
    pub alpha: f64,
    pub color: [f64; 3],
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    pub alpha: f64,
    pub color: [f64; 3],
    pub diffuse: f64,
    pub distance: f64,
    /// Degrees.
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBackground {
    /// `#RRGGBB`.
    pub color: String,
    pub style: u32,
    pub alpha: f64,
    pub round_radius: f64,
    pub height: f64,
    pub width: f64,
    pub horizontal_offset: f64,
    pub vertical_offset: f64,
}

/// Content document of a loaded text entry. Written back as it was unless
/// the payload's text or styles changed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawContent {
    pub text: String,
    pub value: Value,
}

/// Text content of a text segment. Serialized as its own material entry,
/// hence the separate identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPayload {
    pub content_id: Identifier,
    pub text: String,
    pub styles: Vec<StyleRun>,
    pub alignment: TextAlign,
    pub letter_spacing: f64,
    pub line_spacing: f64,
    pub border: Option<TextBorder>,
    pub shadow: Option<TextShadow>,
    pub background: Option<TextBackground>,
    pub(crate) raw_content: Option<RawContent>,
}

impl TextPayload {
    /// Payload with a single run covering the whole text.
    pub fn new(content_id: Identifier, text: impl Into<String>, style: TextStyle) -> Self {
        let text = text.into();
        let end = text.chars().count();
        Self {
            content_id,
            text,
            styles: vec![StyleRun {
                start: 0,
                end,
                style,
            }],
            alignment: TextAlign::default(),
            letter_spacing: 0.0,
            line_spacing: 0.02,
            border: None,
            shadow: None,
            background: None,
            raw_content: None,
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Replace the text and re-anchor the style runs to the new length.
    ///
    /// Runs inside the new length are kept, runs crossing the new end are
    /// truncated and runs starting at or after it are dropped. At least one run
    /// survives. When the text grows, the last run stretches over the added
    /// characters.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        let old_len = self.char_len();
        let new_len = text.chars().count();

        let mut runs = std::mem::take(&mut self.styles);
        runs.sort_by_key(|r| (r.start, r.end));
        let fallback = runs.first().cloned();

        let mut kept: Vec<StyleRun> = runs
            .into_iter()
            .filter(|r| r.start < new_len)
            .map(|mut r| {
                r.end = r.end.min(new_len);
                r
            })
            .collect();

        if kept.is_empty() {
            if let Some(mut first) = fallback {
                first.start = 0;
                first.end = new_len;
                kept.push(first);
            }
        }

        if new_len > old_len {
            if let Some(last) = kept.iter_mut().max_by_key(|r| r.end) {
                last.end = new_len;
            }
        }

        self.text = text;
        self.styles = kept;
    }

    /// Whether every run lies within the text.
    pub fn styles_in_bounds(&self) -> bool {
        let len = self.char_len();
        self.styles.iter().all(|r| r.start <= r.end && r.end <= len)
    }
}

// ── Attachments ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationSlot {
    In,
    Out,
    Loop,
    Group,
}

impl AnimationSlot {
    pub fn name(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Loop => "loop",
            Self::Group => "group",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::In, Self::Out, Self::Loop, Self::Group]
            .into_iter()
            .find(|s| s.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectParam {
    pub name: String,
    pub value: f64,
}

/// Mask shape in canvas-relative units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub feather: f64,
    pub round_corner: f64,
    pub invert: bool,
}

impl Default for MaskGeometry {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            width: 1.0,
            height: 1.0,
            rotation: 0.0,
            feather: 0.0,
            round_corner: 0.0,
            invert: false,
        }
    }
}

/// Audio effect families. A segment holds at most one effect of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEffectCategory {
    /// Scene sounds such as echo or telephone.
    SoundEffect,
    /// Voice changers.
    Tone,
    SpeechToSong,
}

impl AudioEffectCategory {
    pub const ALL: [Self; 3] = [Self::SoundEffect, Self::Tone, Self::SpeechToSong];

    pub fn name(self) -> &'static str {
        match self {
            Self::SoundEffect => "sound_effect",
            Self::Tone => "tone",
            Self::SpeechToSong => "speech_to_song",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// How the canvas behind a video segment is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// A blurred copy of the frame.
    Blur,
    Color,
}

impl FillMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Blur => "canvas_blur",
            Self::Color => "canvas_color",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Blur, Self::Color]
            .into_iter()
            .find(|m| m.name() == name)
    }
}

pub const DEFAULT_BACKGROUND_BLUR: f64 = 0.0625;
pub const DEFAULT_BACKGROUND_COLOR: &str = "#00000000";

#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentBody {
    /// Playback speed. A segment carrying one may read past its material's
    /// nominal duration.
    Speed { speed: f64 },
    Animation {
        slot: AnimationSlot,
        catalog: CatalogRef,
        /// Relative to the segment start.
        start: Micros,
        duration: Micros,
        /// Fields of the loaded animation the model does not interpret.
        extra: Map<String, Value>,
    },
    Filter { catalog: CatalogRef, intensity: f64 },
    Effect {
        catalog: CatalogRef,
        params: Vec<EffectParam>,
    },
    Mask {
        catalog: CatalogRef,
        geometry: MaskGeometry,
    },
    /// Transition into the next segment on the track.
    Transition {
        catalog: CatalogRef,
        duration: Micros,
        overlap: bool,
    },
    Fade { fade_in: Micros, fade_out: Micros },
    /// Audio effect on an audio segment or on the sound of a video segment.
    AudioEffect {
        category: AudioEffectCategory,
        catalog: CatalogRef,
        params: Vec<EffectParam>,
    },
    /// Canvas fill behind a video segment. Both the blur amount and the
    /// color are stored whatever the mode.
    Background {
        mode: FillMode,
        blur: f64,
        color: String,
    },
    /// A material entry of a kind this library does not model, kept verbatim
    /// together with the name of the list it came from.
    Opaque {
        list: String,
        value: Value,
    },
}

impl AttachmentBody {
    pub fn animation(slot: AnimationSlot, catalog: CatalogRef, start: Micros, duration: Micros) -> Self {
        Self::Animation {
            slot,
            catalog,
            start,
            duration,
            extra: Map::new(),
        }
    }

    pub fn background_blur(blur: f64) -> Self {
        Self::Background {
            mode: FillMode::Blur,
            blur,
            color: DEFAULT_BACKGROUND_COLOR.to_string(),
        }
    }

    pub fn background_color(color: impl Into<String>) -> Self {
        Self::Background {
            mode: FillMode::Color,
            blur: DEFAULT_BACKGROUND_BLUR,
            color: color.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Speed { .. } => "speed",
            Self::Animation { .. } => "animation",
            Self::Filter { .. } => "filter",
            Self::Effect { .. } => "effect",
            Self::Mask { .. } => "mask",
            Self::Transition { .. } => "transition",
            Self::Fade { .. } => "fade",
            Self::AudioEffect { .. } => "audio_effect",
            Self::Background { .. } => "background",
            Self::Opaque { .. } => "opaque",
        }
    }
}

/// A modifier owned by exactly one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: Identifier,
    pub body: AttachmentBody,
    /// Fields of the loaded material entry the model does not interpret.
    pub extra: Map<String, Value>,
}

impl Attachment {
    pub fn new(id: Identifier, body: AttachmentBody) -> Self {
        Self {
            id,
            body,
            extra: Map::new(),
        }
    }
}

// ── Segments ────────────────────────────────────────────────────

/// Kind-specific part of a segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentBody {
    Video {
        material_id: Identifier,
        /// Portion of the material played; `None` for stills placed as-is.
        source: Option<TimeRange>,
        volume: f64,
        clip: ClipSettings,
    },
    Audio {
        material_id: Identifier,
        source: Option<TimeRange>,
        volume: f64,
    },
    Text {
        payload: TextPayload,
        clip: ClipSettings,
    },
    /// Effect applied to the whole frame for the segment's time range.
    Effect {
        payload_id: Identifier,
        effect: CatalogRef,
        params: Vec<EffectParam>,
    },
    Filter {
        payload_id: Identifier,
        filter: CatalogRef,
        intensity: f64,
    },
    Sticker {
        payload_id: Identifier,
        sticker: CatalogRef,
        clip: ClipSettings,
    },
}

impl SegmentBody {
    pub fn kind(&self) -> TrackKind {
        match self {
            Self::Video { .. } => TrackKind::Video,
            Self::Audio { .. } => TrackKind::Audio,
            Self::Text { .. } => TrackKind::Text,
            Self::Effect { .. } => TrackKind::Effect,
            Self::Filter { .. } => TrackKind::Filter,
            Self::Sticker { .. } => TrackKind::Sticker,
        }
    }
}

/// A timed occupant of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: Identifier,
    /// Where the segment sits on the timeline.
    pub target: TimeRange,
    pub visible: bool,
    pub body: SegmentBody,
    pub attachments: Vec<Attachment>,
    pub keyframes: Vec<KeyframeCurve>,
    /// Fields of the loaded segment the model does not interpret.
    pub extra: Map<String, Value>,
    /// Uninterpreted fields of the material entry the segment owns: its
    /// text, effect, filter or sticker payload.
    pub payload_extra: Map<String, Value>,
}

impl Segment {
    pub fn new(id: Identifier, target: TimeRange, body: SegmentBody) -> Self {
        Self {
            id,
            target,
            visible: true,
            body,
            attachments: Vec::new(),
            keyframes: Vec::new(),
            extra: Map::new(),
            payload_extra: Map::new(),
        }
    }

    /// Video or photo segment playing the material from its start.
    pub fn video(ids: &mut IdAllocator, material_id: Identifier, target: TimeRange) -> Self {
        Self::new(
            ids.new_id(),
            target,
            SegmentBody::Video {
                material_id,
                source: Some(TimeRange::new(Micros::ZERO, target.duration)),
                volume: 1.0,
                clip: ClipSettings::default(),
            },
        )
    }

    pub fn audio(ids: &mut IdAllocator, material_id: Identifier, target: TimeRange) -> Self {
        Self::new(
            ids.new_id(),
            target,
            SegmentBody::Audio {
                material_id,
                source: Some(TimeRange::new(Micros::ZERO, target.duration)),
                volume: 1.0,
            },
        )
    }

    pub fn text(
        ids: &mut IdAllocator,
        text: impl Into<String>,
        target: TimeRange,
        style: TextStyle,
    ) -> Self {
        let id = ids.new_id();
        let payload = TextPayload::new(ids.new_id(), text, style);
        Self::new(
            id,
            target,
            SegmentBody::Text {
                payload,
                clip: ClipSettings::default(),
            },
        )
    }

    pub fn effect(ids: &mut IdAllocator, effect: CatalogRef, target: TimeRange) -> Self {
        let id = ids.new_id();
        Self::new(
            id,
            target,
            SegmentBody::Effect {
                payload_id: ids.new_id(),
                effect,
                params: Vec::new(),
            },
        )
    }

    pub fn filter(
        ids: &mut IdAllocator,
        filter: CatalogRef,
        intensity: f64,
        target: TimeRange,
    ) -> Self {
        let id = ids.new_id();
        Self::new(
            id,
            target,
            SegmentBody::Filter {
                payload_id: ids.new_id(),
                filter,
                intensity,
            },
        )
    }

    /// Sticker from the editor's sticker catalog.
    pub fn sticker(ids: &mut IdAllocator, sticker: CatalogRef, target: TimeRange) -> Self {
        let id = ids.new_id();
        Self::new(
            id,
            target,
            SegmentBody::Sticker {
                payload_id: ids.new_id(),
                sticker,
                clip: ClipSettings::default(),
            },
        )
    }

    /// Set the played portion of the material (video and audio only).
    pub fn with_source(mut self, range: Option<TimeRange>) -> Self {
        if let SegmentBody::Video { source, .. } | SegmentBody::Audio { source, .. } =
            &mut self.body
        {
            *source = range;
        }
        self
    }

    pub fn with_volume(mut self, value: f64) -> Self {
        if let SegmentBody::Video { volume, .. } | SegmentBody::Audio { volume, .. } =
            &mut self.body
        {
            *volume = value;
        }
        self
    }

    pub fn with_clip(mut self, settings: ClipSettings) -> Self {
        if let SegmentBody::Video { clip, .. }
        | SegmentBody::Text { clip, .. }
        | SegmentBody::Sticker { clip, .. } = &mut self.body
        {
            *clip = settings;
        }
        self
    }

    pub fn kind(&self) -> TrackKind {
        self.body.kind()
    }

    pub fn material_id(&self) -> Option<&Identifier> {
        match &self.body {
            SegmentBody::Video { material_id, .. } | SegmentBody::Audio { material_id, .. } => {
                Some(material_id)
            }
            _ => None,
        }
    }

    pub(crate) fn set_material_id(&mut self, id: Identifier) {
        if let SegmentBody::Video { material_id, .. } | SegmentBody::Audio { material_id, .. } =
            &mut self.body
        {
            *material_id = id;
        }
    }

    pub fn source(&self) -> Option<TimeRange> {
        match &self.body {
            SegmentBody::Video { source, .. } | SegmentBody::Audio { source, .. } => *source,
            _ => None,
        }
    }

    pub(crate) fn source_mut(&mut self) -> Option<&mut TimeRange> {
        match &mut self.body {
            SegmentBody::Video { source, .. } | SegmentBody::Audio { source, .. } => {
                source.as_mut()
            }
            _ => None,
        }
    }

    /// Speed from a speed attachment, if the segment has one.
    pub fn speed(&self) -> Option<f64> {
        self.attachments.iter().find_map(|a| match a.body {
            AttachmentBody::Speed { speed } => Some(speed),
            _ => None,
        })
    }

    pub fn text_payload(&self) -> Option<&TextPayload> {
        match &self.body {
            SegmentBody::Text { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn text_payload_mut(&mut self) -> Option<&mut TextPayload> {
        match &mut self.body {
            SegmentBody::Text { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn audio_effect(&self, category: AudioEffectCategory) -> Option<&Attachment> {
        self.attachments.iter().find(
            |a| matches!(&a.body, AttachmentBody::AudioEffect { category: c, .. } if *c == category),
        )
    }

    pub fn curve(&self, property: KeyframeProperty) -> Option<&KeyframeCurve> {
        self.keyframes.iter().find(|c| c.property == property)
    }

    pub fn attachment(&self, id: &Identifier) -> Option<&Attachment> {
        self.attachments.iter().find(|a| &a.id == id)
    }

    /// Identifiers this segment defines (not the material it references).
    pub fn owned_ids(&self) -> Vec<&Identifier> {
        let mut ids = vec![&self.id];
        match &self.body {
            SegmentBody::Text { payload, .. } => ids.push(&payload.content_id),
            SegmentBody::Effect { payload_id, .. }
            | SegmentBody::Filter { payload_id, .. }
            | SegmentBody::Sticker { payload_id, .. } => ids.push(payload_id),
            _ => {}
        }
        ids.extend(self.attachments.iter().map(|a| &a.id));
        for curve in &self.keyframes {
            ids.push(&curve.id);
            ids.extend(curve.points().iter().map(|p| &p.id));
        }
        ids
    }

    /// Move every owned identifier into the remapper's id space and repoint
    /// the material reference through `materials`.
    pub(crate) fn remap_ids(
        &mut self,
        remap: &mut IdRemapper<'_>,
        materials: &HashMap<Identifier, Identifier>,
    ) {
        self.id = remap.remap(&self.id);
        match &mut self.body {
            SegmentBody::Video { material_id, .. } | SegmentBody::Audio { material_id, .. } => {
                if let Some(mapped) = materials.get(material_id) {
                    *material_id = mapped.clone();
                }
            }
            SegmentBody::Text { payload, .. } => {
                payload.content_id = remap.remap(&payload.content_id);
            }
            SegmentBody::Effect { payload_id, .. }
            | SegmentBody::Filter { payload_id, .. }
            | SegmentBody::Sticker { payload_id, .. } => {
                *payload_id = remap.remap(payload_id);
            }
        }
        for attachment in &mut self.attachments {
            attachment.id = remap.remap(&attachment.id);
        }
        for curve in &mut self.keyframes {
            curve.remap_ids(|id| remap.remap(id));
        }
    }
}
