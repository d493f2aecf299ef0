//! Writing and reading `draft_content.json`.
//!
//! Output is deterministic: the same document always produces the same bytes.
//! Parsing keeps every identifier verbatim and rejects anything it cannot
//! resolve, so a loaded document is always safe to merge into.
//!
//! A loaded file keeps what the model does not interpret. Unknown fields of
//! each entity, material entries no segment references and whole material
//! lists of unknown kinds are written back as they were read, in their
//! original positions.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use draftsmith_core::{
    DraftError, FrameRate, IdAllocator, Identifier, KeyframeCurve, KeyframePoint, Micros, Result,
};
use draftsmith_media::MediaKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::document::{check_media_class, DraftDocument};
use crate::material::{Material, MaterialRegistry, Provenance};
use crate::segment::{
    AnimationSlot, Attachment, AttachmentBody, AudioEffectCategory, CatalogRef, ClipSettings,
    FillMode, RawContent, Segment, SegmentBody, StyleRun, TextAlign, TextPayload, TextStyle,
};
use crate::track::{Track, TrackKind};
use crate::wire::{
    easing_from_wire, easing_to_wire, property_from_type, property_type, strip_defaults,
    with_defaults, WireAnimation, WireAnimationGroup, WireAudio, WireAudioEffect, WireBackground,
    WireCanvas, WireDraft, WireFade, WireFill, WireFillContent, WireFilter, WireKeyframe,
    WireKeyframeCurve, WireMask, WireSegment, WireSolid, WireSpeed, WireSticker, WireText,
    WireTextContent, WireTextStyle, WireTrack, WireTransition, WireVideo, WireVideoEffect,
    ANIMATION_DEFAULTS, ANIMATION_GROUP_DEFAULTS, AUDIO_DEFAULTS, AUDIO_EFFECT_DEFAULTS,
    CANVAS_DEFAULTS, FADE_DEFAULTS, FILTER_DEFAULTS, MASK_DEFAULTS, MATERIAL_LISTS,
    PHOTO_DURATION, SPEED_DEFAULTS, STICKER_DEFAULTS, SUPPORTED_VERSION, TEXT_DEFAULTS,
    TRACK_DEFAULTS, TRANSITION_DEFAULTS, VIDEO_EFFECT_DEFAULTS,
};

/// Parts of a loaded file outside the model.
#[derive(Debug, Clone, Default)]
pub(crate) struct FileResidue {
    /// `canvas_config` fields besides the size.
    pub canvas: Map<String, Value>,
    /// Every material list name in the file, empty ones included.
    pub lists: Vec<String>,
    /// Material lists whose value is not an array.
    pub raw_lists: Map<String, Value>,
    /// Material entries no segment claimed.
    pub orphans: Vec<Orphan>,
    /// Position of each identified material entry within its list.
    pub order: HashMap<Identifier, usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Orphan {
    pub list: String,
    pub position: usize,
    pub value: Value,
}

/// Serialize a document to pretty-printed JSON bytes.
///
/// The document is validated first; an inconsistent document is never
/// written.
pub fn serialize(doc: &DraftDocument) -> Result<Vec<u8>> {
    let wire = to_wire(doc)?;
    serde_json::to_vec_pretty(&wire)
        .map_err(|e| DraftError::malformed(format!("failed to serialize draft: {e}")))
}

/// Serialize a document to a JSON value.
pub fn to_value(doc: &DraftDocument) -> Result<Value> {
    let wire = to_wire(doc)?;
    serde_json::to_value(&wire)
        .map_err(|e| DraftError::malformed(format!("failed to serialize draft: {e}")))
}

/// Parse a draft with a random identifier allocator.
pub fn parse(data: &[u8]) -> Result<DraftDocument> {
    parse_with(data, IdAllocator::random())
}

/// Parse a draft. Every identifier in the file is reserved in `ids`, so ids
/// allocated afterwards never collide with loaded ones.
pub fn parse_with(data: &[u8], ids: IdAllocator) -> Result<DraftDocument> {
    let raw: Value = serde_json::from_slice(data)
        .map_err(|e| DraftError::malformed(format!("invalid JSON: {e}")))?;

    let version = raw
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| DraftError::malformed("missing version"))?;
    if version > u64::from(SUPPORTED_VERSION) {
        return Err(DraftError::malformed(format!(
            "draft version {version} is newer than supported version {SUPPORTED_VERSION}"
        )));
    }

    let wire: WireDraft = serde_json::from_value(raw)
        .map_err(|e| DraftError::malformed(format!("invalid draft: {e}")))?;
    let doc = Loader::new(ids).load(wire)?;
    info!(
        draft = %doc.name,
        version = doc.version,
        tracks = doc.tracks.len(),
        materials = doc.materials.len(),
        "parsed draft"
    );
    Ok(doc)
}

/// Read and parse a draft file.
pub fn load_file(path: &Path) -> Result<DraftDocument> {
    let data = std::fs::read(path)?;
    parse(&data)
}

/// Serialize a document into a file.
pub fn save_file(doc: &DraftDocument, path: &Path) -> Result<()> {
    let data = serialize(doc)?;
    std::fs::write(path, data)?;
    Ok(())
}

// ── Writing ─────────────────────────────────────────────────────

/// Material lists being written. Entries a loaded file had go back to their
/// position; new entries follow them in write order.
struct MaterialLists<'a> {
    residue: &'a FileResidue,
    lists: BTreeMap<String, Vec<(usize, Value)>>,
}

impl<'a> MaterialLists<'a> {
    fn new(residue: &'a FileResidue) -> Self {
        let mut lists: BTreeMap<String, Vec<(usize, Value)>> = BTreeMap::new();
        let names = MATERIAL_LISTS
            .iter()
            .copied()
            .chain(residue.lists.iter().map(String::as_str));
        for name in names {
            if !residue.raw_lists.contains_key(name) {
                lists.entry(name.to_string()).or_default();
            }
        }
        for orphan in &residue.orphans {
            lists
                .entry(orphan.list.clone())
                .or_default()
                .push((orphan.position, orphan.value.clone()));
        }
        Self { residue, lists }
    }

    fn push(&mut self, list: &str, id: &Identifier, entry: &impl Serialize) -> Result<()> {
        let value = serde_json::to_value(entry).map_err(|e| {
            DraftError::malformed(format!("failed to serialize {list} entry {id}: {e}"))
        })?;
        self.push_value(list, id, value);
        Ok(())
    }

    fn push_value(&mut self, list: &str, id: &Identifier, value: Value) {
        let position = self.residue.order.get(id).copied().unwrap_or(usize::MAX);
        self.lists
            .entry(list.to_string())
            .or_default()
            .push((position, value));
    }

    fn finish(self) -> Map<String, Value> {
        let mut out = self.residue.raw_lists.clone();
        for (name, mut entries) in self.lists {
            entries.sort_by_key(|(position, _)| *position);
            let items = entries.into_iter().map(|(_, value)| value).collect();
            out.insert(name, Value::Array(items));
        }
        out
    }
}

fn to_wire(doc: &DraftDocument) -> Result<WireDraft> {
    doc.validate()?;

    let mut lists = MaterialLists::new(&doc.residue);
    for material in doc.materials.iter() {
        let path = material.path.to_string_lossy().into_owned();
        match material.kind {
            MediaKind::Audio => lists.push(
                "audios",
                &material.id,
                &WireAudio {
                    id: material.id.clone(),
                    path,
                    name: material.name.clone(),
                    duration: material.duration.unwrap_or(Micros::ZERO),
                    extra: with_defaults(&material.extra, AUDIO_DEFAULTS),
                },
            )?,
            MediaKind::Video | MediaKind::Photo => lists.push(
                "videos",
                &material.id,
                &WireVideo {
                    id: material.id.clone(),
                    kind: if material.kind == MediaKind::Photo {
                        "photo"
                    } else {
                        "video"
                    }
                    .to_string(),
                    path,
                    material_name: material.name.clone(),
                    duration: material.duration.unwrap_or(PHOTO_DURATION),
                    width: material.width,
                    height: material.height,
                    extra: material.extra.clone(),
                },
            )?,
        }
    }

    let mut tracks = Vec::with_capacity(doc.tracks.len());
    for track in &doc.tracks {
        let mut segments = Vec::with_capacity(track.segments.len());
        for segment in &track.segments {
            segments.push(segment_to_wire(segment, track, &mut lists)?);
        }
        tracks.push(WireTrack {
            id: track.id.clone(),
            kind: track.kind.name().to_string(),
            name: track.name.clone(),
            render_index: track.render_index,
            attribute: u32::from(track.muted),
            segments,
            extra: with_defaults(&track.extra, TRACK_DEFAULTS),
        });
    }

    Ok(WireDraft {
        id: doc.id.clone(),
        name: doc.name.clone(),
        version: doc.version,
        new_version: doc.editor_version.clone(),
        fps: doc.fps.to_fps_f64(),
        duration: doc.duration(),
        canvas_config: WireCanvas {
            width: doc.width,
            height: doc.height,
            extra: with_defaults(&doc.residue.canvas, CANVAS_DEFAULTS),
        },
        materials: lists.finish(),
        tracks,
        extra: doc.metadata.clone(),
    })
}

fn segment_to_wire(
    segment: &Segment,
    track: &Track,
    lists: &mut MaterialLists<'_>,
) -> Result<WireSegment> {
    let payload_extra = |defaults| with_defaults(&segment.payload_extra, defaults);
    let (material_id, volume, clip) = match &segment.body {
        SegmentBody::Video {
            material_id,
            volume,
            clip,
            ..
        } => (material_id.clone(), *volume, Some((*clip).into())),
        SegmentBody::Audio {
            material_id,
            volume,
            ..
        } => (material_id.clone(), *volume, None),
        SegmentBody::Text { payload, clip } => {
            let entry = text_to_wire(payload, payload_extra(TEXT_DEFAULTS))?;
            lists.push("texts", &payload.content_id, &entry)?;
            (payload.content_id.clone(), 1.0, Some((*clip).into()))
        }
        SegmentBody::Effect {
            payload_id,
            effect,
            params,
        } => {
            let entry = WireVideoEffect {
                id: payload_id.clone(),
                catalog: effect.clone(),
                adjust_params: params.clone(),
                extra: payload_extra(VIDEO_EFFECT_DEFAULTS),
            };
            lists.push("video_effects", payload_id, &entry)?;
            (payload_id.clone(), 1.0, None)
        }
        SegmentBody::Filter {
            payload_id,
            filter,
            intensity,
        } => {
            let entry = WireFilter {
                id: payload_id.clone(),
                catalog: filter.clone(),
                value: *intensity,
                extra: payload_extra(FILTER_DEFAULTS),
            };
            lists.push("effects", payload_id, &entry)?;
            (payload_id.clone(), 1.0, None)
        }
        SegmentBody::Sticker {
            payload_id,
            sticker,
            clip,
        } => {
            let entry = WireSticker {
                id: payload_id.clone(),
                catalog: sticker.clone(),
                extra: payload_extra(STICKER_DEFAULTS),
            };
            lists.push("stickers", payload_id, &entry)?;
            (payload_id.clone(), 1.0, Some((*clip).into()))
        }
    };

    let mut extra_material_refs = smallvec::SmallVec::new();
    for attachment in &segment.attachments {
        attachment_to_wire(attachment, lists)?;
        extra_material_refs.push(attachment.id.clone());
    }

    let common_keyframes = segment
        .keyframes
        .iter()
        .map(|curve| WireKeyframeCurve {
            id: curve.id.clone(),
            property_type: property_type(curve.property).to_string(),
            keyframe_list: curve
                .points()
                .iter()
                .map(|point| {
                    let (curve_type, control) = easing_to_wire(point.easing);
                    WireKeyframe {
                        id: point.id.clone(),
                        time_offset: point.offset,
                        values: smallvec::smallvec![point.value],
                        curve_type,
                        control,
                        extra: point.extra.clone(),
                    }
                })
                .collect(),
            extra: curve.extra.clone(),
        })
        .collect();

    Ok(WireSegment {
        id: segment.id.clone(),
        material_id,
        target_timerange: segment.target,
        source_timerange: segment.source(),
        speed: segment.speed().unwrap_or(1.0),
        volume,
        visible: segment.visible,
        render_index: track.render_index,
        clip,
        extra_material_refs,
        common_keyframes,
        extra: segment.extra.clone(),
    })
}

fn attachment_to_wire(attachment: &Attachment, lists: &mut MaterialLists<'_>) -> Result<()> {
    let id = &attachment.id;
    let extra = |defaults| with_defaults(&attachment.extra, defaults);
    match &attachment.body {
        AttachmentBody::Speed { speed } => {
            let entry = WireSpeed {
                id: id.clone(),
                speed: *speed,
                extra: extra(SPEED_DEFAULTS),
            };
            lists.push("speeds", id, &entry)
        }
        AttachmentBody::Animation {
            slot,
            catalog,
            start,
            duration,
            extra: animation_extra,
        } => {
            let entry = WireAnimationGroup {
                id: id.clone(),
                animations: vec![WireAnimation {
                    name: catalog.name.clone(),
                    id: catalog.effect_id.clone(),
                    resource_id: catalog.resource_id.clone(),
                    slot: slot.name().to_string(),
                    start: *start,
                    duration: *duration,
                    extra: with_defaults(animation_extra, ANIMATION_DEFAULTS),
                }],
                extra: extra(ANIMATION_GROUP_DEFAULTS),
            };
            lists.push("material_animations", id, &entry)
        }
        AttachmentBody::Filter { catalog, intensity } => {
            let entry = WireFilter {
                id: id.clone(),
                catalog: catalog.clone(),
                value: *intensity,
                extra: extra(FILTER_DEFAULTS),
            };
            lists.push("effects", id, &entry)
        }
        AttachmentBody::Effect { catalog, params } => {
            let entry = WireVideoEffect {
                id: id.clone(),
                catalog: catalog.clone(),
                adjust_params: params.clone(),
                extra: extra(VIDEO_EFFECT_DEFAULTS),
            };
            lists.push("video_effects", id, &entry)
        }
        AttachmentBody::Mask { catalog, geometry } => {
            let entry = WireMask {
                id: id.clone(),
                catalog: catalog.clone(),
                config: *geometry,
                extra: extra(MASK_DEFAULTS),
            };
            lists.push("masks", id, &entry)
        }
        AttachmentBody::Transition {
            catalog,
            duration,
            overlap,
        } => {
            let entry = WireTransition {
                id: id.clone(),
                catalog: catalog.clone(),
                duration: *duration,
                is_overlap: *overlap,
                extra: extra(TRANSITION_DEFAULTS),
            };
            lists.push("transitions", id, &entry)
        }
        AttachmentBody::Fade { fade_in, fade_out } => {
            let entry = WireFade {
                id: id.clone(),
                fade_in_duration: *fade_in,
                fade_out_duration: *fade_out,
                extra: extra(FADE_DEFAULTS),
            };
            lists.push("audio_fades", id, &entry)
        }
        AttachmentBody::AudioEffect {
            category,
            catalog,
            params,
        } => {
            let entry = WireAudioEffect {
                id: id.clone(),
                catalog: catalog.clone(),
                category_id: category.name().to_string(),
                audio_adjust_params: params.clone(),
                extra: extra(AUDIO_EFFECT_DEFAULTS),
            };
            lists.push("audio_effects", id, &entry)
        }
        AttachmentBody::Background { mode, blur, color } => {
            let entry = WireBackground {
                id: id.clone(),
                kind: mode.name().to_string(),
                blur: *blur,
                color: color.clone(),
                extra: attachment.extra.clone(),
            };
            lists.push("canvases", id, &entry)
        }
        AttachmentBody::Opaque { list, value } => {
            // The entry is written under the attachment's id, which differs
            // from the one it was loaded with after a track import.
            let mut value = value.clone();
            if let Value::Object(fields) = &mut value {
                fields.insert("id".to_string(), Value::String(id.to_string()));
            }
            lists.push_value(list, id, value);
            Ok(())
        }
    }
}

fn text_to_wire(payload: &TextPayload, extra: Map<String, Value>) -> Result<WireText> {
    let content = WireTextContent {
        styles: payload
            .styles
            .iter()
            .map(|run| WireTextStyle {
                range: [run.start, run.end],
                size: run.style.size,
                bold: run.style.bold,
                italic: run.style.italic,
                underline: run.style.underline,
                fill: WireFill {
                    alpha: run.style.alpha,
                    content: WireFillContent {
                        solid: WireSolid {
                            color: run.style.color,
                        },
                    },
                },
                font: run.style.font.clone(),
            })
            .collect(),
        text: payload.text.clone(),
    };

    Ok(WireText {
        id: payload.content_id.clone(),
        content: content_string(payload.raw_content.as_ref(), &content)?,
        alignment: match payload.alignment {
            TextAlign::Left => 0,
            TextAlign::Center => 1,
            TextAlign::Right => 2,
        },
        letter_spacing: payload.letter_spacing,
        line_spacing: payload.line_spacing,
        border: payload.border.clone(),
        shadow: payload.shadow.clone(),
        background: payload.background.clone(),
        extra,
    })
}

/// The content document of a text entry. A loaded document has the model's
/// fields laid over it, so fields the model does not know are kept, and is
/// written back byte for byte when nothing changed.
fn content_string(raw: Option<&RawContent>, content: &WireTextContent) -> Result<String> {
    let failed = |e: serde_json::Error| DraftError::malformed(format!("failed to serialize text: {e}"));
    let Some(raw) = raw else {
        return serde_json::to_string(content).map_err(failed);
    };
    let mut merged = raw.value.clone();
    overlay(&mut merged, serde_json::to_value(content).map_err(failed)?);
    if merged == raw.value {
        return Ok(raw.text.clone());
    }
    serde_json::to_string(&merged).map_err(failed)
}

/// Write `fresh` over `base`: objects merge key by key, arrays element by
/// element (truncated to the new length), anything else is replaced.
fn overlay(base: &mut Value, fresh: Value) {
    match (base, fresh) {
        (Value::Object(base), Value::Object(fresh)) => {
            for (key, value) in fresh {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(fresh)) => {
            base.truncate(fresh.len());
            for (i, value) in fresh.into_iter().enumerate() {
                match base.get_mut(i) {
                    Some(slot) => overlay(slot, value),
                    None => base.push(value),
                }
            }
        }
        (base, fresh) => *base = fresh,
    }
}

// ── Reading ─────────────────────────────────────────────────────

/// Parse state.
struct Loader {
    ids: IdAllocator,
    /// Identified material entries with the list each came from. Segments
    /// take their entries out as they claim them, so an entry can belong to
    /// one segment only; whatever is left at the end is kept as residue.
    entries: HashMap<Identifier, (String, Value)>,
    residue: FileResidue,
}

fn decode<T: DeserializeOwned>(list: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| DraftError::malformed(format!("invalid entry in {list}: {e}")))
}

fn malformed_ref(segment: &Identifier, what: &str, id: &Identifier) -> DraftError {
    DraftError::malformed(format!(
        "segment {segment} references {what} {id}, which is missing or already claimed"
    ))
}

impl Loader {
    fn new(ids: IdAllocator) -> Self {
        Self {
            ids,
            entries: HashMap::new(),
            residue: FileResidue::default(),
        }
    }

    /// Record an identifier defined by the file.
    fn define(&mut self, id: &Identifier) -> Result<()> {
        if self.ids.reserve(id) {
            Ok(())
        } else {
            Err(DraftError::malformed(format!("duplicate identifier {id}")))
        }
    }

    fn load(mut self, wire: WireDraft) -> Result<DraftDocument> {
        self.define(&wire.id)?;

        let mut materials = wire.materials;
        let mut registry = MaterialRegistry::new();
        for (position, item) in self.list_items(&mut materials, "videos")? {
            let video: WireVideo = decode("videos", item)?;
            let kind = match video.kind.as_str() {
                "video" => MediaKind::Video,
                "photo" => MediaKind::Photo,
                other => {
                    return Err(DraftError::malformed(format!(
                        "material {} has unknown type {other}",
                        video.id
                    )))
                }
            };
            self.define(&video.id)?;
            self.residue.order.insert(video.id.clone(), position);
            registry.insert(Material {
                id: video.id,
                kind,
                path: PathBuf::from(video.path),
                name: video.material_name,
                duration: (kind == MediaKind::Video).then_some(video.duration),
                width: video.width,
                height: video.height,
                provenance: Provenance::Imported,
                extra: video.extra,
            })?;
        }
        for (position, item) in self.list_items(&mut materials, "audios")? {
            let audio: WireAudio = decode("audios", item)?;
            self.define(&audio.id)?;
            self.residue.order.insert(audio.id.clone(), position);
            registry.insert(Material {
                id: audio.id,
                kind: MediaKind::Audio,
                path: PathBuf::from(audio.path),
                name: audio.name,
                duration: Some(audio.duration),
                width: 0,
                height: 0,
                provenance: Provenance::Imported,
                extra: strip_defaults(audio.extra, AUDIO_DEFAULTS),
            })?;
        }
        let names: Vec<String> = materials.keys().cloned().collect();
        for list in names {
            for (position, item) in self.list_items(&mut materials, &list)? {
                self.index_entry(&list, position, item)?;
            }
        }

        let mut tracks = Vec::with_capacity(wire.tracks.len());
        for wire_track in wire.tracks {
            tracks.push(self.track(wire_track, &registry)?);
        }

        let unclaimed: Vec<(Identifier, (String, Value))> = self.entries.drain().collect();
        for (id, (list, value)) in unclaimed {
            let position = self.residue.order.get(&id).copied().unwrap_or(usize::MAX);
            self.residue.orphans.push(Orphan {
                list,
                position,
                value,
            });
        }
        self.residue
            .orphans
            .sort_by(|a, b| (&a.list, a.position).cmp(&(&b.list, b.position)));
        if !self.residue.orphans.is_empty() {
            debug!(
                count = self.residue.orphans.len(),
                "kept material entries no segment references"
            );
        }
        self.residue.canvas = strip_defaults(wire.canvas_config.extra, CANVAS_DEFAULTS);

        let doc = DraftDocument {
            id: wire.id,
            name: wire.name,
            width: wire.canvas_config.width,
            height: wire.canvas_config.height,
            fps: FrameRate::from_fps_f64(wire.fps),
            version: wire.version,
            editor_version: wire.new_version,
            tracks,
            materials: registry,
            metadata: wire.extra,
            residue: self.residue,
            ids: self.ids,
        };
        doc.validate().map_err(|e| match e {
            DraftError::MalformedDocument(_) => e,
            other => DraftError::malformed(other.to_string()),
        })?;
        Ok(doc)
    }

    /// Take the entries of one material list, remembering the list name.
    /// Known lists must be arrays; unknown ones that are not are kept whole.
    fn list_items(
        &mut self,
        materials: &mut Map<String, Value>,
        list: &str,
    ) -> Result<Vec<(usize, Value)>> {
        let Some(value) = materials.remove(list) else {
            return Ok(Vec::new());
        };
        self.residue.lists.push(list.to_string());
        match value {
            Value::Array(items) => Ok(items.into_iter().enumerate().collect()),
            _ if MATERIAL_LISTS.contains(&list) => Err(DraftError::malformed(format!(
                "material list {list} is not an array"
            ))),
            other => {
                self.residue.raw_lists.insert(list.to_string(), other);
                Ok(Vec::new())
            }
        }
    }

    fn index_entry(&mut self, list: &str, position: usize, item: Value) -> Result<()> {
        let id = item.get("id").and_then(Value::as_str).map(Identifier::from);
        let Some(id) = id else {
            self.residue.orphans.push(Orphan {
                list: list.to_string(),
                position,
                value: item,
            });
            return Ok(());
        };
        self.define(&id)?;
        self.residue.order.insert(id.clone(), position);
        self.entries.insert(id, (list.to_string(), item));
        Ok(())
    }

    /// Take the entry a segment owns as its payload. It must come from `list`.
    fn take_payload(&mut self, segment: &Identifier, list: &str, id: &Identifier) -> Result<Value> {
        if !self.entries.get(id).is_some_and(|(found, _)| found == list) {
            return Err(malformed_ref(segment, list, id));
        }
        self.entries
            .remove(id)
            .map(|(_, value)| value)
            .ok_or_else(|| malformed_ref(segment, list, id))
    }

    fn track(&mut self, wire: WireTrack, materials: &MaterialRegistry) -> Result<Track> {
        self.define(&wire.id)?;
        let kind = TrackKind::from_name(&wire.kind).ok_or_else(|| {
            DraftError::malformed(format!("track {} has unsupported type {}", wire.id, wire.kind))
        })?;

        let mut track = Track::new(wire.id, kind, wire.name, wire.render_index);
        track.muted = wire.attribute & 1 == 1;
        track.provenance = Provenance::Imported;
        track.extra = strip_defaults(wire.extra, TRACK_DEFAULTS);
        for segment in wire.segments {
            track.segments.push(self.segment(kind, segment, materials)?);
        }
        track.segments.sort_by_key(|s| s.target.start);
        Ok(track)
    }

    fn segment(
        &mut self,
        kind: TrackKind,
        wire: WireSegment,
        materials: &MaterialRegistry,
    ) -> Result<Segment> {
        self.define(&wire.id)?;
        if !wire.target_timerange.is_valid() {
            return Err(DraftError::malformed(format!(
                "segment {} has a negative target range",
                wire.id
            )));
        }

        let clip = wire.clip.map(ClipSettings::from).unwrap_or_default();
        let mut payload_extra = Map::new();
        let body = match kind {
            TrackKind::Video | TrackKind::Audio => {
                let material = materials
                    .get(&wire.material_id)
                    .map_err(|_| malformed_ref(&wire.id, "material", &wire.material_id))?;
                let body = if kind == TrackKind::Video {
                    SegmentBody::Video {
                        material_id: wire.material_id.clone(),
                        source: wire.source_timerange,
                        volume: wire.volume,
                        clip,
                    }
                } else {
                    SegmentBody::Audio {
                        material_id: wire.material_id.clone(),
                        source: wire.source_timerange,
                        volume: wire.volume,
                    }
                };
                let placed = Segment::new(wire.id.clone(), wire.target_timerange, body);
                check_media_class(&placed, material.id.as_str(), material.kind)
                    .map_err(|e| DraftError::malformed(e.to_string()))?;
                placed.body
            }
            TrackKind::Text => {
                let entry = self.take_payload(&wire.id, "texts", &wire.material_id)?;
                let (payload, extra) = text_from_wire(decode("texts", entry)?)?;
                payload_extra = strip_defaults(extra, TEXT_DEFAULTS);
                SegmentBody::Text { payload, clip }
            }
            TrackKind::Effect => {
                let entry = self.take_payload(&wire.id, "video_effects", &wire.material_id)?;
                let effect: WireVideoEffect = decode("video_effects", entry)?;
                payload_extra = strip_defaults(effect.extra, VIDEO_EFFECT_DEFAULTS);
                SegmentBody::Effect {
                    payload_id: effect.id,
                    effect: effect.catalog,
                    params: effect.adjust_params,
                }
            }
            TrackKind::Filter => {
                let entry = self.take_payload(&wire.id, "effects", &wire.material_id)?;
                let filter: WireFilter = decode("effects", entry)?;
                payload_extra = strip_defaults(filter.extra, FILTER_DEFAULTS);
                SegmentBody::Filter {
                    payload_id: filter.id,
                    filter: filter.catalog,
                    intensity: filter.value,
                }
            }
            TrackKind::Sticker => {
                let entry = self.take_payload(&wire.id, "stickers", &wire.material_id)?;
                let sticker: WireSticker = decode("stickers", entry)?;
                payload_extra = strip_defaults(sticker.extra, STICKER_DEFAULTS);
                SegmentBody::Sticker {
                    payload_id: sticker.id,
                    sticker: sticker.catalog,
                    clip,
                }
            }
        };

        let mut segment = Segment::new(wire.id, wire.target_timerange, body);
        segment.visible = wire.visible;
        segment.extra = wire.extra;
        segment.payload_extra = payload_extra;
        for reference in &wire.extra_material_refs {
            let attachment = self.claim(&segment.id, reference)?;
            segment.attachments.push(attachment);
        }
        for curve in wire.common_keyframes {
            let curve = self.curve(&segment.id, curve)?;
            segment.keyframes.push(curve);
        }
        Ok(segment)
    }

    /// Resolve an extra material reference into the attachment it describes.
    fn claim(&mut self, segment: &Identifier, id: &Identifier) -> Result<Attachment> {
        let (list, value) = self
            .entries
            .remove(id)
            .ok_or_else(|| malformed_ref(segment, "material", id))?;
        let (body, extra) = attachment_from_wire(list, value)?;
        Ok(Attachment {
            id: id.clone(),
            body,
            extra,
        })
    }

    fn curve(&mut self, segment: &Identifier, wire: WireKeyframeCurve) -> Result<KeyframeCurve> {
        self.define(&wire.id)?;
        let property = property_from_type(&wire.property_type).ok_or_else(|| {
            DraftError::malformed(format!(
                "segment {segment} has keyframes for unknown property {}",
                wire.property_type
            ))
        })?;

        let mut points = Vec::with_capacity(wire.keyframe_list.len());
        for keyframe in wire.keyframe_list {
            self.define(&keyframe.id)?;
            let easing = easing_from_wire(&keyframe.curve_type, keyframe.control).ok_or_else(|| {
                DraftError::malformed(format!(
                    "keyframe {} has unknown curve type {}",
                    keyframe.id, keyframe.curve_type
                ))
            })?;
            let value = keyframe.values.first().copied().ok_or_else(|| {
                DraftError::malformed(format!("keyframe {} has no value", keyframe.id))
            })?;
            if keyframe.time_offset.is_negative() {
                return Err(DraftError::malformed(format!(
                    "keyframe {} has a negative offset",
                    keyframe.id
                )));
            }
            points.push(KeyframePoint {
                id: keyframe.id,
                offset: keyframe.time_offset,
                value,
                easing,
                extra: keyframe.extra,
            });
        }
        let mut curve = KeyframeCurve::from_points(wire.id, property, points);
        curve.extra = wire.extra;
        Ok(curve)
    }
}

/// Decode a claimed entry by the list it came from. Entries of lists the
/// model does not know, and entries it cannot represent, stay opaque.
fn attachment_from_wire(list: String, value: Value) -> Result<(AttachmentBody, Map<String, Value>)> {
    let decoded = match list.as_str() {
        "speeds" => {
            let speed: WireSpeed = decode(&list, value)?;
            let extra = strip_defaults(speed.extra, SPEED_DEFAULTS);
            (AttachmentBody::Speed { speed: speed.speed }, extra)
        }
        "material_animations" => return Ok(animation_from_wire(value)),
        "effects" => {
            let filter: WireFilter = decode(&list, value)?;
            let body = AttachmentBody::Filter {
                catalog: filter.catalog,
                intensity: filter.value,
            };
            (body, strip_defaults(filter.extra, FILTER_DEFAULTS))
        }
        "video_effects" => {
            let effect: WireVideoEffect = decode(&list, value)?;
            let body = AttachmentBody::Effect {
                catalog: effect.catalog,
                params: effect.adjust_params,
            };
            (body, strip_defaults(effect.extra, VIDEO_EFFECT_DEFAULTS))
        }
        "masks" => {
            let mask: WireMask = decode(&list, value)?;
            let body = AttachmentBody::Mask {
                catalog: mask.catalog,
                geometry: mask.config,
            };
            (body, strip_defaults(mask.extra, MASK_DEFAULTS))
        }
        "transitions" => {
            let transition: WireTransition = decode(&list, value)?;
            let body = AttachmentBody::Transition {
                catalog: transition.catalog,
                duration: transition.duration,
                overlap: transition.is_overlap,
            };
            (body, strip_defaults(transition.extra, TRANSITION_DEFAULTS))
        }
        "audio_fades" => {
            let fade: WireFade = decode(&list, value)?;
            let body = AttachmentBody::Fade {
                fade_in: fade.fade_in_duration,
                fade_out: fade.fade_out_duration,
            };
            (body, strip_defaults(fade.extra, FADE_DEFAULTS))
        }
        "audio_effects" => {
            let known = serde_json::from_value::<WireAudioEffect>(value.clone())
                .ok()
                .and_then(|e| AudioEffectCategory::from_name(&e.category_id).map(|c| (c, e)));
            match known {
                Some((category, effect)) => {
                    let body = AttachmentBody::AudioEffect {
                        category,
                        catalog: effect.catalog,
                        params: effect.audio_adjust_params,
                    };
                    (body, strip_defaults(effect.extra, AUDIO_EFFECT_DEFAULTS))
                }
                None => (AttachmentBody::Opaque { list, value }, Map::new()),
            }
        }
        "canvases" => {
            let known = serde_json::from_value::<WireBackground>(value.clone())
                .ok()
                .and_then(|b| FillMode::from_name(&b.kind).map(|m| (m, b)));
            match known {
                Some((mode, background)) => {
                    let body = AttachmentBody::Background {
                        mode,
                        blur: background.blur,
                        color: background.color,
                    };
                    (body, background.extra)
                }
                None => (AttachmentBody::Opaque { list, value }, Map::new()),
            }
        }
        _ => (AttachmentBody::Opaque { list, value }, Map::new()),
    };
    Ok(decoded)
}

/// A group holding exactly one animation of a known slot becomes an
/// animation attachment; anything else is carried verbatim.
fn animation_from_wire(value: Value) -> (AttachmentBody, Map<String, Value>) {
    let single = serde_json::from_value::<WireAnimationGroup>(value.clone())
        .ok()
        .filter(|group| group.animations.len() == 1)
        .and_then(|mut group| {
            let anim = group.animations.pop()?;
            let slot = AnimationSlot::from_name(&anim.slot)?;
            Some((slot, anim, group.extra))
        });

    match single {
        Some((slot, anim, extra)) => {
            let body = AttachmentBody::Animation {
                slot,
                catalog: CatalogRef {
                    name: anim.name,
                    effect_id: anim.id,
                    resource_id: anim.resource_id,
                },
                start: anim.start,
                duration: anim.duration,
                extra: strip_defaults(anim.extra, ANIMATION_DEFAULTS),
            };
            (body, strip_defaults(extra, ANIMATION_GROUP_DEFAULTS))
        }
        None => (
            AttachmentBody::Opaque {
                list: "material_animations".to_string(),
                value,
            },
            Map::new(),
        ),
    }
}

fn text_from_wire(text: WireText) -> Result<(TextPayload, Map<String, Value>)> {
    let value: Value = serde_json::from_str(&text.content).map_err(|e| {
        DraftError::malformed(format!("text {} has invalid content: {e}", text.id))
    })?;
    let content: WireTextContent = serde_json::from_value(value.clone()).map_err(|e| {
        DraftError::malformed(format!("text {} has invalid content: {e}", text.id))
    })?;

    let styles = content
        .styles
        .into_iter()
        .map(|style| StyleRun {
            start: style.range[0],
            end: style.range[1],
            style: TextStyle {
                size: style.size,
                color: style.fill.content.solid.color,
                alpha: style.fill.alpha,
                bold: style.bold,
                italic: style.italic,
                underline: style.underline,
                font: style.font,
            },
        })
        .collect();

    let payload = TextPayload {
        content_id: text.id,
        text: content.text,
        styles,
        alignment: match text.alignment {
            0 => TextAlign::Left,
            2 => TextAlign::Right,
            _ => TextAlign::Center,
        },
        letter_spacing: text.letter_spacing,
        line_spacing: text.line_spacing,
        border: text.border,
        shadow: text.shadow,
        background: text.background,
        raw_content: Some(RawContent {
            text: text.content,
            value,
        }),
    };
    Ok((payload, text.extra))
}
