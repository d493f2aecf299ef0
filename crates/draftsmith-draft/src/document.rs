//! The draft document aggregate.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use draftsmith_core::{
    DraftError, EasingCurve, FrameRate, IdAllocator, Identifier, KeyframeCurve, KeyframeProperty,
    Micros, Result,
};
use draftsmith_media::{MediaInspector, MediaKind};
use serde_json::{Map, Value};
use tracing::debug;

use crate::material::{Material, MaterialDescriptor, MaterialRegistry, Provenance};
use crate::segment::{Attachment, AttachmentBody, Segment, SegmentBody};
use crate::serialization::FileResidue;
use crate::track::{Track, TrackKind};
use crate::wire::{EDITOR_VERSION, SUPPORTED_VERSION};

/// A video-editing project: tracks, materials and canvas metadata.
///
/// All entities share one identifier space, owned by the document's
/// allocator. Callers must not mutate one document from several threads at
/// once.
#[derive(Debug, Clone)]
pub struct DraftDocument {
    pub id: Identifier,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub fps: FrameRate,
    /// Format version of the file. New drafts get the supported version;
    /// loaded drafts keep theirs.
    pub version: u32,
    /// Editor release that wrote the file.
    pub editor_version: String,
    /// In stored order, which is creation order rather than layering.
    pub tracks: Vec<Track>,
    pub materials: MaterialRegistry,
    /// Top-level keys of a loaded file that the model does not interpret.
    pub metadata: Map<String, Value>,
    pub(crate) residue: FileResidue,
    pub(crate) ids: IdAllocator,
}

impl DraftDocument {
    /// Create an empty draft with random identifiers.
    pub fn new(name: impl Into<String>, width: u32, height: u32, fps: FrameRate) -> Self {
        Self::with_allocator(name, width, height, fps, IdAllocator::random())
    }

    /// Create an empty draft drawing identifiers from `ids`.
    pub fn with_allocator(
        name: impl Into<String>,
        width: u32,
        height: u32,
        fps: FrameRate,
        mut ids: IdAllocator,
    ) -> Self {
        Self {
            id: ids.new_id(),
            name: name.into(),
            width,
            height,
            fps,
            version: SUPPORTED_VERSION,
            editor_version: EDITOR_VERSION.to_string(),
            tracks: Vec::new(),
            materials: MaterialRegistry::new(),
            metadata: Map::new(),
            residue: FileResidue::default(),
            ids,
        }
    }

    /// The document's identifier allocator, for building segments.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    // ── Materials ───────────────────────────────────────────────

    /// Register the asset at `path`, inspecting it if it is new.
    pub fn add_material<I: MediaInspector + ?Sized>(
        &mut self,
        path: impl AsRef<Path>,
        inspector: &I,
    ) -> Result<Identifier> {
        self.materials
            .intern(path.as_ref(), inspector, &mut self.ids)
    }

    pub fn add_material_described(&mut self, descriptor: MaterialDescriptor) -> Identifier {
        self.materials.insert_described(descriptor, &mut self.ids)
    }

    /// Number of segments referencing each material.
    pub fn material_reference_counts(&self) -> HashMap<Identifier, usize> {
        self.materials.reference_counts(&self.tracks)
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// Append a new empty track. Names are unique within a document.
    pub fn add_track(&mut self, kind: TrackKind, name: impl Into<String>) -> Result<Identifier> {
        let name = name.into();
        if self.track_by_name(&name).is_some() {
            return Err(DraftError::DuplicateTrackName(name));
        }
        let track = Track::new(self.ids.new_id(), kind, name, self.next_render_index(kind));
        let id = track.id.clone();
        debug!(track = %id, kind = %kind, name = %track.name, "added track");
        self.tracks.push(track);
        Ok(id)
    }

    pub(crate) fn next_render_index(&self, kind: TrackKind) -> i32 {
        self.tracks
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.render_index + 1)
            .max()
            .unwrap_or_else(|| kind.base_render_index())
    }

    pub fn track(&self, id: &Identifier) -> Result<&Track> {
        self.tracks
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| DraftError::TrackNotFound(id.to_string()))
    }

    pub fn track_mut(&mut self, id: &Identifier) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| DraftError::TrackNotFound(id.to_string()))
    }

    pub fn track_by_name(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    // ── Segments ────────────────────────────────────────────────

    /// Place `segment` on an authored track.
    ///
    /// The segment must match the track kind, must not overlap the track's
    /// other segments and must reference a registered material of the right
    /// media class. Without a speed attachment its source range has to fit in
    /// the material's duration.
    pub fn add_segment(&mut self, track_id: &Identifier, segment: Segment) -> Result<Identifier> {
        let track = self.track(track_id)?;
        if track.is_imported() {
            return Err(DraftError::UnsupportedOnImportedTrack {
                track: track_id.to_string(),
                operation: "add segment",
            });
        }
        if !segment.target.is_valid() {
            return Err(DraftError::InvalidTimeRange(format!(
                "segment {} target {:?}",
                segment.id, segment.target
            )));
        }
        let pos = track.check_insert(&segment)?;

        if let Some(material_id) = segment.material_id() {
            let material = self
                .materials
                .get(material_id)
                .map_err(|_| DraftError::MaterialNotFound(material_id.to_string()))?;
            check_media_class(&segment, material.id.as_str(), material.kind)?;
            check_source_fits(&segment, material)?;
        }

        let clash = {
            let existing: HashSet<&Identifier> = self.identifiers().into_iter().collect();
            segment
                .owned_ids()
                .into_iter()
                .find(|id| existing.contains(id))
                .cloned()
        };
        if let Some(clash) = clash {
            return Err(DraftError::malformed(format!(
                "identifier {clash} is already used in the draft"
            )));
        }

        for id in segment.owned_ids() {
            self.ids.reserve(id);
        }
        let id = segment.id.clone();
        debug!(track = %track_id, segment = %id, target = ?segment.target, "added segment");
        self.track_mut(track_id)?.segments.insert(pos, segment);
        Ok(id)
    }

    /// Remove a segment from an authored track. Its material stays registered.
    pub fn remove_segment(&mut self, segment_id: &Identifier) -> Result<Segment> {
        let (t, _) = self
            .locate_segment(segment_id)
            .ok_or_else(|| DraftError::SegmentNotFound(segment_id.to_string()))?;
        let track = &mut self.tracks[t];
        if track.is_imported() {
            return Err(DraftError::UnsupportedOnImportedTrack {
                track: track.id.to_string(),
                operation: "remove segment",
            });
        }
        track
            .take_segment(segment_id)
            .ok_or_else(|| DraftError::SegmentNotFound(segment_id.to_string()))
    }

    /// Attach a modifier to a segment.
    ///
    /// A second speed or background attachment updates the existing one
    /// instead of adding another. Fades and audio effects need a segment with
    /// sound, backgrounds a video segment, and a segment takes one audio
    /// effect per category.
    pub fn attach(&mut self, segment_id: &Identifier, body: AttachmentBody) -> Result<Identifier> {
        let (t, s) = self
            .locate_segment(segment_id)
            .ok_or_else(|| DraftError::SegmentNotFound(segment_id.to_string()))?;
        let segment = &mut self.tracks[t].segments[s];
        check_attachment(segment, &body)?;

        let singleton = |a: &&mut Attachment| match (&a.body, &body) {
            (AttachmentBody::Speed { .. }, AttachmentBody::Speed { .. }) => true,
            (AttachmentBody::Background { .. }, AttachmentBody::Background { .. }) => true,
            _ => false,
        };
        if let Some(existing) = segment.attachments.iter_mut().find(singleton) {
            debug!(segment = %segment_id, attachment = %existing.id, kind = body.name(), "updated modifier");
            existing.body = body;
            return Ok(existing.id.clone());
        }

        let id = self.ids.new_id();
        debug!(segment = %segment_id, attachment = %id, kind = body.name(), "attached modifier");
        segment.attachments.push(Attachment::new(id.clone(), body));
        Ok(id)
    }

    /// Set a keyframe at `offset` from the segment start. Returns the id of the
    /// property's curve, created on first use.
    pub fn add_keyframe(
        &mut self,
        segment_id: &Identifier,
        property: KeyframeProperty,
        offset: Micros,
        value: f64,
    ) -> Result<Identifier> {
        let (t, s) = self
            .locate_segment(segment_id)
            .ok_or_else(|| DraftError::SegmentNotFound(segment_id.to_string()))?;
        let segment = &mut self.tracks[t].segments[s];
        if offset.is_negative() || offset > segment.target.duration {
            return Err(DraftError::InvalidTimeRange(format!(
                "keyframe offset {offset} outside segment {segment_id}"
            )));
        }

        let ids = &mut self.ids;
        let pos = match segment.keyframes.iter().position(|c| c.property == property) {
            Some(pos) => pos,
            None => {
                segment
                    .keyframes
                    .push(KeyframeCurve::new(ids.new_id(), property));
                segment.keyframes.len() - 1
            }
        };
        let curve = &mut segment.keyframes[pos];
        curve.set(ids, offset, value, EasingCurve::Linear);
        Ok(curve.id.clone())
    }

    /// Track and segment holding `segment_id`.
    pub fn find_segment(&self, segment_id: &Identifier) -> Option<(&Track, &Segment)> {
        self.tracks
            .iter()
            .find_map(|t| t.find_segment(segment_id).map(|s| (t, s)))
    }

    pub fn segment_mut(&mut self, segment_id: &Identifier) -> Option<&mut Segment> {
        self.tracks
            .iter_mut()
            .find_map(|t| t.find_segment_mut(segment_id))
    }

    /// Indices (track, segment) of a segment.
    pub(crate) fn locate_segment(&self, segment_id: &Identifier) -> Option<(usize, usize)> {
        self.tracks.iter().enumerate().find_map(|(t, track)| {
            track
                .segments
                .iter()
                .position(|s| &s.id == segment_id)
                .map(|s| (t, s))
        })
    }

    // ── Queries ─────────────────────────────────────────────────

    /// End of the latest segment on any track.
    pub fn duration(&self) -> Micros {
        self.tracks
            .iter()
            .map(Track::end)
            .max()
            .unwrap_or(Micros::ZERO)
    }

    /// Every identifier defined in the document, duplicates included.
    pub fn identifiers(&self) -> Vec<&Identifier> {
        let mut ids = vec![&self.id];
        ids.extend(self.materials.iter().map(|m| &m.id));
        for track in &self.tracks {
            ids.push(&track.id);
            for segment in &track.segments {
                ids.extend(segment.owned_ids());
            }
        }
        ids
    }

    pub fn info(&self) -> DraftInfo {
        DraftInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            fps: self.fps,
            duration: self.duration(),
            material_count: self.materials.len(),
            tracks: self
                .tracks
                .iter()
                .map(|t| TrackInfo {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    kind: t.kind,
                    render_index: t.render_index,
                    provenance: t.provenance,
                    segment_count: t.segments.len(),
                    end: t.end(),
                })
                .collect(),
        }
    }

    /// Check every structural invariant.
    ///
    /// Operations on the document keep these on their own; this is for
    /// callers that edit the public fields directly and for the writer.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for id in self.identifiers() {
            if !seen.insert(id) {
                return Err(DraftError::malformed(format!("duplicate identifier {id}")));
            }
        }

        for track in &self.tracks {
            for segment in &track.segments {
                if segment.kind() != track.kind {
                    return Err(DraftError::TrackKindMismatch {
                        track: track.id.to_string(),
                        expected: track.kind.name(),
                        actual: segment.kind().name(),
                    });
                }
                let source_ok = segment.source().map_or(true, |r| r.is_valid());
                if !segment.target.is_valid() || !source_ok {
                    return Err(DraftError::InvalidTimeRange(format!(
                        "segment {} has a negative range",
                        segment.id
                    )));
                }
                if let Some(material_id) = segment.material_id() {
                    let material = self
                        .materials
                        .get(material_id)
                        .map_err(|_| DraftError::MaterialNotFound(material_id.to_string()))?;
                    check_media_class(segment, material.id.as_str(), material.kind)?;
                }
                if let SegmentBody::Text { payload, .. } = &segment.body {
                    if !payload.styles_in_bounds() {
                        return Err(DraftError::malformed(format!(
                            "text segment {} has style runs outside its text",
                            segment.id
                        )));
                    }
                }
            }
            if let Some(pair) = track
                .segments
                .windows(2)
                .find(|w| w[0].target.end() > w[1].target.start)
            {
                return Err(DraftError::SegmentOverlap {
                    track: track.id.to_string(),
                    segment: pair[1].id.to_string(),
                    existing: pair[0].id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Media class a segment needs from its material: "visual" or "audio".
pub(crate) fn segment_media_class(segment: &Segment) -> Option<&'static str> {
    match segment.body {
        SegmentBody::Video { .. } => Some("visual"),
        SegmentBody::Audio { .. } => Some("audio"),
        _ => None,
    }
}

pub(crate) fn media_class(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "audio",
        MediaKind::Video | MediaKind::Photo => "visual",
    }
}

pub(crate) fn check_media_class(segment: &Segment, material: &str, kind: MediaKind) -> Result<()> {
    match segment_media_class(segment) {
        Some(expected) if expected != media_class(kind) => Err(DraftError::MaterialKindMismatch {
            material: material.to_string(),
            expected,
            actual: media_class(kind),
        }),
        _ => Ok(()),
    }
}

fn check_attachment(segment: &Segment, body: &AttachmentBody) -> Result<()> {
    let kind = segment.kind();
    let allowed = match body {
        AttachmentBody::Fade { .. } | AttachmentBody::AudioEffect { .. } => {
            matches!(kind, TrackKind::Audio | TrackKind::Video)
        }
        AttachmentBody::Background { .. } => kind == TrackKind::Video,
        _ => true,
    };
    if !allowed {
        return Err(DraftError::UnsupportedAttachment {
            segment: segment.id.to_string(),
            kind: kind.name(),
            attachment: body.name(),
        });
    }
    if let AttachmentBody::AudioEffect { category, .. } = body {
        if segment.audio_effect(*category).is_some() {
            return Err(DraftError::DuplicateAudioEffect {
                segment: segment.id.to_string(),
                category: category.name(),
            });
        }
    }
    Ok(())
}

fn check_source_fits(segment: &Segment, material: &Material) -> Result<()> {
    let (Some(source), Some(duration)) = (segment.source(), material.duration) else {
        return Ok(());
    };
    if !source.is_valid() {
        return Err(DraftError::InvalidTimeRange(format!(
            "segment {} source {:?}",
            segment.id, source
        )));
    }
    if segment.speed().is_none() && source.end() > duration {
        return Err(DraftError::InvalidTimeRange(format!(
            "segment {} reads to {} but material {} lasts {}",
            segment.id,
            source.end(),
            material.id,
            duration
        )));
    }
    Ok(())
}

/// Summary of a draft, as reported to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftInfo {
    pub id: Identifier,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub fps: FrameRate,
    pub duration: Micros,
    pub material_count: usize,
    pub tracks: Vec<TrackInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub id: Identifier,
    pub name: String,
    pub kind: TrackKind,
    pub render_index: i32,
    pub provenance: Provenance,
    pub segment_count: usize,
    pub end: Micros,
}

impl fmt::Display for DraftInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}x{} @ {}, {}, {} materials)",
            self.name, self.width, self.height, self.fps, self.duration, self.material_count
        )?;
        for track in &self.tracks {
            writeln!(
                f,
                "  [{}] {} {:?}: {} segments, ends {}",
                track.kind, track.name, track.provenance, track.segment_count, track.end
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{AnimationSlot, AudioEffectCategory, CatalogRef, FillMode, TextStyle};
    use draftsmith_core::TimeRange;
    use draftsmith_media::{MediaInfo, StaticInspector};

    fn secs(start: i64, duration: i64) -> TimeRange {
        TimeRange::new(Micros::from_secs(start), Micros::from_secs(duration))
    }

    fn draft() -> (DraftDocument, Identifier, Identifier) {
        let inspector = StaticInspector::new()
            .with("/media/a.mp4", MediaInfo::video(Micros::from_secs(5), 1920, 1080))
            .with("/media/music.mp3", MediaInfo::audio(Micros::from_secs(60)));
        let mut doc =
            DraftDocument::with_allocator("demo", 1920, 1080, FrameRate::FPS_30, IdAllocator::seeded(11));
        let video = doc.add_material("/media/a.mp4", &inspector).unwrap();
        let music = doc.add_material("/media/music.mp3", &inspector).unwrap();
        (doc, video, music)
    }

    #[test]
    fn test_add_track_assigns_layers() {
        let (mut doc, _, _) = draft();
        let v1 = doc.add_track(TrackKind::Video, "v1").unwrap();
        let v2 = doc.add_track(TrackKind::Video, "v2").unwrap();
        let a1 = doc.add_track(TrackKind::Audio, "a1").unwrap();
        let t1 = doc.add_track(TrackKind::Text, "t1").unwrap();

        assert_eq!(doc.track(&v1).unwrap().render_index, 1);
        assert_eq!(doc.track(&v2).unwrap().render_index, 2);
        assert_eq!(doc.track(&a1).unwrap().render_index, 0);
        assert_eq!(doc.track(&t1).unwrap().render_index, 15_000);
        assert!(matches!(
            doc.add_track(TrackKind::Audio, "v1"),
            Err(DraftError::DuplicateTrackName(_))
        ));
    }

    #[test]
    fn test_add_segment_checks() {
        let (mut doc, video, music) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();

        let seg = Segment::video(doc.ids_mut(), video.clone(), secs(0, 5));
        doc.add_segment(&track, seg).unwrap();

        let overlap = Segment::video(doc.ids_mut(), video.clone(), secs(4, 1));
        assert!(matches!(
            doc.add_segment(&track, overlap),
            Err(DraftError::SegmentOverlap { .. })
        ));

        let too_long = Segment::video(doc.ids_mut(), video.clone(), secs(5, 6));
        assert!(matches!(
            doc.add_segment(&track, too_long),
            Err(DraftError::InvalidTimeRange(_))
        ));

        let audio_material = Segment::video(doc.ids_mut(), music, secs(10, 1));
        assert!(matches!(
            doc.add_segment(&track, audio_material),
            Err(DraftError::MaterialKindMismatch { .. })
        ));

        let missing = Segment::video(doc.ids_mut(), Identifier::from("ghost"), secs(10, 1));
        assert!(matches!(
            doc.add_segment(&track, missing),
            Err(DraftError::MaterialNotFound(_))
        ));

        assert_eq!(doc.track(&track).unwrap().segment_count(), 1);
        doc.validate().unwrap();
    }

    #[test]
    fn test_speed_allows_reading_past_material() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        let mut seg = Segment::video(doc.ids_mut(), video, secs(0, 8));
        let speed = doc.ids_mut().new_id();
        seg.attachments
            .push(Attachment::new(speed, AttachmentBody::Speed { speed: 0.5 }));
        assert!(doc.add_segment(&track, seg).is_ok());
    }

    #[test]
    fn test_segments_stay_sorted() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        for start in [10, 0, 5] {
            let seg = Segment::video(doc.ids_mut(), video.clone(), secs(start, 2));
            doc.add_segment(&track, seg).unwrap();
        }
        let starts: Vec<i64> = doc
            .track(&track)
            .unwrap()
            .segments
            .iter()
            .map(|s| s.target.start.0)
            .collect();
        assert_eq!(starts, vec![0, 5_000_000, 10_000_000]);
        assert_eq!(doc.duration(), Micros::from_secs(12));
    }

    #[test]
    fn test_imported_track_rejects_insert_and_remove() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        let seg = Segment::video(doc.ids_mut(), video.clone(), secs(0, 2));
        let seg_id = doc.add_segment(&track, seg).unwrap();
        doc.track_mut(&track).unwrap().provenance = Provenance::Imported;

        let another = Segment::video(doc.ids_mut(), video, secs(3, 1));
        assert!(matches!(
            doc.add_segment(&track, another),
            Err(DraftError::UnsupportedOnImportedTrack { .. })
        ));
        assert!(matches!(
            doc.remove_segment(&seg_id),
            Err(DraftError::UnsupportedOnImportedTrack { .. })
        ));
        assert!(doc
            .attach(&seg_id, AttachmentBody::Fade { fade_in: Micros::SEC, fade_out: Micros::ZERO })
            .is_ok());
    }

    #[test]
    fn test_remove_segment_keeps_material() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        let seg = Segment::video(doc.ids_mut(), video.clone(), secs(0, 2));
        let seg_id = doc.add_segment(&track, seg).unwrap();

        doc.remove_segment(&seg_id).unwrap();
        assert!(doc.materials.contains(&video));
        assert_eq!(doc.material_reference_counts()[&video], 0);
        assert!(matches!(
            doc.remove_segment(&seg_id),
            Err(DraftError::SegmentNotFound(_))
        ));
    }

    #[test]
    fn test_attach_and_keyframes() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        let seg = Segment::video(doc.ids_mut(), video, secs(0, 4));
        let seg_id = doc.add_segment(&track, seg).unwrap();

        let speed = doc.attach(&seg_id, AttachmentBody::Speed { speed: 2.0 }).unwrap();
        let again = doc.attach(&seg_id, AttachmentBody::Speed { speed: 1.5 }).unwrap();
        assert_eq!(speed, again);
        doc.attach(
            &seg_id,
            AttachmentBody::Filter {
                catalog: CatalogRef::new("Warm", "7001", "7001"),
                intensity: 0.8,
            },
        )
        .unwrap();

        let curve = doc
            .add_keyframe(&seg_id, KeyframeProperty::Alpha, Micros::ZERO, 0.0)
            .unwrap();
        let same = doc
            .add_keyframe(&seg_id, KeyframeProperty::Alpha, Micros::from_secs(2), 1.0)
            .unwrap();
        assert_eq!(curve, same);
        assert!(matches!(
            doc.add_keyframe(&seg_id, KeyframeProperty::Alpha, Micros::from_secs(5), 1.0),
            Err(DraftError::InvalidTimeRange(_))
        ));

        let (_, segment) = doc.find_segment(&seg_id).unwrap();
        assert_eq!(segment.attachments.len(), 2);
        assert_eq!(segment.speed(), Some(1.5));
        let alpha = segment.curve(KeyframeProperty::Alpha).unwrap();
        assert_eq!(alpha.evaluate(Micros::SEC), Some(0.5));
        doc.validate().unwrap();
    }

    #[test]
    fn test_audio_effects_one_per_category() {
        let (mut doc, video, music) = draft();
        let v = doc.add_track(TrackKind::Video, "main").unwrap();
        let a = doc.add_track(TrackKind::Audio, "voice").unwrap();
        let clip = Segment::video(doc.ids_mut(), video, secs(0, 4));
        let clip = doc.add_segment(&v, clip).unwrap();
        let voice = Segment::audio(doc.ids_mut(), music, secs(0, 10));
        let voice = doc.add_segment(&a, voice).unwrap();

        let effect = |category| AttachmentBody::AudioEffect {
            category,
            catalog: CatalogRef::new("Echo", "7021", "7021"),
            params: Vec::new(),
        };
        doc.attach(&voice, effect(AudioEffectCategory::SoundEffect)).unwrap();
        doc.attach(&voice, effect(AudioEffectCategory::Tone)).unwrap();
        assert!(matches!(
            doc.attach(&voice, effect(AudioEffectCategory::Tone)),
            Err(DraftError::DuplicateAudioEffect { category: "tone", .. })
        ));
        // The sound of a video segment takes audio effects too.
        doc.attach(&clip, effect(AudioEffectCategory::SpeechToSong)).unwrap();

        let (_, segment) = doc.find_segment(&voice).unwrap();
        assert_eq!(segment.attachments.len(), 2);
        assert!(segment.audio_effect(AudioEffectCategory::Tone).is_some());
        assert!(segment.audio_effect(AudioEffectCategory::SpeechToSong).is_none());
    }

    #[test]
    fn test_attachments_follow_segment_kind() {
        let (mut doc, video, music) = draft();
        let v = doc.add_track(TrackKind::Video, "main").unwrap();
        let a = doc.add_track(TrackKind::Audio, "music").unwrap();
        let t = doc.add_track(TrackKind::Text, "titles").unwrap();
        let clip = Segment::video(doc.ids_mut(), video, secs(0, 4));
        let clip = doc.add_segment(&v, clip).unwrap();
        let bgm = Segment::audio(doc.ids_mut(), music, secs(0, 4));
        let bgm = doc.add_segment(&a, bgm).unwrap();
        let title = Segment::text(doc.ids_mut(), "Hi", secs(0, 2), TextStyle::default());
        let title = doc.add_segment(&t, title).unwrap();

        // Fading a video segment fades its sound.
        let fade = AttachmentBody::Fade {
            fade_in: Micros::SEC,
            fade_out: Micros::from_millis(500),
        };
        doc.attach(&clip, fade.clone()).unwrap();
        assert!(matches!(
            doc.attach(&title, fade),
            Err(DraftError::UnsupportedAttachment { kind: "text", attachment: "fade", .. })
        ));

        let first = doc.attach(&clip, AttachmentBody::background_blur(0.375)).unwrap();
        let second = doc.attach(&clip, AttachmentBody::background_color("#FF0000FF")).unwrap();
        assert_eq!(first, second);
        let (_, segment) = doc.find_segment(&clip).unwrap();
        assert!(matches!(
            &segment.attachment(&first).unwrap().body,
            AttachmentBody::Background { mode: FillMode::Color, color, .. } if color == "#FF0000FF"
        ));
        assert!(matches!(
            doc.attach(&bgm, AttachmentBody::background_blur(0.5)),
            Err(DraftError::UnsupportedAttachment { kind: "audio", .. })
        ));

        // Text takes intro, outro and loop animations.
        for (slot, start) in [(AnimationSlot::In, 0), (AnimationSlot::Out, 1500), (AnimationSlot::Loop, 0)] {
            let catalog = CatalogRef::new(slot.name(), "1", "2");
            let body = AttachmentBody::animation(
                slot,
                catalog,
                Micros::from_millis(start),
                Micros::from_millis(500),
            );
            doc.attach(&title, body).unwrap();
        }
        let (_, segment) = doc.find_segment(&title).unwrap();
        assert_eq!(segment.attachments.len(), 3);
        doc.validate().unwrap();
    }

    #[test]
    fn test_new_draft_carries_current_version() {
        let (doc, _, _) = draft();
        assert_eq!(doc.version, SUPPORTED_VERSION);
        assert_eq!(doc.editor_version, EDITOR_VERSION);
    }

    #[test]
    fn test_validate_catches_direct_edits() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        let text = Segment::text(doc.ids_mut(), "hi", secs(0, 1), TextStyle::default());
        doc.track_mut(&track).unwrap().segments.push(text);
        assert!(matches!(
            doc.validate(),
            Err(DraftError::TrackKindMismatch { .. })
        ));

        doc.track_mut(&track).unwrap().segments.clear();
        let seg = Segment::video(doc.ids_mut(), video, secs(0, 1));
        let mut dup = seg.clone();
        dup.target = secs(2, 1);
        doc.track_mut(&track).unwrap().segments.extend([seg, dup]);
        assert!(matches!(
            doc.validate(),
            Err(DraftError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_info_summary() {
        let (mut doc, video, _) = draft();
        let track = doc.add_track(TrackKind::Video, "main").unwrap();
        let seg = Segment::video(doc.ids_mut(), video, secs(1, 3));
        doc.add_segment(&track, seg).unwrap();

        let info = doc.info();
        assert_eq!(info.duration, Micros::from_secs(4));
        assert_eq!(info.material_count, 2);
        assert_eq!(info.tracks[0].segment_count, 1);
        assert!(info.to_string().contains("main"));
    }
}
