//! Template merge engine: material substitution, text replacement and track
//! import on a loaded draft.
//!
//! Every operation checks all of its preconditions before touching the
//! document. A failed call leaves the document exactly as it was.

use std::collections::HashMap;

use draftsmith_core::{DraftError, IdRemapper, Identifier, Micros, Result, TimeRange};
use draftsmith_media::canonical_path;
use tracing::{debug, info};

use crate::document::{check_media_class, DraftDocument};
use crate::material::{Material, MaterialDescriptor, MaterialSelector, Provenance};
use crate::segment::Segment;

/// Options for [`import_track`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Name for the imported track. Without one the template's name is used,
    /// suffixed with `_1`, `_2`, ... if the destination already has it.
    pub name: Option<String>,
    /// Shift applied to every segment's target range.
    pub offset: Micros,
}

impl ImportOptions {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(mut self, offset: Micros) -> Self {
        self.offset = offset;
        self
    }
}

/// New source and target ranges for a segment whose material becomes
/// `duration` long, or `None` if the segment already fits.
///
/// A source that would read past the end is slid back when the new material
/// is long enough, and otherwise clamped to the whole material with the
/// target shortened to match. Segments with a speed attachment are left
/// alone.
fn fit_source(segment: &Segment, duration: Option<Micros>) -> Option<(TimeRange, Micros)> {
    if segment.speed().is_some() {
        return None;
    }
    let (Some(source), Some(duration)) = (segment.source(), duration) else {
        return None;
    };
    if source.end() <= duration {
        return None;
    }
    if source.duration <= duration {
        let slid = TimeRange::new(duration - source.duration, source.duration);
        return Some((slid, segment.target.duration));
    }
    Some((
        TimeRange::new(Micros::ZERO, duration),
        segment.target.duration.min(duration),
    ))
}

fn apply_fit(segment: &mut Segment, fit: Option<(TimeRange, Micros)>) {
    let Some((source, target_duration)) = fit else {
        return;
    };
    debug!(segment = %segment.id, source = ?source, "refitted source range");
    if let Some(range) = segment.source_mut() {
        *range = source;
    }
    segment.target.duration = target_duration;
}

fn canonical(descriptor: MaterialDescriptor) -> MaterialDescriptor {
    MaterialDescriptor {
        path: canonical_path(&descriptor.path),
        ..descriptor
    }
}

/// Point a material at new content, for every segment that uses it.
///
/// The material keeps its identifier. Returns that identifier.
pub fn replace_material(
    doc: &mut DraftDocument,
    selector: impl Into<MaterialSelector>,
    descriptor: MaterialDescriptor,
) -> Result<Identifier> {
    let selector = selector.into();
    let descriptor = canonical(descriptor);
    let id = doc
        .materials
        .select(&selector)
        .map(|m| m.id.clone())
        .ok_or_else(|| DraftError::MaterialNotFound(selector.to_string()))?;

    let mut fits = Vec::new();
    for (t, track) in doc.tracks.iter().enumerate() {
        for (s, segment) in track.segments.iter().enumerate() {
            if segment.material_id() != Some(&id) {
                continue;
            }
            check_media_class(segment, id.as_str(), descriptor.info.kind)?;
            fits.push((t, s, fit_source(segment, descriptor.info.duration)));
        }
    }

    info!(material = %id, path = %descriptor.path.display(), segments = fits.len(), "replacing material");
    doc.materials.apply(&id, descriptor)?;
    for (t, s, fit) in fits {
        apply_fit(&mut doc.tracks[t].segments[s], fit);
    }
    Ok(id)
}

/// Give one segment new content without affecting any other segment.
///
/// A material the segment shares with others is left alone: the segment is
/// repointed to a material carrying the replacement, reusing one already
/// registered for that path. A material only this segment uses is updated in
/// place. Returns the id the segment references afterwards.
pub fn replace_material_for_segment(
    doc: &mut DraftDocument,
    segment_id: &Identifier,
    descriptor: MaterialDescriptor,
) -> Result<Identifier> {
    let descriptor = canonical(descriptor);
    let (t, s) = doc
        .locate_segment(segment_id)
        .ok_or_else(|| DraftError::SegmentNotFound(segment_id.to_string()))?;
    let segment = &doc.tracks[t].segments[s];
    let current = segment
        .material_id()
        .cloned()
        .ok_or_else(|| DraftError::MaterialNotFound(format!("segment {segment_id} has no material")))?;
    let shared = doc
        .material_reference_counts()
        .get(&current)
        .is_some_and(|&count| count > 1);

    // A shared material is swapped for the one already registered at the
    // replacement path when there is one, so the segment must fit that.
    let reused = shared
        .then(|| doc.materials.find_by_path(&descriptor.path))
        .flatten()
        .map(|m| (m.kind, m.duration));
    let (kind, duration) = reused.unwrap_or((descriptor.info.kind, descriptor.info.duration));
    check_media_class(segment, current.as_str(), kind)?;
    let fit = fit_source(segment, duration);

    let id = if shared {
        let id = doc
            .materials
            .insert_described(descriptor, &mut doc.ids);
        info!(segment = %segment_id, from = %current, to = %id, "cloned shared material");
        doc.tracks[t].segments[s].set_material_id(id.clone());
        id
    } else {
        info!(segment = %segment_id, material = %current, "replacing exclusive material in place");
        doc.materials.apply(&current, descriptor)?;
        current
    };
    apply_fit(&mut doc.tracks[t].segments[s], fit);
    Ok(id)
}

/// Replace the text of a text segment, re-anchoring its style runs.
pub fn replace_text(
    doc: &mut DraftDocument,
    segment_id: &Identifier,
    text: impl Into<String>,
) -> Result<()> {
    let segment = doc
        .segment_mut(segment_id)
        .ok_or_else(|| DraftError::SegmentNotFound(segment_id.to_string()))?;
    let payload = segment
        .text_payload_mut()
        .ok_or_else(|| DraftError::NotATextSegment(segment_id.to_string()))?;
    payload.set_text(text);
    debug!(segment = %segment_id, runs = payload.styles.len(), "replaced text");
    Ok(())
}

/// Copy track `index` of `template`, with everything it references, into
/// `dest`. Returns the new track's id.
///
/// Every identifier of the copy is freshly allocated in `dest`, so importing
/// the same track twice is safe. Materials whose canonical path is already
/// registered in `dest` are reused. The copy is marked imported.
pub fn import_track(
    dest: &mut DraftDocument,
    template: &DraftDocument,
    index: usize,
    options: ImportOptions,
) -> Result<Identifier> {
    let source = template
        .tracks
        .get(index)
        .ok_or_else(|| DraftError::not_found("track index", index))?;

    let name = match options.name {
        Some(name) if dest.track_by_name(&name).is_some() => {
            return Err(DraftError::DuplicateTrackName(name));
        }
        Some(name) => name,
        None => unique_track_name(dest, &source.name),
    };

    if let Some(segment) = source
        .segments
        .iter()
        .find(|s| (s.target.start + options.offset).is_negative())
    {
        return Err(DraftError::InvalidTimeRange(format!(
            "offset {} moves segment {} before zero",
            options.offset, segment.id
        )));
    }

    // Materials the track references, in first-use order.
    let mut needed: Vec<&Material> = Vec::new();
    for segment in &source.segments {
        if let Some(id) = segment.material_id() {
            if needed.iter().any(|m| &m.id == id) {
                continue;
            }
            let material = template
                .materials
                .get(id)
                .map_err(|_| DraftError::MaterialNotFound(id.to_string()))?;
            needed.push(material);
        }
    }

    let render_index = dest.next_render_index(source.kind);

    let mut remap = IdRemapper::new(&mut dest.ids);
    let mut materials: HashMap<Identifier, Identifier> = HashMap::new();
    for material in needed {
        let id = match dest.materials.find_by_path(&material.path) {
            Some(existing) => {
                debug!(material = %material.id, reused = %existing.id, "deduplicated material");
                existing.id.clone()
            }
            None => {
                let id = remap.remap(&material.id);
                dest.materials.insert(Material {
                    id: id.clone(),
                    provenance: Provenance::Imported,
                    ..material.clone()
                })?;
                id
            }
        };
        materials.insert(material.id.clone(), id);
    }

    let mut track = source.clone();
    track.id = remap.remap(&source.id);
    track.name = name;
    track.render_index = render_index;
    track.provenance = Provenance::Imported;
    for segment in &mut track.segments {
        segment.remap_ids(&mut remap, &materials);
        segment.target = segment.target.shifted(options.offset);
    }
    let remapped = remap.mapping().len();

    info!(
        track = %track.id,
        name = %track.name,
        segments = track.segments.len(),
        remapped,
        "imported track"
    );
    let id = track.id.clone();
    dest.tracks.push(track);
    Ok(id)
}

fn unique_track_name(doc: &DraftDocument, base: &str) -> String {
    if doc.track_by_name(base).is_none() {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| doc.track_by_name(candidate).is_none())
        .unwrap_or_else(|| base.to_string())
}
