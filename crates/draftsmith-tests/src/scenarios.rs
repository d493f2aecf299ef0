//! End-to-end scenarios across draftsmith-core, draftsmith-media and
//! draftsmith-draft.

use std::path::{Path, PathBuf};

use draftsmith_core::{DraftError, FrameRate, IdAllocator, KeyframeProperty, Micros};
use draftsmith_draft::{
    import_track, parse, parse_with, replace_material, replace_material_for_segment,
    replace_text, serialize, AttachmentBody, CatalogRef, DraftDocument, DraftFolder,
    ImportOptions, MaterialDescriptor, Provenance, Segment, StyleRun, TextStyle, TrackKind,
};
use draftsmith_media::MediaInfo;

use crate::support::{assert_unique_ids, draft_json, empty_draft, inspector, reload, secs};

// ── Building and reopening ─────────────────────────────────────

#[test]
fn single_clip_survives_serialize_and_parse() -> anyhow::Result<()> {
    let mut doc = DraftDocument::new("single", 1920, 1080, FrameRate::FPS_30);
    let material = doc.add_material("/media/a.mp4", &inspector())?;
    let track = doc.add_track(TrackKind::Video, "main")?;
    let segment = Segment::video(
        doc.ids_mut(),
        material,
        secs(0, 5),
    );
    doc.add_segment(&track, segment)?;

    let loaded = parse(&serialize(&doc)?)?;
    assert_eq!(loaded.tracks.len(), 1);
    assert_eq!(loaded.tracks[0].segments.len(), 1);
    assert_eq!(loaded.duration(), Micros(5_000_000));
    assert_eq!((loaded.width, loaded.height), (1920, 1080));
    Ok(())
}

#[test]
fn full_draft_round_trips_every_reference() -> anyhow::Result<()> {
    let inspector = inspector();
    let mut doc = empty_draft(1);
    let clip = doc.add_material("/media/a.mp4", &inspector)?;
    let music = doc.add_material("/media/music.mp3", &inspector)?;

    let video = doc.add_track(TrackKind::Video, "main")?;
    let audio = doc.add_track(TrackKind::Audio, "music")?;
    let text = doc.add_track(TrackKind::Text, "titles")?;
    let effects = doc.add_track(TrackKind::Effect, "fx")?;

    let seg = Segment::video(doc.ids_mut(), clip, secs(0, 5));
    let seg = doc.add_segment(&video, seg)?;
    let bgm = Segment::audio(doc.ids_mut(), music, secs(0, 12)).with_volume(0.5);
    let bgm = doc.add_segment(&audio, bgm)?;
    let title = Segment::text(doc.ids_mut(), "Welcome", secs(1, 3), TextStyle::default());
    doc.add_segment(&text, title)?;
    let shake = Segment::effect(doc.ids_mut(), CatalogRef::new("Shake", "11", "12"), secs(2, 1));
    doc.add_segment(&effects, shake)?;

    doc.attach(
        &seg,
        AttachmentBody::Transition {
            catalog: CatalogRef::new("Dissolve", "21", "22"),
            duration: Micros::from_millis(400),
            overlap: true,
        },
    )?;
    doc.attach(
        &seg,
        AttachmentBody::Effect {
            catalog: CatalogRef::new("Glow", "31", "32"),
            params: Vec::new(),
        },
    )?;
    doc.attach(
        &bgm,
        AttachmentBody::Fade {
            fade_in: Micros::SEC,
            fade_out: Micros::from_secs(2),
        },
    )?;
    doc.add_keyframe(&seg, KeyframeProperty::Alpha, Micros::ZERO, 0.0)?;
    doc.add_keyframe(&seg, KeyframeProperty::Alpha, Micros::SEC, 1.0)?;
    doc.add_keyframe(&bgm, KeyframeProperty::Volume, Micros::from_secs(10), 0.2)?;

    let loaded = reload(&doc);
    let mut before: Vec<_> = doc.identifiers().into_iter().cloned().collect();
    let mut after: Vec<_> = loaded.identifiers().into_iter().cloned().collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);

    let (_, loaded_seg) = loaded.find_segment(&seg).unwrap();
    let (_, original_seg) = doc.find_segment(&seg).unwrap();
    assert_eq!(loaded_seg.attachments, original_seg.attachments);
    assert_eq!(loaded_seg.keyframes, original_seg.keyframes);
    assert_eq!(loaded_seg.material_id(), original_seg.material_id());
    assert_eq!(serialize(&loaded)?, serialize(&doc)?);
    Ok(())
}

#[test]
fn add_segment_rejects_inconsistent_input() -> anyhow::Result<()> {
    let inspector = inspector();
    let mut doc = empty_draft(2);
    let clip = doc.add_material("/media/a.mp4", &inspector)?;
    let music = doc.add_material("/media/music.mp3", &inspector)?;
    let video = doc.add_track(TrackKind::Video, "main")?;

    // Reads 6s of a 5s clip.
    let long = Segment::video(doc.ids_mut(), clip.clone(), secs(0, 6));
    assert!(matches!(
        doc.add_segment(&video, long),
        Err(DraftError::InvalidTimeRange(_))
    ));

    let audio_on_video = Segment::video(doc.ids_mut(), music, secs(0, 1));
    assert!(matches!(
        doc.add_segment(&video, audio_on_video),
        Err(DraftError::MaterialKindMismatch { .. })
    ));

    let unknown = Segment::video(doc.ids_mut(), "NOPE".into(), secs(0, 1));
    assert!(matches!(
        doc.add_segment(&video, unknown),
        Err(DraftError::MaterialNotFound(_))
    ));

    assert!(matches!(
        doc.add_track(TrackKind::Audio, "main"),
        Err(DraftError::DuplicateTrackName(_))
    ));
    assert!(doc.track(&video)?.segments.is_empty());
    Ok(())
}

// ── Template merging ───────────────────────────────────────────

/// A reopened template with two clips sharing one material.
fn shared_template() -> (DraftDocument, draftsmith_core::Identifier, draftsmith_core::Identifier) {
    let inspector = inspector();
    let mut doc = empty_draft(3);
    let shared = doc.add_material("/media/shared.mp4", &inspector).unwrap();
    let track = doc.add_track(TrackKind::Video, "main").unwrap();
    let seg = Segment::video(doc.ids_mut(), shared.clone(), secs(0, 4));
    let first = doc.add_segment(&track, seg).unwrap();
    let seg = Segment::video(doc.ids_mut(), shared, secs(4, 4)).with_source(Some(secs(4, 4)));
    let second = doc.add_segment(&track, seg).unwrap();
    (reload(&doc), first, second)
}

fn material_path(doc: &DraftDocument, segment: &draftsmith_core::Identifier) -> PathBuf {
    let (_, seg) = doc.find_segment(segment).unwrap();
    doc.materials
        .get(seg.material_id().unwrap())
        .unwrap()
        .path
        .clone()
}

#[test]
fn replacing_one_of_two_sharing_segments_clones_material() -> anyhow::Result<()> {
    let (mut doc, first, second) = shared_template();
    assert_eq!(doc.materials.len(), 1);

    let info = MediaInfo::video(Micros::from_secs(20), 1280, 720);
    replace_material_for_segment(&mut doc, &first, MaterialDescriptor::new("/media/new.mp4", info))?;

    assert_eq!(doc.materials.len(), 2);
    assert_eq!(material_path(&doc, &first), Path::new("/media/new.mp4"));
    assert_eq!(material_path(&doc, &second), Path::new("/media/shared.mp4"));
    assert_unique_ids(&doc);

    // The result still opens.
    let reopened = reload(&doc);
    assert_eq!(material_path(&reopened, &second), Path::new("/media/shared.mp4"));
    Ok(())
}

#[test]
fn global_replacement_keeps_the_material_id() -> anyhow::Result<()> {
    let (mut doc, first, second) = shared_template();
    let before = doc.find_segment(&first).unwrap().1.material_id().cloned();

    let descriptor = MaterialDescriptor::inspect("/media/new.mp4", &inspector())?;
    let id = replace_material(&mut doc, Path::new("/media/shared.mp4"), descriptor)?;

    assert_eq!(Some(&id), before.as_ref());
    assert_eq!(material_path(&doc, &first), Path::new("/media/new.mp4"));
    assert_eq!(material_path(&doc, &second), Path::new("/media/new.mp4"));
    assert_eq!(doc.materials.get(&id)?.width, 1280);
    Ok(())
}

#[test]
fn text_replacement_on_loaded_template() -> anyhow::Result<()> {
    let mut doc = empty_draft(4);
    let track = doc.add_track(TrackKind::Text, "titles")?;
    let bold = TextStyle {
        bold: true,
        ..TextStyle::default()
    };
    let mut seg = Segment::text(doc.ids_mut(), "Big Sale Today", secs(0, 3), TextStyle::default());
    if let Some(payload) = seg.text_payload_mut() {
        payload.styles = vec![
            StyleRun {
                start: 0,
                end: 8,
                style: bold,
            },
            StyleRun {
                start: 8,
                end: 14,
                style: TextStyle::default(),
            },
        ];
    }
    let seg = doc.add_segment(&track, seg)?;
    let mut doc = reload(&doc);

    replace_text(&mut doc, &seg, "Big Sale")?;
    let payload = doc.find_segment(&seg).unwrap().1.text_payload().unwrap();
    assert_eq!(payload.styles.len(), 1);
    assert!(payload.styles[0].style.bold);
    assert!(payload.styles_in_bounds());

    replace_text(&mut doc, &seg, "Big Sale This Weekend Only")?;
    let payload = doc.find_segment(&seg).unwrap().1.text_payload().unwrap();
    assert_eq!(payload.styles.last().map(|r| r.end), Some(26));

    let reopened = reload(&doc);
    let payload = reopened.find_segment(&seg).unwrap().1.text_payload().unwrap();
    assert_eq!(payload.text, "Big Sale This Weekend Only");
    Ok(())
}

#[test]
fn importing_colliding_ids_remaps_them() -> anyhow::Result<()> {
    let template = parse(&serde_json::to_vec(&draft_json("A", "TRACK-A", &["T1", "T2"]))?)?;
    let mut dest = parse_with(
        &serde_json::to_vec(&draft_json("B", "TRACK-B", &["T1", "T3"]))?,
        IdAllocator::seeded(5),
    )?;

    let track = import_track(&mut dest, &template, 0, ImportOptions::default())?;
    assert_unique_ids(&dest);

    let imported = dest.track(&track)?;
    assert_eq!(imported.name, "main_1");
    assert_eq!(imported.provenance, Provenance::Imported);
    assert!(imported
        .segments
        .iter()
        .all(|s| s.id.as_str() != "T1" && s.id.as_str() != "T2"));
    assert_eq!(dest.materials.len(), 2);

    let reopened = reload(&dest);
    assert_unique_ids(&reopened);
    Ok(())
}

#[test]
fn imported_tracks_only_accept_replacements() -> anyhow::Result<()> {
    let template = parse(&serde_json::to_vec(&draft_json("A", "TRACK-A", &["T1"]))?)?;
    let mut dest = empty_draft(6);
    let track = import_track(&mut dest, &template, 0, ImportOptions::default().named("intro"))?;
    let segment = dest.track(&track)?.segments[0].id.clone();

    assert!(matches!(
        dest.remove_segment(&segment),
        Err(DraftError::UnsupportedOnImportedTrack { .. })
    ));
    dest.attach(&segment, AttachmentBody::Speed { speed: 2.0 })?;
    replace_material_for_segment(
        &mut dest,
        &segment,
        MaterialDescriptor::new("/media/new.mp4", MediaInfo::video(Micros::from_secs(20), 1280, 720)),
    )?;
    assert_eq!(dest.find_segment(&segment).unwrap().1.speed(), Some(2.0));
    Ok(())
}

// ── Project folder ─────────────────────────────────────────────

#[test]
fn template_workflow_through_the_folder() -> anyhow::Result<()> {
    let root = std::env::temp_dir().join("draftsmith_tests_workflow");
    let _ = std::fs::remove_dir_all(&root);
    let folder = DraftFolder::new(&root);

    let mut tpl = folder.create("template", 1080, 1920, FrameRate::FPS_30, false)?;
    let track = tpl.add_track(TrackKind::Text, "caption")?;
    let seg = Segment::text(tpl.ids_mut(), "Placeholder", secs(0, 4), TextStyle::default());
    let caption = tpl.add_segment(&track, seg)?;
    let report = folder.save("template", &mut tpl)?;
    assert!(report.is_complete());

    let mut draft = folder.duplicate_as_template("template", "monday")?;
    replace_text(&mut draft, &caption, "Monday deals")?;
    folder.save("monday", &mut draft)?;

    assert_eq!(folder.list()?, vec!["monday", "template"]);
    let monday = folder.load("monday")?;
    let text = &monday.find_segment(&caption).unwrap().1.text_payload().unwrap().text;
    assert_eq!(text, "Monday deals");
    let template = folder.load("template")?;
    let text = &template.find_segment(&caption).unwrap().1.text_payload().unwrap().text;
    assert_eq!(text, "Placeholder");
    Ok(())
}
