//! Shared builders for the integration tests.

use std::collections::HashSet;

use draftsmith_core::{FrameRate, IdAllocator, Identifier, Micros, TimeRange};
use draftsmith_draft::DraftDocument;
use draftsmith_media::{MediaInfo, StaticInspector};
use serde_json::{json, Value};

pub fn secs(start: i64, duration: i64) -> TimeRange {
    TimeRange::new(Micros::from_secs(start), Micros::from_secs(duration))
}

pub fn inspector() -> StaticInspector {
    StaticInspector::new()
        .with("/media/a.mp4", MediaInfo::video(Micros::from_secs(5), 1920, 1080))
        .with("/media/shared.mp4", MediaInfo::video(Micros::from_secs(20), 1920, 1080))
        .with("/media/new.mp4", MediaInfo::video(Micros::from_secs(20), 1280, 720))
        .with("/media/music.mp3", MediaInfo::audio(Micros::from_secs(60)))
}

pub fn empty_draft(seed: u64) -> DraftDocument {
    DraftDocument::with_allocator("draft", 1920, 1080, FrameRate::FPS_30, IdAllocator::seeded(seed))
}

/// Serialize and parse back, as if the draft had been saved and reopened.
pub fn reload(doc: &DraftDocument) -> DraftDocument {
    let bytes = draftsmith_draft::serialize(doc).unwrap();
    draftsmith_draft::parse(&bytes).unwrap()
}

pub fn assert_unique_ids(doc: &DraftDocument) {
    let ids = doc.identifiers();
    let unique: HashSet<&Identifier> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "duplicate identifier in draft");
}

/// A minimal draft file with one video track whose segments carry the given
/// ids, each one second long and back to back.
pub fn draft_json(draft_id: &str, track_id: &str, segment_ids: &[&str]) -> Value {
    let material_id = format!("{draft_id}-MAT");
    let segments: Vec<Value> = segment_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "material_id": material_id,
                "target_timerange": {"start": i as i64 * 1_000_000, "duration": 1_000_000},
                "source_timerange": {"start": 0, "duration": 1_000_000},
            })
        })
        .collect();
    json!({
        "id": draft_id,
        "name": draft_id,
        "version": 360000,
        "fps": 30.0,
        "duration": segment_ids.len() as i64 * 1_000_000,
        "canvas_config": {"width": 1920, "height": 1080},
        "materials": {
            "videos": [{
                "id": material_id,
                "type": "video",
                "path": format!("/media/{draft_id}.mp4"),
                "duration": 60_000_000,
                "width": 1920,
                "height": 1080,
            }],
        },
        "tracks": [{
            "id": track_id,
            "type": "video",
            "name": "main",
            "segments": segments,
        }],
    })
}
