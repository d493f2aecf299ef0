//! Pins the wire schema against a reference draft.
//!
//! `fixtures/golden_draft.json` is a complete draft as the editor expects it.
//! `fixtures/template_draft.json` is a template saved by an older editor, with
//! fields the model does not interpret, entries no segment uses and a sticker
//! track. Loading and rewriting either must reproduce it field for field.

use draftsmith_core::{Identifier, KeyframeProperty, Micros};
use draftsmith_draft::{
    parse, replace_text, serialization, AttachmentBody, SegmentBody, TrackKind, PHOTO_DURATION,
};
use draftsmith_media::MediaKind;
use serde_json::Value;

const GOLDEN: &str = include_str!("../fixtures/golden_draft.json");
const TEMPLATE: &str = include_str!("../fixtures/template_draft.json");

fn golden() -> Value {
    serde_json::from_str(GOLDEN).unwrap()
}

#[test]
fn golden_draft_rewrites_identically() {
    let doc = parse(GOLDEN.as_bytes()).unwrap();
    let written = serialization::to_value(&doc).unwrap();
    assert_eq!(written, golden());
}

#[test]
fn golden_draft_loads_into_the_model() {
    let doc = parse(GOLDEN.as_bytes()).unwrap();
    assert_eq!(doc.id, Identifier::from("DRAFT-0001"));
    assert_eq!(doc.duration(), Micros::from_secs(7));
    assert_eq!(
        doc.tracks.iter().map(|t| t.kind).collect::<Vec<_>>(),
        vec![TrackKind::Video, TrackKind::Audio, TrackKind::Text, TrackKind::Filter]
    );
    assert_eq!(doc.metadata["platform"]["os"], "windows");

    let photo = doc.materials.get(&Identifier::from("PHO1")).unwrap();
    assert_eq!(photo.kind, MediaKind::Photo);
    assert_eq!(photo.duration, None);

    let clip = &doc.tracks[0].segments[0];
    assert_eq!(clip.speed(), Some(1.0));
    let kinds: Vec<_> = clip.attachments.iter().map(|a| a.body.name()).collect();
    assert_eq!(kinds, vec!["speed", "animation", "mask"]);
    let scale = clip.curve(KeyframeProperty::ScaleX).unwrap();
    let mid = scale.evaluate(Micros::from_millis(2500)).unwrap();
    assert!((mid - 1.1).abs() < 1e-9);

    let fade = &doc.tracks[1].segments[0].attachments[0];
    assert!(matches!(
        fade.body,
        AttachmentBody::Fade { fade_in, fade_out }
            if fade_in == Micros::SEC && fade_out == Micros::from_millis(500)
    ));

    let title = doc.tracks[2].segments[0].text_payload().unwrap();
    assert_eq!(title.text, "Hello");
    assert_eq!(title.content_id, Identifier::from("TXT1"));

    assert!(matches!(
        &doc.tracks[3].segments[0].body,
        SegmentBody::Filter { intensity, .. } if (*intensity - 0.7).abs() < 1e-9
    ));
}

#[test]
fn photo_duration_constant_matches_fixture() {
    let golden = golden();
    assert_eq!(golden["materials"]["videos"][1]["duration"], PHOTO_DURATION.0);
}

#[test]
fn template_draft_rewrites_identically() {
    let doc = parse(TEMPLATE.as_bytes()).unwrap();
    let written = serialization::to_value(&doc).unwrap();
    let original: Value = serde_json::from_str(TEMPLATE).unwrap();
    assert_eq!(written, original);
}

#[test]
fn template_draft_edits_keep_the_rest_of_the_file() {
    let mut doc = parse(TEMPLATE.as_bytes()).unwrap();
    assert_eq!(doc.version, 300000);
    assert_eq!(doc.editor_version, "75.0.0");
    assert_eq!(doc.tracks[3].kind, TrackKind::Sticker);
    assert!(matches!(
        &doc.tracks[3].segments[0].body,
        SegmentBody::Sticker { sticker, .. } if sticker.name == "Heart"
    ));

    let title = doc.tracks[2].segments[0].id.clone();
    replace_text(&mut doc, &title, "Anna & Tom").unwrap();
    let written = serialization::to_value(&doc).unwrap();
    let mut expected: Value = serde_json::from_str(TEMPLATE).unwrap();

    let content: Value =
        serde_json::from_str(written["materials"]["texts"][0]["content"].as_str().unwrap()).unwrap();
    assert_eq!(content["text"], "Anna & Tom");
    assert_eq!(content["styles"][0]["range"], serde_json::json!([0, 10]));

    expected["materials"]["texts"][0]["content"] = written["materials"]["texts"][0]["content"].clone();
    assert_eq!(written, expected);
    assert_eq!(written["materials"]["speeds"][0]["id"], "ORPHAN-SPEED");
    assert_eq!(written["materials"]["beats"][0]["mode"], 404);
}
