//! Property tests for merge and round-trip laws.

use draftsmith_core::{IdAllocator, Micros};
use draftsmith_draft::{
    import_track, parse, replace_text, serialize, DraftDocument, ImportOptions, Segment,
    StyleRun, TextStyle, TrackKind,
};
use proptest::prelude::*;

use crate::support::{assert_unique_ids, empty_draft, inspector, reload, secs};

/// Draft with one video track of `clips` one-second clips and one text
/// track, drawing ids from `seed`.
fn timeline(seed: u64, clips: usize) -> DraftDocument {
    let mut doc = empty_draft(seed);
    let material = doc.add_material("/media/shared.mp4", &inspector()).unwrap();
    let video = doc.add_track(TrackKind::Video, "main").unwrap();
    let text = doc.add_track(TrackKind::Text, "titles").unwrap();
    for i in 0..clips as i64 {
        let seg = Segment::video(doc.ids_mut(), material.clone(), secs(i, 1));
        doc.add_segment(&video, seg).unwrap();
        let title = Segment::text(doc.ids_mut(), format!("clip {i}"), secs(i, 1), TextStyle::default());
        doc.add_segment(&text, title).unwrap();
    }
    doc
}

proptest! {
    #[test]
    fn round_trip_preserves_identifiers(seed in 0u64..1000, clips in 0usize..6) {
        let doc = timeline(seed, clips);
        let loaded = reload(&doc);

        let mut before: Vec<_> = doc.identifiers().into_iter().cloned().collect();
        let mut after: Vec<_> = loaded.identifiers().into_iter().cloned().collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
        prop_assert_eq!(loaded.duration(), Micros::from_secs(clips as i64));
    }

    #[test]
    fn repeated_import_never_duplicates_ids(
        dest_seed in 0u64..50,
        template_seed in 0u64..50,
        clips in 1usize..5,
        imports in 1usize..4,
        index in 0usize..2,
    ) {
        // Equal seeds make every template id collide with a destination id.
        let template = reload(&timeline(template_seed, clips));
        let mut dest = timeline(dest_seed, clips);
        let materials = dest.materials.len();

        for _ in 0..imports {
            import_track(&mut dest, &template, index, ImportOptions::default()).unwrap();
            assert_unique_ids(&dest);
        }
        prop_assert_eq!(dest.tracks.len(), 2 + imports);
        prop_assert_eq!(dest.materials.len(), materials);
        prop_assert!(parse(&serialize(&dest).unwrap()).is_ok());
    }

    #[test]
    fn shortened_text_never_leaves_runs_out_of_range(
        text in "[a-zé ]{1,40}",
        cuts in proptest::collection::vec(1usize..40, 1..4),
        replacement_len in 0usize..40,
    ) {
        let mut doc = DraftDocument::with_allocator(
            "text",
            1920,
            1080,
            draftsmith_core::FrameRate::FPS_30,
            IdAllocator::seeded(1),
        );
        let track = doc.add_track(TrackKind::Text, "titles").unwrap();
        let len = text.chars().count();

        let mut bounds: Vec<usize> = cuts.into_iter().filter(|&c| c < len).collect();
        bounds.sort_unstable();
        bounds.dedup();
        let mut runs = Vec::new();
        let mut start = 0;
        for end in bounds.into_iter().chain(std::iter::once(len)) {
            runs.push(StyleRun { start, end, style: TextStyle::default() });
            start = end;
        }

        let mut seg = Segment::text(doc.ids_mut(), text.clone(), secs(0, 1), TextStyle::default());
        if let Some(payload) = seg.text_payload_mut() {
            payload.styles = runs;
        }
        let seg = doc.add_segment(&track, seg).unwrap();

        let replacement: String = text.chars().cycle().take(replacement_len).collect();
        replace_text(&mut doc, &seg, replacement.clone()).unwrap();

        let payload = doc.find_segment(&seg).unwrap().1.text_payload().unwrap();
        prop_assert!(!payload.styles.is_empty());
        prop_assert!(payload.styles.iter().all(|r| r.start <= r.end && r.end <= replacement_len));
        prop_assert!(payload.styles_in_bounds());
        prop_assert!(payload.styles.iter().any(|r| r.end == replacement_len));
    }
}
