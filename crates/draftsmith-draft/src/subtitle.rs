//! SubRip (`.srt`) subtitles imported as text segments.

use std::fs;
use std::path::Path;

use draftsmith_core::{DraftError, Identifier, Micros, Result, TimeRange};
use tracing::info;

use crate::document::DraftDocument;
use crate::segment::{ClipSettings, Segment, TextStyle};
use crate::track::{Track, TrackKind};

/// One subtitle: its text and when it shows, relative to the file's zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub range: TimeRange,
    /// Lines of the cue joined with `\n`.
    pub text: String,
}

/// How [`import_srt`] places cues.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleOptions {
    /// Text track receiving the cues. Created when missing.
    pub track_name: String,
    pub style: TextStyle,
    pub clip: ClipSettings,
    /// Shift applied to every cue.
    pub offset: Micros,
}

impl Default for SubtitleOptions {
    fn default() -> Self {
        Self {
            track_name: "subtitle".to_string(),
            style: TextStyle {
                size: 5.0,
                ..TextStyle::default()
            },
            clip: ClipSettings {
                transform_y: -0.8,
                ..ClipSettings::default()
            },
            offset: Micros::ZERO,
        }
    }
}

impl SubtitleOptions {
    pub fn on_track(mut self, name: impl Into<String>) -> Self {
        self.track_name = name.into();
        self
    }

    pub fn at(mut self, offset: Micros) -> Self {
        self.offset = offset;
        self
    }
}

/// Parse SubRip text. Cue numbers are optional; blank lines separate cues.
pub fn parse_srt(input: &str) -> Result<Vec<SubtitleCue>> {
    let input = input.trim_start_matches('\u{feff}');
    let mut lines = input.lines();
    let mut cues = Vec::new();

    while let Some(first) = lines.by_ref().find(|l| !l.trim().is_empty()) {
        let timing = if first.contains("-->") {
            first
        } else {
            lines
                .next()
                .ok_or_else(|| DraftError::invalid_time(first, "cue has no timing line"))?
        };
        let range = parse_timing(timing)?;
        let text: Vec<&str> = lines
            .by_ref()
            .take_while(|l| !l.trim().is_empty())
            .collect();
        cues.push(SubtitleCue {
            range,
            text: text.join("\n"),
        });
    }
    Ok(cues)
}

/// `00:00:01,000 --> 00:00:02,500`, with optional position hints after the
/// end time.
fn parse_timing(line: &str) -> Result<TimeRange> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| DraftError::invalid_time(line, "expected 'start --> end'"))?;
    let end = end.split_whitespace().next().unwrap_or_default();
    let start = parse_timestamp(start.trim())?;
    let end = parse_timestamp(end)?;
    if end <= start {
        return Err(DraftError::invalid_time(line, "cue ends before it starts"));
    }
    Ok(TimeRange::from_start_end(start, end))
}

/// `HH:MM:SS,mmm`. A `.` is accepted in place of the comma.
fn parse_timestamp(input: &str) -> Result<Micros> {
    let bad = |reason: &str| DraftError::invalid_time(input, reason);
    let (clock, millis) = input
        .split_once([',', '.'])
        .ok_or_else(|| bad("missing milliseconds"))?;
    let fields: Vec<&str> = clock.split(':').collect();
    let [hours, minutes, seconds] = fields.as_slice() else {
        return Err(bad("expected HH:MM:SS"));
    };

    let number = |field: &str, max: Option<i64>| -> Result<i64> {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad("expected digits"));
        }
        let value: i64 = field.parse().map_err(|_| bad("value out of range"))?;
        match max {
            Some(max) if value > max => Err(bad("field out of range")),
            _ => Ok(value),
        }
    };
    if millis.len() != 3 {
        return Err(bad("milliseconds take three digits"));
    }

    let hours = number(*hours, None)?;
    let minutes = number(*minutes, Some(59))?;
    let seconds = number(*seconds, Some(59))?;
    let millis = number(millis, None)?;

    hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds))
        .and_then(|s| s.checked_mul(1_000))
        .and_then(|ms| ms.checked_add(millis))
        .and_then(|ms| ms.checked_mul(Micros::MS.0))
        .map(Micros)
        .ok_or_else(|| bad("value out of range"))
}

/// Add every cue of `srt` as a text segment on the track named in `options`.
///
/// The track is created if the draft has none by that name. All cues are
/// checked before any is added: a malformed cue, a cue shifted before zero or
/// a cue overlapping the track's segments fails the whole import and leaves
/// the draft untouched. Returns the new segment ids in cue order.
pub fn import_srt(
    doc: &mut DraftDocument,
    srt: &str,
    options: &SubtitleOptions,
) -> Result<Vec<Identifier>> {
    let cues = parse_srt(srt)?;

    let existing = doc.track_by_name(&options.track_name).cloned();
    if let Some(track) = &existing {
        if track.kind != TrackKind::Text {
            return Err(DraftError::TrackKindMismatch {
                track: track.id.to_string(),
                expected: track.kind.name(),
                actual: TrackKind::Text.name(),
            });
        }
        if track.is_imported() {
            return Err(DraftError::UnsupportedOnImportedTrack {
                track: track.id.to_string(),
                operation: "import subtitles",
            });
        }
    }

    let mut staged = existing.unwrap_or_else(|| {
        Track::new(Identifier::from("staged"), TrackKind::Text, options.track_name.clone(), 0)
    });
    let mut segments = Vec::with_capacity(cues.len());
    for cue in &cues {
        let start = cue.range.start.0.checked_add(options.offset.0).map(Micros);
        let target = match start {
            Some(start) if !start.is_negative() => TimeRange::new(start, cue.range.duration),
            _ => {
                return Err(DraftError::InvalidTimeRange(format!(
                    "cue at {} shifted by {} starts before zero",
                    cue.range.start.format(),
                    options.offset.format()
                )))
            }
        };
        let segment = Segment::text(doc.ids_mut(), cue.text.clone(), target, options.style.clone())
            .with_clip(options.clip);
        let pos = staged.check_insert(&segment)?;
        staged.segments.insert(pos, segment.clone());
        segments.push(segment);
    }

    let track = match doc.track_by_name(&options.track_name) {
        Some(track) => track.id.clone(),
        None => doc.add_track(TrackKind::Text, options.track_name.clone())?,
    };
    let mut added = Vec::with_capacity(segments.len());
    for segment in segments {
        added.push(doc.add_segment(&track, segment)?);
    }
    info!(track = %track, cues = added.len(), "imported subtitles");
    Ok(added)
}

/// [`import_srt`] on the contents of a file.
pub fn import_srt_file(
    doc: &mut DraftDocument,
    path: &Path,
    options: &SubtitleOptions,
) -> Result<Vec<Identifier>> {
    let srt = fs::read_to_string(path)?;
    import_srt(doc, &srt, options)
}
