//! Track types for the draft timeline.

use std::fmt;

use draftsmith_core::{DraftError, Identifier, Micros, Result};
use serde_json::{Map, Value};

use crate::material::Provenance;
use crate::segment::Segment;

/// Kind of track. Every segment on a track has the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    Effect,
    Filter,
    Sticker,
}

impl TrackKind {
    pub const ALL: [Self; 6] = [
        Self::Video,
        Self::Audio,
        Self::Text,
        Self::Effect,
        Self::Filter,
        Self::Sticker,
    ];

    /// Name used in the draft file.
    pub fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Effect => "effect",
            Self::Filter => "filter",
            Self::Sticker => "sticker",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Lowest render index for tracks of this kind. Audio sits at the bottom,
    /// text on top; each further track of a kind takes the next index.
    pub fn base_render_index(self) -> i32 {
        match self {
            Self::Audio => 0,
            Self::Video => 1,
            Self::Effect => 10_000,
            Self::Filter => 11_000,
            Self::Sticker => 14_000,
            Self::Text => 15_000,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered, kind-homogeneous sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: Identifier,
    pub kind: TrackKind,
    pub name: String,
    /// Layering order; higher renders on top.
    pub render_index: i32,
    pub muted: bool,
    pub provenance: Provenance,
    /// Sorted by start time, never overlapping.
    pub segments: Vec<Segment>,
    /// Fields of the loaded track the model does not interpret.
    pub extra: Map<String, Value>,
}

impl Track {
    pub fn new(id: Identifier, kind: TrackKind, name: impl Into<String>, render_index: i32) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            render_index,
            muted: false,
            provenance: Provenance::Authored,
            segments: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn is_imported(&self) -> bool {
        self.provenance == Provenance::Imported
    }

    /// End of the last segment.
    pub fn end(&self) -> Micros {
        self.segments
            .iter()
            .map(|s| s.target.end())
            .max()
            .unwrap_or(Micros::ZERO)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn find_segment(&self, id: &Identifier) -> Option<&Segment> {
        self.segments.iter().find(|s| &s.id == id)
    }

    pub fn find_segment_mut(&mut self, id: &Identifier) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| &s.id == id)
    }

    /// Segment playing at `time`.
    pub fn segment_at(&self, time: Micros) -> Option<&Segment> {
        self.segments.iter().find(|s| s.target.contains(time))
    }

    /// Check that `segment` fits on this track and return its sorted position.
    pub fn check_insert(&self, segment: &Segment) -> Result<usize> {
        if segment.kind() != self.kind {
            return Err(DraftError::TrackKindMismatch {
                track: self.id.to_string(),
                expected: self.kind.name(),
                actual: segment.kind().name(),
            });
        }
        if let Some(existing) = self
            .segments
            .iter()
            .find(|s| s.target.overlaps(segment.target))
        {
            return Err(DraftError::SegmentOverlap {
                track: self.id.to_string(),
                segment: segment.id.to_string(),
                existing: existing.id.to_string(),
            });
        }
        Ok(self
            .segments
            .partition_point(|s| s.target.start <= segment.target.start))
    }

    /// Remove a segment by id. Returns the removed segment.
    pub(crate) fn take_segment(&mut self, id: &Identifier) -> Option<Segment> {
        let pos = self.segments.iter().position(|s| &s.id == id)?;
        Some(self.segments.remove(pos))
    }

    /// Every pair of neighbouring segments is ordered and disjoint.
    pub fn is_well_ordered(&self) -> bool {
        self.segments
            .windows(2)
            .all(|w| w[0].target.end() <= w[1].target.start)
    }
}
