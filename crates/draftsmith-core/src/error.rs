//! Error types for Draftsmith.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for draft operations.
///
/// Every variant names the entity (identifier or path) involved so callers can
/// retry or report without re-deriving context.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Invalid time format '{input}': {reason}")]
    InvalidTimeFormat { input: String, reason: String },

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Segment {0} is not a text segment")]
    NotATextSegment(String),

    #[error("Cannot {operation} on imported track {track}")]
    UnsupportedOnImportedTrack {
        track: String,
        operation: &'static str,
    },

    #[error("Track {track} holds {expected} segments, got {actual}")]
    TrackKindMismatch {
        track: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Segment {segment} is a {kind} segment and cannot take a {attachment} attachment")]
    UnsupportedAttachment {
        segment: String,
        kind: &'static str,
        attachment: &'static str,
    },

    #[error("Segment {segment} already has a {category} audio effect")]
    DuplicateAudioEffect {
        segment: String,
        category: &'static str,
    },

    #[error("Track name already in use: {0}")]
    DuplicateTrackName(String),

    #[error("Material {material} is used as {expected} media, replacement is {actual}")]
    MaterialKindMismatch {
        material: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Segment {segment} overlaps segment {existing} on track {track}")]
    SegmentOverlap {
        track: String,
        segment: String,
        existing: String,
    },

    #[error("Failed to copy material {} into project: {source}", path.display())]
    MaterialCopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unreadable media {}: {reason}", path.display())]
    UnreadableMedia { path: PathBuf, reason: String },

    #[error("Draft already exists: {0}")]
    DraftExists(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DraftError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    pub fn invalid_time(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimeFormat {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableMedia {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for draft operations.
pub type Result<T> = std::result::Result<T, DraftError>;
