//! Draftsmith Draft - Draft document model and template merge engine
//!
//! Implements the project structure of a `draft_content.json` draft:
//! - Materials in a deduplicated registry
//! - Tracks containing segments with attached modifiers and keyframes
//! - The wire format writer and parser
//! - Template merging (material and text replacement, track import)
//! - Draft projects on disk and the cache of open drafts
//! - SubRip subtitle import

pub mod cache;
pub mod document;
pub mod folder;
pub mod material;
pub mod merge;
pub mod segment;
pub mod serialization;
pub mod subtitle;
pub mod track;
mod wire;

pub use cache::{CachedDraft, DraftCache};
pub use document::{DraftDocument, DraftInfo, TrackInfo};
pub use folder::{DraftFolder, SaveReport};
pub use material::{Material, MaterialDescriptor, MaterialRegistry, MaterialSelector, Provenance};
pub use merge::{import_track, replace_material, replace_material_for_segment, replace_text, ImportOptions};
pub use segment::{
    AnimationSlot, Attachment, AttachmentBody, AudioEffectCategory, CatalogRef, ClipSettings,
    EffectParam, FillMode, MaskGeometry, Segment, SegmentBody, StyleRun, TextAlign,
    TextBackground, TextBorder, TextPayload, TextShadow, TextStyle, DEFAULT_BACKGROUND_BLUR,
    DEFAULT_BACKGROUND_COLOR,
};
pub use serialization::{parse, parse_with, serialize};
pub use subtitle::{import_srt, import_srt_file, parse_srt, SubtitleCue, SubtitleOptions};
pub use track::{Track, TrackKind};
pub use wire::{EDITOR_VERSION, PHOTO_DURATION, SUPPORTED_VERSION};
