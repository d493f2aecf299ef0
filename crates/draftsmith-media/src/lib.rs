//! Draftsmith Media - asset metadata for draft materials
//!
//! This crate answers one question for the draft model: given a file path,
//! what kind of media is it, how long does it run and how large is it.
//! - `MediaInspector` is the seam the material registry calls through
//! - `FfprobeInspector` asks `ffprobe` (located via ffmpeg-sidecar)
//! - `StaticInspector` serves metadata the caller already knows

pub mod path;
pub mod inspect;

pub use path::canonical_path;
pub use inspect::{FfprobeInspector, MediaInfo, MediaInspector, MediaKind, StaticInspector};
