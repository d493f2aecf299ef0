//! Media file probing to get metadata without decoding.

use draftsmith_core::{DraftError, Micros, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::path::canonical_path;

/// Still-image extensions. ffprobe reports images as single-frame video, so
/// they are classified by extension first.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"];

/// Broad media category of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Photo,
    Audio,
}

impl MediaKind {
    pub fn is_time_bearing(self) -> bool {
        !matches!(self, Self::Photo)
    }
}

/// Intrinsic metadata of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub kind: MediaKind,
    /// `None` for still images.
    pub duration: Option<Micros>,
    /// Zero for audio.
    pub width: u32,
    pub height: u32,
}

impl MediaInfo {
    pub fn video(duration: Micros, width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Video,
            duration: Some(duration),
            width,
            height,
        }
    }

    pub fn photo(width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Photo,
            duration: None,
            width,
            height,
        }
    }

    pub fn audio(duration: Micros) -> Self {
        Self {
            kind: MediaKind::Audio,
            duration: Some(duration),
            width: 0,
            height: 0,
        }
    }
}

/// Source of asset metadata. Fails with `UnreadableMedia` for missing or
/// corrupt files.
pub trait MediaInspector {
    fn inspect(&self, path: &Path) -> Result<MediaInfo>;
}

impl<T: MediaInspector + ?Sized> MediaInspector for &T {
    fn inspect(&self, path: &Path) -> Result<MediaInfo> {
        (**self).inspect(path)
    }
}

// ── ffprobe ─────────────────────────────────────────────────────

/// Inspector backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

impl FfprobeInspector {
    /// Use the ffprobe that ffmpeg-sidecar resolves (sidecar download or PATH).
    pub fn new() -> Self {
        Self {
            binary: ffmpeg_sidecar::ffprobe::ffprobe_path(),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for FfprobeInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaInspector for FfprobeInspector {
    fn inspect(&self, path: &Path) -> Result<MediaInfo> {
        if !path.is_file() {
            return Err(DraftError::unreadable(path, "file not found"));
        }

        let out = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| DraftError::unreadable(path, format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(DraftError::unreadable(
                path,
                format!(
                    "ffprobe failed: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&out.stdout)
            .map_err(|e| DraftError::unreadable(path, format!("ffprobe json parse failed: {e}")))?;
        let info = classify(path, &parsed)?;
        debug!(path = %path.display(), ?info, "inspected media");
        Ok(info)
    }
}

fn classify(path: &Path, output: &FfprobeOutput) -> Result<MediaInfo> {
    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let format_duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);

    if is_image_path(path) {
        let stream = video.ok_or_else(|| DraftError::unreadable(path, "no image stream"))?;
        return Ok(MediaInfo::photo(
            stream.width.unwrap_or(0),
            stream.height.unwrap_or(0),
        ));
    }

    if let Some(stream) = video {
        let duration = format_duration
            .or_else(|| stream.duration.as_deref().and_then(parse_seconds))
            .ok_or_else(|| DraftError::unreadable(path, "missing duration"))?;
        let width = stream
            .width
            .ok_or_else(|| DraftError::unreadable(path, "missing video width"))?;
        let height = stream
            .height
            .ok_or_else(|| DraftError::unreadable(path, "missing video height"))?;
        return Ok(MediaInfo::video(duration, width, height));
    }

    if let Some(stream) = audio {
        let duration = format_duration
            .or_else(|| stream.duration.as_deref().and_then(parse_seconds))
            .ok_or_else(|| DraftError::unreadable(path, "missing duration"))?;
        return Ok(MediaInfo::audio(duration));
    }

    Err(DraftError::unreadable(path, "no audio or video stream"))
}

/// ffprobe prints seconds as a decimal string ("12.345000").
fn parse_seconds(raw: &str) -> Option<Micros> {
    let raw = raw.trim();
    Micros::parse(&format!("{raw}s")).ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Micros((secs * Micros::SEC.0 as f64).round() as i64))
    })
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ── Static ──────────────────────────────────────────────────────

/// Inspector answering from a fixed table, keyed by canonical path.
#[derive(Debug, Clone, Default)]
pub struct StaticInspector {
    entries: HashMap<PathBuf, MediaInfo>,
}

impl StaticInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, info: MediaInfo) -> &mut Self {
        self.entries.insert(canonical_path(path.as_ref()), info);
        self
    }

    pub fn with(mut self, path: impl AsRef<Path>, info: MediaInfo) -> Self {
        self.insert(path, info);
        self
    }
}

impl MediaInspector for StaticInspector {
    fn inspect(&self, path: &Path) -> Result<MediaInfo> {
        self.entries
            .get(&canonical_path(path))
            .cloned()
            .ok_or_else(|| DraftError::unreadable(path, "no metadata registered"))
    }
}
