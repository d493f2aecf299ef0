//! Draftsmith Core - Foundation types for draft documents
//!
//! This crate provides the types every other Draftsmith crate shares:
//! - Time representation (Micros, TimeRange, FrameRate)
//! - Entity identifiers and the document-scoped allocator
//! - Keyframe curves
//! - The error taxonomy
//! - Settings and logging setup

pub mod error;
pub mod id;
pub mod keyframe;
pub mod logging;
pub mod settings;
pub mod time;

pub use error::{DraftError, Result};
pub use id::{IdAllocator, IdRemapper, Identifier};
pub use keyframe::{CubicBezier, EasingCurve, KeyframeCurve, KeyframePoint, KeyframeProperty};
pub use settings::Settings;
pub use time::{trange, FrameRate, Micros, TimeRange};
