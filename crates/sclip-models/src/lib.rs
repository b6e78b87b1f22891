//! Shared data models for the SClip footage pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Frame action profiles and selection windows
//! - Crop plans in source pixel space
//! - Asynchronous external job handles
//! - Narration scripts produced by the script generator
//! - Encoding configuration

pub mod analysis;
pub mod crop;
pub mod encoding;
pub mod job;
pub mod script;
pub mod utils;

// Re-export common types
pub use analysis::{FocusPoint, FrameAction, FrameActionProfile, Point, SelectionWindow};
pub use crop::CropPlan;
pub use encoding::EncodingConfig;
pub use job::{AsyncJobHandle, JobState};
pub use script::{Scene, Script, SoundtrackPrompt};
pub use utils::to_snake_case;
