//! Action-aware vertical framing.
//!
//! ```text
//! Source clip
//!     │
//!     ▼
//! ┌──────────────────────┐
//! │ FrameActionProfiler  │ ← per-frame change count + peak location
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │   select_window      │ ← max-sum window of the desired length
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │  focus_for_window    │ ← mean peak inside the window
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │     plan_crop        │ ← clamped 9:16 rectangle in source pixels
//! └──────────────────────┘
//! ```

pub mod crop;
pub mod decoder;
pub mod focus;
pub mod profiler;
pub mod window;

pub use crop::plan_crop;
pub use decoder::{FfmpegGrayDecoder, FrameDecoder, FrameStream, LumaFrame};
pub use focus::{average_point, focus_for_window};
pub use profiler::{frame_difference, FrameActionProfiler};
pub use window::{frames_for_duration, select_window};
