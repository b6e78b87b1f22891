//! Stock-footage video assembly worker.
//!
//! This crate provides:
//! - Script-driven video assembly with per-scene skipping
//! - Single-scene framing, cropping and narration muxing
//! - Command-backed footage, narration and music providers
//! - Linear job polling

pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod retry;
pub mod scene_renderer;
pub mod video_assembler;

#[cfg(test)]
pub(crate) mod testing;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::SceneLogger;
pub use providers::{
    CommandFootageProvider, CommandLine, CommandMusicProvider, CommandNarrationProvider,
    FootageProvider, MusicProvider, NarrationProvider,
};
pub use retry::{poll_job, poll_until, JobPoll, JobStatusSource, PollConfig};
pub use scene_renderer::SceneRenderer;
pub use video_assembler::{Assembly, Providers, VideoAssembler};
