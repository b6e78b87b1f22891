//! Stock-footage video assembly binary.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sclip_media::{check_ffmpeg, check_ffprobe, FfmpegTranscoder, FfprobeProbe, FrameActionProfiler};
use sclip_models::Script;
use sclip_storage::AssetCache;
use sclip_worker::{
    CommandFootageProvider, CommandLine, CommandMusicProvider, CommandNarrationProvider,
    MusicProvider, Providers, SceneRenderer, VideoAssembler, WorkerConfig, WorkerError,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting sclip-worker");

    if let Err(e) = run().await {
        error!("Assembly failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "sclip=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> Result<()> {
    let script_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SCLIP_SCRIPT_PATH").ok())
        .map(PathBuf::from)
        .context("usage: sclip-worker <script.json> (or set SCLIP_SCRIPT_PATH)")?;

    let raw = tokio::fs::read_to_string(&script_path)
        .await
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("parsing script {}", script_path.display()))?;

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    check_ffmpeg()?;
    check_ffprobe()?;

    let providers = build_providers(&config)?;

    let cache = Arc::new(AssetCache::open(&config.cache_path).await?);

    let mut transcoder = FfmpegTranscoder::new(config.encoding.clone());
    if let Some(timeout) = config.ffmpeg_timeout {
        transcoder = transcoder.with_timeout(timeout.as_secs());
    }
    let transcoder = Arc::new(transcoder);
    let probe = Arc::new(FfprobeProbe);

    let scenes = SceneRenderer::new(
        FrameActionProfiler::default(),
        transcoder.clone(),
        probe.clone(),
        &config.work_dir,
        &config.encoding,
    );

    let assembler = VideoAssembler::new(config, cache, providers, scenes, transcoder, probe);
    let assembly = assembler.assemble(&script).await?;

    info!(
        output = %assembly.output.display(),
        scenes = assembly.scenes_rendered,
        skipped = assembly.scenes_skipped,
        "Rendering complete"
    );
    Ok(())
}

fn build_providers(config: &WorkerConfig) -> Result<Providers, WorkerError> {
    let footage_cmd = config
        .footage_cmd
        .as_deref()
        .ok_or_else(|| WorkerError::config_error("SCLIP_FOOTAGE_CMD is not set"))?;
    let narration_cmd = config
        .narration_cmd
        .as_deref()
        .ok_or_else(|| WorkerError::config_error("SCLIP_NARRATION_CMD is not set"))?;

    let music: Option<Arc<dyn MusicProvider>> = match config.music_cmd.as_deref() {
        Some(line) => Some(Arc::new(CommandMusicProvider::new(
            CommandLine::parse(line)?,
            config.download_watch(),
        ))),
        None => None,
    };

    Ok(Providers {
        footage: Arc::new(CommandFootageProvider::new(
            CommandLine::parse(footage_cmd)?,
            config.download_watch(),
        )),
        narration: Arc::new(CommandNarrationProvider::new(
            CommandLine::parse(narration_cmd)?,
            config.tts_poll(),
            config.narration_warmup,
        )),
        music,
    })
}
