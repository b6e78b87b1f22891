//! Whole-video assembly from a script.
//!
//! Scenes are rendered one at a time in script order. A scene that cannot be
//! rendered is skipped; the rest still make it into the final video.

use metrics::counter;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use sclip_media::audio_sync::MERGED_PREFIX;
use sclip_media::fs_utils::{remove_if_exists, remove_temp_files};
use sclip_media::render::{CONVERTED_FPS_PREFIX, CROPPED_PREFIX};
use sclip_media::{write_concat_list, MediaProbe, Transcoder};
use sclip_models::{Scene, Script, SoundtrackPrompt};
use sclip_storage::{AssetCache, CacheKind, Fingerprint};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::SceneLogger;
use crate::providers::{FootageProvider, MusicProvider, NarrationProvider};
use crate::retry::{poll_until, JobPoll};
use crate::scene_renderer::SceneRenderer;

/// Concatenated scenes, before music.
pub const VIDEO_FILE_NAME: &str = "video.mp4";
/// Concat list of rendered scenes.
pub const SCENES_FILE_NAME: &str = "scenes.txt";

/// Metric names.
pub mod names {
    pub const SCENES_TOTAL: &str = "sclip_scenes_total";
}

/// External asset sources used by the assembler.
#[derive(Clone)]
pub struct Providers {
    pub footage: Arc<dyn FootageProvider>,
    pub narration: Arc<dyn NarrationProvider>,
    pub music: Option<Arc<dyn MusicProvider>>,
}

/// Outcome of a successful assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub output: PathBuf,
    pub scenes_rendered: usize,
    pub scenes_skipped: usize,
    pub with_music: bool,
}

/// Turns a script into a finished rendering.
pub struct VideoAssembler {
    config: WorkerConfig,
    cache: Arc<AssetCache>,
    providers: Providers,
    scenes: SceneRenderer,
    transcoder: Arc<dyn Transcoder>,
    probe: Arc<dyn MediaProbe>,
}

impl VideoAssembler {
    pub fn new(
        config: WorkerConfig,
        cache: Arc<AssetCache>,
        providers: Providers,
        scenes: SceneRenderer,
        transcoder: Arc<dyn Transcoder>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        Self {
            config,
            cache,
            providers,
            scenes,
            transcoder,
            probe,
        }
    }

    fn video_path(&self) -> PathBuf {
        self.config.work_dir.join(VIDEO_FILE_NAME)
    }

    fn scenes_path(&self) -> PathBuf {
        self.config.work_dir.join(SCENES_FILE_NAME)
    }

    /// Remove leftovers of a previous run.
    pub async fn prepare(&self) -> WorkerResult<()> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        remove_if_exists(self.video_path()).await?;
        remove_if_exists(self.scenes_path()).await?;
        let removed = remove_temp_files(
            &self.config.work_dir,
            &[MERGED_PREFIX, CONVERTED_FPS_PREFIX, CROPPED_PREFIX],
        )
        .await?;
        if removed > 0 {
            info!(removed, "Removed temporary files from previous run");
        }
        Ok(())
    }

    /// Render every scene, concatenate them and lay the music bed.
    pub async fn assemble(&self, script: &Script) -> WorkerResult<Assembly> {
        self.prepare().await?;

        let mut script = script.clone();
        if let Some(word) = &self.config.general_keyword {
            script.add_general_keyword(word);
        }

        info!(title = %script.title, scenes = script.scenes.len(), "Assembling video");

        let total = script.scenes.len();
        let mut rendered = Vec::new();
        let mut skipped = 0;

        for (index, scene) in script.scenes.iter().enumerate() {
            let keywords = scene.keywords.clone().unwrap_or_default();
            let logger = SceneLogger::new(index, total, &keywords);

            if !scene.is_renderable() {
                logger.log_skipped("missing message or keywords");
                counter!(names::SCENES_TOTAL, "result" => "skipped").increment(1);
                skipped += 1;
                continue;
            }

            logger.log_start("fetching narration and footage");
            let result = self
                .render_scene(scene)
                .instrument(logger.create_span())
                .await;
            match result {
                Ok(path) => {
                    logger.log_completion(&path.display().to_string());
                    counter!(names::SCENES_TOTAL, "result" => "rendered").increment(1);
                    rendered.push(path);
                }
                Err(e) if e.is_scene_level() => {
                    logger.log_skipped(&e.to_string());
                    counter!(names::SCENES_TOTAL, "result" => e.skip_label()).increment(1);
                    skipped += 1;
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    return Err(e);
                }
            }
        }

        if rendered.is_empty() {
            return Err(WorkerError::NoScenes);
        }

        let scenes_path = self.scenes_path();
        let video_path = self.video_path();
        write_concat_list(&rendered, &scenes_path).await?;
        self.transcoder.concat(&scenes_path, &video_path).await?;

        tokio::fs::create_dir_all(&self.config.renderings_dir).await?;
        let output = self.config.rendering_path(&script.title);

        let with_music = match &script.soundtrack_prompt {
            Some(prompt) => self.add_music(prompt, &video_path, &output).await?,
            None => false,
        };
        if !with_music {
            tokio::fs::copy(&video_path, &output).await?;
        }

        remove_if_exists(&scenes_path).await?;

        info!(
            output = %output.display(),
            rendered = rendered.len(),
            skipped,
            with_music,
            "Video assembled"
        );

        Ok(Assembly {
            output,
            scenes_rendered: rendered.len(),
            scenes_skipped: skipped,
            with_music,
        })
    }

    async fn render_scene(&self, scene: &Scene) -> WorkerResult<PathBuf> {
        let (Some(message), Some(keywords)) = (&scene.message, &scene.keywords) else {
            return Err(WorkerError::scene_skipped("missing message or keywords"));
        };

        let speech_dir = self.config.speech_dir.as_path();
        let narration = self
            .cached(CacheKind::Speech, Fingerprint::text(message.as_str()), || {
                self.providers.narration.synthesize(message, speech_dir)
            })
            .await?;

        let work_dir = self.config.work_dir.as_path();
        let footage = self
            .cached(CacheKind::Footage, Fingerprint::keywords(keywords.as_slice()), || {
                self.providers.footage.fetch(keywords, work_dir)
            })
            .await?;

        self.scenes.render_scene(&footage, Some(&narration)).await
    }

    /// Cached asset for `fingerprint`, fetching and recording it on a miss.
    async fn cached<F, Fut>(
        &self,
        kind: CacheKind,
        fingerprint: Fingerprint,
        fetch: F,
    ) -> WorkerResult<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = WorkerResult<PathBuf>>,
    {
        if let Some(path) = self.cache.lookup(kind, &fingerprint).await? {
            return Ok(path);
        }
        let path = fetch().await?;
        self.cache.store(kind, &fingerprint, &path).await?;
        Ok(path)
    }

    /// Mix a music bed into `output`. Returns `false` when no track could
    /// be obtained.
    async fn add_music(
        &self,
        prompt: &SoundtrackPrompt,
        video: &Path,
        output: &Path,
    ) -> WorkerResult<bool> {
        let Some(music) = &self.providers.music else {
            warn!("No music provider configured, rendering without music");
            return Ok(false);
        };

        let music_dir = self.config.music_dir.as_path();
        let poll = self.config.music_poll();
        let track = self
            .cached(CacheKind::Music, Fingerprint::soundtrack(prompt), || {
                poll_until(&poll, move |candidate| async move {
                    music
                        .fetch(prompt, candidate, music_dir)
                        .await
                        .map(JobPoll::Succeeded)
                })
            })
            .await;

        let track = match track {
            Ok(track) => track,
            Err(e) if e.is_scene_level() => {
                warn!("No music track available, rendering without music: {}", e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let duration = self.probe.probe(video).await?.duration;
        let normalized = self.config.work_dir.join("music_normalized.m4a");
        let trimmed = self.config.work_dir.join("music_trimmed.m4a");
        let encoding = &self.config.encoding;

        self.transcoder.normalize_loudness(&track, &normalized).await?;
        self.transcoder
            .trim_audio(
                &normalized,
                &trimmed,
                duration,
                encoding.music_volume,
                encoding.music_fade_secs,
            )
            .await?;
        self.transcoder.mix_music(video, &trimmed, output).await?;

        for intermediate in [&normalized, &trimmed] {
            remove_if_exists(intermediate).await?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFootage, FakeMusic, FakeNarration};
    use sclip_media::testing::{FixedProbe, RecordingTranscoder, ScriptedDecoder};
    use sclip_media::FrameActionProfiler;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        config: WorkerConfig,
        transcoder: Arc<RecordingTranscoder>,
        footage: Arc<FakeFootage>,
        narration: Arc<FakeNarration>,
        music: Arc<FakeMusic>,
    }

    impl Harness {
        fn new(music_failures: u32) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let config = WorkerConfig {
                work_dir: root.join("stock-footage"),
                speech_dir: root.join("speech"),
                music_dir: root.join("music"),
                renderings_dir: root.join("renderings"),
                cache_path: root.join("storage.json"),
                ..WorkerConfig::default()
            };
            Self {
                _dir: dir,
                config,
                transcoder: Arc::new(RecordingTranscoder::default()),
                footage: Arc::new(FakeFootage::default()),
                narration: Arc::new(FakeNarration::default()),
                music: Arc::new(FakeMusic::failing_first(music_failures)),
            }
        }

        async fn assembler(&self) -> VideoAssembler {
            let cache = Arc::new(AssetCache::open(&self.config.cache_path).await.unwrap());
            let probe = Arc::new(FixedProbe::new(1920, 1080, 25.0));
            let scenes = SceneRenderer::new(
                FrameActionProfiler::new(Arc::new(ScriptedDecoder::moving_dot(150))),
                self.transcoder.clone(),
                probe.clone(),
                &self.config.work_dir,
                &self.config.encoding,
            );
            let providers = Providers {
                footage: self.footage.clone(),
                narration: self.narration.clone(),
                music: Some(self.music.clone()),
            };
            VideoAssembler::new(
                self.config.clone(),
                cache,
                providers,
                scenes,
                self.transcoder.clone(),
                probe,
            )
        }
    }

    fn script(scenes: Vec<Scene>, with_music: bool) -> Script {
        Script {
            title: "Lions of the Savanna".to_string(),
            scenes,
            soundtrack_prompt: with_music.then(|| SoundtrackPrompt::new("calm", "slow", "ambient")),
        }
    }

    #[tokio::test]
    async fn test_skips_incomplete_and_failing_scenes() {
        let h = Harness::new(0);
        let assembler = h.assembler().await;
        let script = script(
            vec![
                Scene::new("Lions rule the plains.", &["lion", "plains"]),
                Scene {
                    message: Some("No keywords here.".to_string()),
                    keywords: None,
                },
                Scene::new("Nothing to see.", &["missing"]),
                Scene::new("Cubs play at dusk.", &["cub", "dusk"]),
            ],
            true,
        );

        let assembly = assembler.assemble(&script).await.unwrap();

        assert_eq!(assembly.scenes_rendered, 2);
        assert_eq!(assembly.scenes_skipped, 2);
        assert!(assembly.with_music);
        assert_eq!(
            assembly.output,
            h.config.renderings_dir.join("lions_of_the_savanna.mp4")
        );
        assert!(assembly.output.exists());
        assert!(!h.config.work_dir.join(SCENES_FILE_NAME).exists());

        let calls = h.transcoder.calls();
        assert!(calls.contains(&"concat 2".to_string()), "{:?}", calls);
        let tail: Vec<&str> = calls.iter().rev().take(3).map(String::as_str).collect();
        assert_eq!(tail, vec!["mix", "trim 8 0.3", "normalize"]);
    }

    #[tokio::test]
    async fn test_no_renderable_scene_is_an_error() {
        let h = Harness::new(0);
        let assembler = h.assembler().await;
        let script = script(vec![Scene::new("Nothing.", &["missing"])], true);

        let err = assembler.assemble(&script).await.unwrap_err();
        assert!(matches!(err, WorkerError::NoScenes));
    }

    #[tokio::test]
    async fn test_second_run_reuses_cached_assets() {
        let h = Harness::new(0);
        let script = script(vec![Scene::new("Lions rule the plains.", &["lion", "plains"])], true);

        h.assembler().await.assemble(&script).await.unwrap();
        h.assembler().await.assemble(&script).await.unwrap();

        assert_eq!(h.narration.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.footage.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.music.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_music_moves_to_next_candidate() {
        let h = Harness::new(2);
        let assembler = h.assembler().await;
        let script = script(vec![Scene::new("Lions rule the plains.", &["lion"])], true);

        let assembly = assembler.assemble(&script).await.unwrap();

        assert!(assembly.with_music);
        assert_eq!(h.music.calls.load(Ordering::SeqCst), 3);
        assert!(h.config.music_dir.join("calm_2.mp3").exists());
    }

    #[tokio::test]
    async fn test_exhausted_music_candidates_render_without_music() {
        let h = Harness::new(10);
        let assembler = h.assembler().await;
        let script = script(vec![Scene::new("Lions rule the plains.", &["lion"])], true);

        let assembly = assembler.assemble(&script).await.unwrap();

        assert!(!assembly.with_music);
        assert!(assembly.output.exists());
        assert_eq!(
            h.music.calls.load(Ordering::SeqCst),
            h.config.music_max_candidates
        );
        assert!(!h.transcoder.calls().contains(&"mix".to_string()));
    }

    #[tokio::test]
    async fn test_prepare_removes_previous_run_files() {
        let h = Harness::new(0);
        let assembler = h.assembler().await;
        let work = &h.config.work_dir;
        std::fs::create_dir_all(work).unwrap();
        for name in [VIDEO_FILE_NAME, SCENES_FILE_NAME, "merged_abc.mp4", "convertedFps_x.mp4", "lion.mp4"] {
            std::fs::write(work.join(name), b"").unwrap();
        }

        assembler.prepare().await.unwrap();

        assert!(!work.join(VIDEO_FILE_NAME).exists());
        assert!(!work.join(SCENES_FILE_NAME).exists());
        assert!(!work.join("merged_abc.mp4").exists());
        assert!(!work.join("convertedFps_x.mp4").exists());
        assert!(work.join("lion.mp4").exists());
    }

    #[tokio::test]
    async fn test_general_keyword_joins_footage_search() {
        let mut h = Harness::new(0);
        h.config.general_keyword = Some("Lion".to_string());
        let assembler = h.assembler().await;
        let script = script(vec![Scene::new("Dusk falls.", &["dusk"])], false);

        let assembly = assembler.assemble(&script).await.unwrap();

        assert!(!assembly.with_music);
        assert!(h.config.work_dir.join("dusk_lion.mp4").exists());
    }
}
