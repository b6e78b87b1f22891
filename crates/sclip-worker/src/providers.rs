//! Asset providers.
//!
//! Footage search, speech synthesis and music search are external programs.
//! The pipeline only sees these traits; the command-backed implementations
//! spawn a configured program and watch for the file it produces.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sclip_media::download_watch::{downloaded_file, snapshot_dir, DownloadWatch};
use sclip_media::fs_utils::move_file;
use sclip_models::{to_snake_case, AsyncJobHandle, JobState, SoundtrackPrompt};

use crate::error::{WorkerError, WorkerResult};
use crate::retry::{poll_job, JobPoll, JobStatusSource, PollConfig};

/// Finds and downloads a footage clip for a keyword set.
#[async_trait]
pub trait FootageProvider: Send + Sync {
    async fn fetch(&self, keywords: &[String], dir: &Path) -> WorkerResult<PathBuf>;
}

/// Synthesizes narration audio (WAV) for a text.
#[async_trait]
pub trait NarrationProvider: Send + Sync {
    async fn synthesize(&self, text: &str, dir: &Path) -> WorkerResult<PathBuf>;
}

/// Downloads the `candidate`-th music track matching a prompt.
#[async_trait]
pub trait MusicProvider: Send + Sync {
    async fn fetch(
        &self,
        prompt: &SoundtrackPrompt,
        candidate: u32,
        dir: &Path,
    ) -> WorkerResult<PathBuf>;
}

/// A configured command line: program followed by fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Split a whitespace-separated command line.
    pub fn parse(line: &str) -> WorkerResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| WorkerError::config_error("empty provider command"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command<I, S>(&self, extra: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run<I, S>(&self, extra: I) -> WorkerResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        debug!(program = %self.program, "Running provider command");
        let output = self.command(extra).output().await.map_err(|e| {
            WorkerError::provider_failed(format!("cannot run {}: {}", self.program, e))
        })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(WorkerError::provider_failed(format!(
                "{} exited with {}: {}",
                self.program,
                describe_status(output.status),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Runs `<cmd> <dir> <keywords…>` and picks up the downloaded clip.
#[derive(Debug, Clone)]
pub struct CommandFootageProvider {
    command: CommandLine,
    watch: DownloadWatch,
}

impl CommandFootageProvider {
    pub fn new(command: CommandLine, watch: DownloadWatch) -> Self {
        Self { command, watch }
    }
}

#[async_trait]
impl FootageProvider for CommandFootageProvider {
    async fn fetch(&self, keywords: &[String], dir: &Path) -> WorkerResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let baseline = snapshot_dir(dir).await?;

        info!(keywords = %keywords.join(","), "Searching footage");
        let mut args = vec![dir.as_os_str().to_owned()];
        args.extend(keywords.iter().map(OsString::from));
        self.command.run(args).await?;

        self.watch.wait(dir, &baseline).await?;
        downloaded_file(dir, &baseline)
            .await?
            .ok_or_else(|| WorkerError::provider_failed("footage download produced no file"))
    }
}

/// Speech job backed by a spawned synthesizer process.
///
/// The job succeeds once the process exits cleanly and its output exists.
struct ProcessJob {
    child: Mutex<Child>,
    output: PathBuf,
}

impl ProcessJob {
    async fn state(&self) -> WorkerResult<(JobState, Option<String>)> {
        let mut child = self.child.lock().await;
        let Some(status) = child.try_wait()? else {
            return Ok((JobState::Pending, None));
        };
        if !status.success() {
            return Ok((
                JobState::Failed,
                Some(format!("synthesizer exited with {}", describe_status(status))),
            ));
        }
        if tokio::fs::try_exists(&self.output).await.unwrap_or(false) {
            Ok((JobState::Succeeded, None))
        } else {
            Ok((
                JobState::Failed,
                Some("synthesizer exited without writing output".to_string()),
            ))
        }
    }
}

#[async_trait]
impl JobStatusSource for ProcessJob {
    type Output = PathBuf;

    async fn poll_status(&self, handle: &AsyncJobHandle) -> WorkerResult<JobPoll<PathBuf>> {
        let (state, reason) = self.state().await?;
        debug!(job = %handle, state = %state, "Polled speech job");
        Ok(match state {
            JobState::Pending => JobPoll::Pending,
            JobState::Succeeded => JobPoll::Succeeded(PathBuf::from(&handle.locator)),
            JobState::Failed => JobPoll::Failed(reason.unwrap_or_else(|| state.to_string())),
        })
    }
}

/// Spawns `<cmd> <text> <out.wav>` and polls it to completion.
#[derive(Debug, Clone)]
pub struct CommandNarrationProvider {
    command: CommandLine,
    poll: PollConfig,
    warmup: Duration,
}

impl CommandNarrationProvider {
    pub fn new(command: CommandLine, poll: PollConfig, warmup: Duration) -> Self {
        Self {
            command,
            poll,
            warmup,
        }
    }
}

#[async_trait]
impl NarrationProvider for CommandNarrationProvider {
    async fn synthesize(&self, text: &str, dir: &Path) -> WorkerResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let id = Uuid::new_v4().simple().to_string();
        let output = dir.join(format!("{}.wav", id));

        let child = self
            .command
            .command([OsStr::new(text), output.as_os_str()])
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| WorkerError::provider_failed(format!("cannot start synthesizer: {}", e)))?;

        let handle = AsyncJobHandle::new(id, output.to_string_lossy());
        info!(job = %handle, "Speech job submitted");

        let job = ProcessJob {
            child: Mutex::new(child),
            output,
        };

        if !self.warmup.is_zero() {
            tokio::time::sleep(self.warmup).await;
        }
        poll_job(&job, &handle, &self.poll).await
    }
}

/// Runs `<cmd> <dir> <mood> <tempo> <genre> <candidate>`, then renames the
/// downloaded track to a snake_case name.
#[derive(Debug, Clone)]
pub struct CommandMusicProvider {
    command: CommandLine,
    watch: DownloadWatch,
}

impl CommandMusicProvider {
    pub fn new(command: CommandLine, watch: DownloadWatch) -> Self {
        Self { command, watch }
    }
}

#[async_trait]
impl MusicProvider for CommandMusicProvider {
    async fn fetch(
        &self,
        prompt: &SoundtrackPrompt,
        candidate: u32,
        dir: &Path,
    ) -> WorkerResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let baseline = snapshot_dir(dir).await?;

        info!(
            mood = %prompt.mood,
            tempo = %prompt.tempo,
            genre = %prompt.genre,
            candidate,
            "Searching music"
        );
        let candidate_arg = candidate.to_string();
        let args = [
            dir.as_os_str(),
            OsStr::new(&prompt.mood),
            OsStr::new(&prompt.tempo),
            OsStr::new(&prompt.genre),
            OsStr::new(&candidate_arg),
        ];
        self.command.run(args).await?;
        self.watch.wait(dir, &baseline).await?;

        let downloaded = downloaded_file(dir, &baseline)
            .await?
            .ok_or_else(|| WorkerError::provider_failed("music download produced no file"))?;
        snake_case_rename(&downloaded).await
    }
}

async fn snake_case_rename(path: &Path) -> WorkerResult<PathBuf> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut renamed = path.with_file_name(to_snake_case(&stem));
    if let Some(ext) = path.extension() {
        renamed.set_extension(ext);
    }
    if renamed == path {
        return Ok(renamed);
    }
    if tokio::fs::try_exists(&renamed).await.unwrap_or(false) {
        warn!(path = %renamed.display(), "Snake-case name taken, keeping download name");
        return Ok(path.to_path_buf());
    }
    move_file(path, &renamed).await?;
    Ok(renamed)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> CommandLine {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        CommandLine::parse(&format!("sh {}", path.display())).unwrap()
    }

    fn quick_watch() -> DownloadWatch {
        DownloadWatch {
            start_timeout: Duration::from_millis(200),
            start_poll: Duration::from_millis(10),
            completion_timeout: Duration::from_millis(200),
            completion_poll: Duration::from_millis(10),
        }
    }

    fn quick_poll(attempts: u32) -> PollConfig {
        PollConfig::new("speech synthesis")
            .with_max_attempts(attempts)
            .with_initial_delay(Duration::from_millis(20))
            .with_backoff_increment(Duration::from_millis(5))
    }

    #[test]
    fn test_parse_command_line() {
        let cmd = CommandLine::parse("  python3 fetch.py --fast ").unwrap();
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args, vec!["fetch.py", "--fast"]);
        assert!(CommandLine::parse("   ").is_err());
    }

    #[tokio::test]
    async fn test_footage_provider_returns_downloaded_clip() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(&scripts, "footage.sh", "printf x > \"$1/$2_$3.mp4\"\n");

        let provider = CommandFootageProvider::new(cmd, quick_watch());
        let clip = provider
            .fetch(&["lion".to_string(), "savanna".to_string()], out.path())
            .await
            .unwrap();

        assert_eq!(clip, out.path().join("lion_savanna.mp4"));
    }

    #[tokio::test]
    async fn test_footage_provider_keeps_server_timestamp_clip() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::fs::write(out.path().join("merged_prev.mp4"), b"scene").unwrap();
        let cmd = script(
            &scripts,
            "footage.sh",
            "printf x > \"$1/$2.mp4\"\ntouch -t 200001010000 \"$1/$2.mp4\"\n",
        );

        let provider = CommandFootageProvider::new(cmd, quick_watch());
        let clip = provider.fetch(&["ocean".to_string()], out.path()).await.unwrap();

        assert_eq!(clip, out.path().join("ocean.mp4"));
    }

    #[tokio::test]
    async fn test_footage_provider_times_out_without_download() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(&scripts, "footage.sh", "exit 0\n");

        let provider = CommandFootageProvider::new(cmd, quick_watch());
        let err = provider.fetch(&["lion".to_string()], out.path()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_footage_provider_reports_command_failure() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(&scripts, "footage.sh", "echo 'no results' >&2\nexit 4\n");

        let provider = CommandFootageProvider::new(cmd, quick_watch());
        let err = provider.fetch(&["lion".to_string()], out.path()).await.unwrap_err();
        match err {
            WorkerError::ProviderFailed(msg) => {
                assert!(msg.contains("code 4"));
                assert!(msg.contains("no results"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_narration_provider_polls_until_written() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(&scripts, "tts.sh", "sleep 0.05\nprintf RIFF > \"$2\"\n");

        let provider = CommandNarrationProvider::new(cmd, quick_poll(50), Duration::ZERO);
        let wav = provider.synthesize("Hello there", out.path()).await.unwrap();

        assert!(wav.starts_with(out.path()));
        assert_eq!(std::fs::read(&wav).unwrap(), b"RIFF");
    }

    #[tokio::test]
    async fn test_narration_failure_is_terminal() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(&scripts, "tts.sh", "exit 2\n");

        let provider = CommandNarrationProvider::new(cmd, quick_poll(50), Duration::from_millis(50));
        let err = provider.synthesize("Hello", out.path()).await.unwrap_err();
        assert!(matches!(err, WorkerError::JobFailed(_)));
    }

    #[tokio::test]
    async fn test_narration_gives_up_after_budget() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(&scripts, "tts.sh", "sleep 5\n");

        let provider = CommandNarrationProvider::new(cmd, quick_poll(3), Duration::ZERO);
        let err = provider.synthesize("Hello", out.path()).await.unwrap_err();
        assert!(matches!(err, WorkerError::MaxRetriesExceeded { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_music_provider_renames_to_snake_case() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let cmd = script(
            &scripts,
            "music.sh",
            "printf x > \"$1/Calm Waters $5.mp3\"\n",
        );

        let provider = CommandMusicProvider::new(cmd, quick_watch());
        let prompt = SoundtrackPrompt::new("calm", "slow", "ambient");
        let track = provider.fetch(&prompt, 1, out.path()).await.unwrap();

        assert_eq!(track, out.path().join("calm_waters_1.mp3"));
        assert!(track.exists());
    }

    #[tokio::test]
    async fn test_music_provider_ignores_earlier_tracks() {
        let scripts = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::fs::write(out.path().join("older_pick.mp3"), b"old").unwrap();
        let cmd = script(
            &scripts,
            "music.sh",
            "printf x > \"$1/Night Drive.mp3\"\ntouch -t 200001010000 \"$1/Night Drive.mp3\"\n",
        );

        let provider = CommandMusicProvider::new(cmd, quick_watch());
        let prompt = SoundtrackPrompt::new("dark", "fast", "synthwave");
        let track = provider.fetch(&prompt, 0, out.path()).await.unwrap();

        assert_eq!(track, out.path().join("night_drive.mp3"));
    }
}
