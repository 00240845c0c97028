//! Sequential driver: one narrated video per eligible file in a directory.

use crate::api::{SpeechSynthesizer, TextGenerator};
use crate::config::Config;
use crate::error::PipelineError;
use crate::ffmpeg::{ComposeRequest, VideoComposer};
use crate::subtitle;
use crate::{logi, logok, logw};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

const MAX_SEED: u64 = 10_000;

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub video_extensions: Vec<String>,
    pub audio_dir: PathBuf,
    pub stop_on_first_failure: bool,
    pub skip_previous_outputs: bool,
    pub rng_seed: Option<u64>,
}

impl BatchOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            video_extensions: cfg.video_extensions.clone(),
            audio_dir: cfg.audio_dir.clone(),
            stop_on_first_failure: cfg.stop_on_first_failure,
            skip_previous_outputs: cfg.skip_previous_outputs,
            rng_seed: cfg.rng_seed,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            video_extensions: vec!["mp4".to_string(), "mov".to_string(), "avi".to_string()],
            audio_dir: PathBuf::from("."),
            stop_on_first_failure: false,
            skip_previous_outputs: false,
            rng_seed: None,
        }
    }
}

/// One unit of work: a source video, where its results go, and its seed.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTask {
    pub index: usize,
    pub video_path: PathBuf,
    pub output_path: PathBuf,
    pub audio_path: PathBuf,
    pub seed: u64,
}

#[derive(Debug)]
pub struct TaskOutcome {
    pub task: VideoTask,
    pub result: Result<PathBuf, PipelineError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks never started because an earlier one failed under `stop_on_first_failure`.
    pub not_attempted: Vec<VideoTask>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.not_attempted.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// True for names this driver itself writes, `output_<n>_<original>`.
fn is_previous_output(file_name: &str) -> bool {
    let Some(rest) = file_name.strip_prefix("output_") else {
        return false;
    };
    match rest.split_once('_') {
        Some((index, original)) => {
            !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) && !original.is_empty()
        }
        None => false,
    }
}

/// Lists eligible videos directly inside `dir`, sorted by file name.
///
/// Eligibility is the extension allow-list alone unless `skip_previous_outputs`
/// is set.
pub fn discover_videos(
    dir: &Path,
    extensions: &[String],
    skip_previous_outputs: bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::MediaIo(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PipelineError::media(format!("read dir {}", dir.display()), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_allowed_extension(path, extensions) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if skip_previous_outputs && is_previous_output(&name) {
            logi(format!("Skipping {} (output of an earlier run)", name));
            continue;
        }
        out.push(path.to_path_buf());
    }
    Ok(out)
}

/// Assigns indices, output/audio paths and seeds to discovered videos.
pub fn plan_tasks(
    dir: &Path,
    videos: Vec<PathBuf>,
    audio_dir: &Path,
    rng: &mut StdRng,
) -> Vec<VideoTask> {
    videos
        .into_iter()
        .enumerate()
        .map(|(index, video_path)| {
            let file_name = video_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            VideoTask {
                index,
                output_path: dir.join(format!("output_{}_{}", index, file_name)),
                audio_path: audio_dir.join(format!("narrative_{}.mp3", index)),
                seed: rng.gen_range(0..=MAX_SEED),
                video_path,
            }
        })
        .collect()
}

pub struct BatchDriver {
    generator: Box<dyn TextGenerator>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    composer: Box<dyn VideoComposer>,
    options: BatchOptions,
}

impl BatchDriver {
    pub fn new(
        generator: Box<dyn TextGenerator>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        composer: Box<dyn VideoComposer>,
        options: BatchOptions,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            composer,
            options,
        }
    }

    /// Narrate, synthesize, time and compose a single video.
    pub async fn process_video(&self, prompt: &str, task: &VideoTask) -> Result<PathBuf, PipelineError> {
        let video_name = task.video_path.display();

        let narrative = self.generator.generate(prompt, task.seed).await?;
        logi(format!("Generated narrative for {}:\n{}", video_name, narrative));

        let audio = self
            .synthesizer
            .synthesize(&narrative, &task.audio_path)
            .await?;
        logok(format!("Audio file saved as {}", audio.display()));

        let video_duration = self.composer.media_duration(&task.video_path).await?;
        let subtitles = subtitle::allocate(&narrative, video_duration)?;
        logi(format!(
            "Allocated {} subtitle words over {:.2}s",
            subtitles.len(),
            video_duration
        ));

        let request = ComposeRequest {
            video: &task.video_path,
            audio: &audio,
            subtitles: &subtitles,
            output: &task.output_path,
            video_duration,
        };
        let output = self.composer.compose(&request).await?;
        logok(format!("Output video saved as {}", output.display()));
        Ok(output)
    }

    pub async fn run(&self, prompt: &str, dir: &Path) -> Result<BatchReport, PipelineError> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }

        let videos = discover_videos(
            dir,
            &self.options.video_extensions,
            self.options.skip_previous_outputs,
        )?;
        if videos.is_empty() {
            logw(format!("No video files found in {}", dir.display()));
        }

        let mut rng = StdRng::seed_from_u64(self.options.rng_seed.unwrap_or_else(now_seed));
        let tasks = plan_tasks(dir, videos, &self.options.audio_dir, &mut rng);
        let total = tasks.len();

        let mut report = BatchReport::default();
        let mut pending = tasks.into_iter();
        while let Some(task) = pending.next() {
            logi(format!(
                "=== Processing {}/{}: {} (seed {}) ===",
                task.index + 1,
                total,
                task.video_path.display(),
                task.seed
            ));

            let result = self.process_video(prompt, &task).await;
            let failed = result.is_err();
            if let Err(err) = &result {
                logw(format!("FAILED: {}: {}", task.video_path.display(), err));
            }
            report.outcomes.push(TaskOutcome { task, result });

            if failed && self.options.stop_on_first_failure {
                report.not_attempted = pending.by_ref().collect();
                logw(format!(
                    "Stopping batch; {} video(s) not attempted.",
                    report.not_attempted.len()
                ));
                break;
            }
        }

        logi(format!(
            "All done. Succeeded: {}, failed: {}",
            report.succeeded().count(),
            report.failed().count()
        ));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        BatchOptions::default().video_extensions
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(has_allowed_extension(Path::new("a.mp4"), &exts()));
        assert!(has_allowed_extension(Path::new("b.MOV"), &exts()));
        assert!(has_allowed_extension(Path::new("c.avi"), &exts()));
        assert!(!has_allowed_extension(Path::new("d.mkv"), &exts()));
        assert!(!has_allowed_extension(Path::new("notes"), &exts()));
        assert!(has_allowed_extension(Path::new("e.mkv"), &[".mkv".to_string()]));
    }

    #[test]
    fn previous_outputs_are_recognised() {
        assert!(is_previous_output("output_0_beach.mp4"));
        assert!(is_previous_output("output_12_a_b.mov"));
        assert!(!is_previous_output("output_beach.mp4"));
        assert!(!is_previous_output("output_x_beach.mp4"));
        assert!(!is_previous_output("output_3_"));
        assert!(!is_previous_output("beach.mp4"));
    }

    #[test]
    fn discovery_filters_sorts_and_skips_subdirs_and_old_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.mov", "a.mp4", "notes.txt", "output_0_a.mp4", "c.AVI"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested.mp4")).unwrap();
        std::fs::write(tmp.path().join("nested.mp4").join("inner.mp4"), b"x").unwrap();

        let found = discover_videos(tmp.path(), &exts(), true).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mov", "c.AVI"]);
    }

    #[test]
    fn output_like_names_are_eligible_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["output_2020_trip.mp4", "a.mp4", "b.mov"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let found = discover_videos(tmp.path(), &exts(), false).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mov", "output_2020_trip.mp4"]);
    }

    #[test]
    fn discovery_of_missing_dir_is_media_error() {
        let err =
            discover_videos(Path::new("/nonexistent/dir/for/test"), &exts(), false).unwrap_err();
        assert!(matches!(err, PipelineError::MediaIo(_)));
    }

    #[test]
    fn planned_tasks_are_indexed_and_seeded_in_range() {
        let dir = Path::new("/videos");
        let videos = vec![dir.join("a.mp4"), dir.join("b.mov")];
        let mut rng = StdRng::seed_from_u64(7);
        let tasks = plan_tasks(dir, videos, Path::new("work"), &mut rng);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].output_path, dir.join("output_0_a.mp4"));
        assert_eq!(tasks[1].output_path, dir.join("output_1_b.mov"));
        assert_eq!(tasks[0].audio_path, Path::new("work").join("narrative_0.mp3"));
        assert_eq!(tasks[1].audio_path, Path::new("work").join("narrative_1.mp3"));
        assert!(tasks.iter().all(|t| t.seed <= MAX_SEED));
    }

    #[test]
    fn same_rng_seed_gives_same_plan() {
        let dir = Path::new("/videos");
        let videos = vec![dir.join("a.mp4"), dir.join("b.mp4"), dir.join("c.mp4")];
        let a = plan_tasks(dir, videos.clone(), dir, &mut StdRng::seed_from_u64(99));
        let b = plan_tasks(dir, videos, dir, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
