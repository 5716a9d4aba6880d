//! Render job submission, polling and artifact download.

use crate::api::probe::is_absolute_url;
use crate::error::RenderError;
use crate::lang::Language;
use crate::retry::{CancelToken, RetryPolicy};
use crate::script::TrainingScript;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{info, warn};

/// Presenters a run may be assigned; one is picked per submission.
pub const PRESENTERS: &[&str] = &[
    "anna_costume1_cameraA",
    "jack_costume2_cameraA",
    "laura_costume1_cameraA",
    "mike_costume1_cameraA",
];

pub const DEFAULT_BACKGROUND: &str = "off_white";

const DEFAULT_TITLE: &str = "Formation IA";

/// Write buffer for downloads; bounds memory regardless of file size.
pub const DOWNLOAD_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarSettings {
    pub horizontal_align: &'static str,
    pub style: &'static str,
    pub scale: f32,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            horizontal_align: "center",
            style: "rectangular",
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub script_text: String,
    pub avatar: String,
    pub background: String,
    pub avatar_settings: AvatarSettings,
}

impl Clip {
    fn new(text: &str, avatar: &str, background: &str) -> Self {
        Self {
            script_text: text.trim().to_string(),
            avatar: avatar.to_string(),
            background: background.to_string(),
            avatar_settings: AvatarSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRequest {
    pub test: bool,
    pub title: String,
    pub description: String,
    pub visibility: &'static str,
    pub input: Vec<Clip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Complete,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderJob {
    #[serde(rename = "id")]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(rename = "download", default)]
    pub download_url: Option<String>,
}

/// The rendering provider as the job client sees it.
#[async_trait]
pub trait RenderApi: Send + Sync {
    fn has_credentials(&self) -> bool;

    /// Submits the job and returns its id.
    async fn create_video(&self, request: &VideoRequest) -> Result<String, RenderError>;

    async fn video_status(&self, job_id: &str) -> Result<RenderJob, RenderError>;

    /// Streams the artifact at `url` into `sink`, returning bytes written.
    async fn download_into(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, RenderError>;

    /// Page where a person can check on the job manually.
    fn status_page(&self, job_id: &str) -> String;
}

/// How polling ended.
#[derive(Debug)]
pub enum RenderOutcome {
    Ready(String),
    Failed,
    MissingArtifact,
    TimedOut { attempts: u32 },
    Cancelled,
    Unavailable(RenderError),
}

impl RenderOutcome {
    pub fn into_result(self, job_id: &str) -> Result<String, RenderError> {
        let job_id = job_id.to_string();
        match self {
            RenderOutcome::Ready(url) => Ok(url),
            RenderOutcome::Failed => Err(RenderError::Failed { job_id }),
            RenderOutcome::MissingArtifact => Err(RenderError::MissingArtifact { job_id }),
            RenderOutcome::TimedOut { attempts } => Err(RenderError::Timeout { job_id, attempts }),
            RenderOutcome::Cancelled => Err(RenderError::Cancelled),
            RenderOutcome::Unavailable(err) => Err(err),
        }
    }
}

pub struct RenderJobClient<A> {
    api: A,
    policy: RetryPolicy,
    rng: StdRng,
    intro_clip: bool,
    test_mode: bool,
}

impl<A: RenderApi> RenderJobClient<A> {
    pub fn new(api: A, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            rng: StdRng::from_entropy(),
            intro_clip: false,
            test_mode: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_intro_clip(mut self, enabled: bool) -> Self {
        self.intro_clip = enabled;
        self
    }

    pub fn with_test_mode(mut self, test: bool) -> Self {
        self.test_mode = test;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Text of the opening clip, in the script's detected language, when
    /// the intro is enabled.
    pub fn intro_narration(&self, script: &TrainingScript) -> Option<String> {
        if !self.intro_clip {
            return None;
        }
        let sample = format!("{} {}", script.title, script.objectives.join(" "));
        let language = Language::detect(&sample);
        Some(language.intro_narration(&script.title, &script.objectives))
    }

    /// One clip per narrated scene, in scene order, all with the same
    /// presenter. The intro clip, when enabled, comes first.
    pub fn build_request(&mut self, script: &TrainingScript) -> Result<VideoRequest, RenderError> {
        if !script.has_narration() {
            return Err(RenderError::Validation);
        }

        let presenter = PRESENTERS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(PRESENTERS[0]);

        let mut input = Vec::new();
        if let Some(text) = self.intro_narration(script) {
            input.push(Clip::new(&text, presenter, DEFAULT_BACKGROUND));
        }

        for scene in &script.scenes {
            if !scene.is_narrated() {
                info!("scene {} skipped: no narration", scene.index);
                continue;
            }
            let background = if is_absolute_url(scene.visual_descriptor.trim()) {
                scene.visual_descriptor.trim()
            } else {
                DEFAULT_BACKGROUND
            };
            input.push(Clip::new(&scene.narration, presenter, background));
        }

        let title = if script.title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            script.title.clone()
        };

        Ok(VideoRequest {
            test: self.test_mode,
            title,
            description: script.description.clone(),
            visibility: "private",
            input,
        })
    }

    pub async fn submit(&mut self, script: &TrainingScript) -> Result<String, RenderError> {
        if !self.api.has_credentials() {
            return Err(RenderError::Auth);
        }
        let request = self.build_request(script)?;
        info!(
            "submitting render job '{}' with {} clips (presenter {})",
            request.title,
            request.input.len(),
            request.input.first().map(|c| c.avatar.as_str()).unwrap_or_default()
        );

        let job_id = self.api.create_video(&request).await?;
        info!("render job created: {job_id}");
        Ok(job_id)
    }

    /// Queries the job until it reaches a terminal state, the attempt
    /// budget runs out, or `cancel` fires. The first query is immediate.
    pub async fn poll(&self, job_id: &str, cancel: &CancelToken) -> RenderOutcome {
        let max = self.policy.max_attempts;
        for attempt in 1..=max {
            if cancel.is_cancelled() {
                return RenderOutcome::Cancelled;
            }

            let status = tokio::select! {
                s = self.api.video_status(job_id) => s,
                _ = cancel.cancelled() => return RenderOutcome::Cancelled,
            };

            match status {
                Ok(job) => match job.status {
                    JobStatus::Complete => {
                        return match job.download_url.filter(|u| !u.trim().is_empty()) {
                            Some(url) => {
                                info!("render job {job_id} complete after {attempt} polls");
                                RenderOutcome::Ready(url)
                            }
                            None => {
                                warn!("render job {job_id} complete but has no download link");
                                RenderOutcome::MissingArtifact
                            }
                        };
                    }
                    JobStatus::Failed => {
                        warn!("render job {job_id} failed");
                        return RenderOutcome::Failed;
                    }
                    other => {
                        info!("render job {job_id}: {other:?} (attempt {attempt}/{max})");
                    }
                },
                Err(RenderError::Http(err)) => {
                    warn!(
                        "render job {job_id}: status query error (attempt {attempt}/{max}): {err}"
                    );
                }
                Err(err) => {
                    warn!("render job {job_id}: status query failed: {err}");
                    return RenderOutcome::Unavailable(err);
                }
            }

            if attempt < max && !self.policy.pause(cancel).await {
                return RenderOutcome::Cancelled;
            }
        }

        warn!("render job {job_id} still pending after {max} polls");
        RenderOutcome::TimedOut { attempts: max }
    }

    /// Streams the artifact to `dest`. The data lands in a `.part` file
    /// that is renamed only on success and removed on any failure.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelToken,
    ) -> Result<PathBuf, RenderError> {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = dest.with_extension("part");
        let file = fs::File::create(&partial).await?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_BYTES, file);

        let streamed = tokio::select! {
            r = self.api.download_into(url, &mut writer) => r,
            _ = cancel.cancelled() => Err(RenderError::Cancelled),
        };
        let result = match streamed {
            Ok(bytes) => writer.flush().await.map(|_| bytes).map_err(RenderError::from),
            Err(err) => Err(err),
        };
        drop(writer);

        match result {
            Ok(bytes) => {
                fs::rename(&partial, dest).await?;
                info!("downloaded {} bytes -> {}", bytes, dest.display());
                Ok(dest.to_path_buf())
            }
            Err(err) => {
                let _ = fs::remove_file(&partial).await;
                warn!("download of {url} failed: {err}");
                Err(match err {
                    RenderError::Cancelled => RenderError::Cancelled,
                    RenderError::Download(msg) => RenderError::Download(msg),
                    other => RenderError::Download(other.to_string()),
                })
            }
        }
    }

    pub fn status_page(&self, job_id: &str) -> String {
        self.api.status_page(job_id)
    }
}
