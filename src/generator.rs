//! The script-to-video pipeline: extract and validate the proposer's
//! document, resolve scene visuals, render, download, then caption.

use crate::api::synthesia::SynthesiaClient;
use crate::api::{ScriptProposer, http_client};
use crate::config::Config;
use crate::error::{ConfigError, PipelineError, RenderError, Result};
use crate::ffmpeg::Ffmpeg;
use crate::render::{RenderApi, RenderJobClient, RenderOutcome};
use crate::retry::{CancelToken, RetryPolicy};
use crate::script::TrainingScript;
use crate::subtitle::{CaptionStyle, MediaRenderer, SubtitleCompositor};
use crate::visuals::VisualResolver;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Longest silence tolerated on any connection, downloads included.
const HTTP_READ_TIMEOUT_SECS: u64 = 120;

/// Where a run ended. Every variant carries something to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Captioned(PathBuf),
    Uncaptioned(PathBuf),
    /// Rendered, but the artifact could not be fetched.
    RemoteOnly(String),
    /// Not finished in time; check the status page later.
    Pending(String),
    RenderFailed(String),
    Cancelled,
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineOutcome::Captioned(p) => write!(f, "captioned video: {}", p.display()),
            PipelineOutcome::Uncaptioned(p) => write!(f, "video (no subtitles): {}", p.display()),
            PipelineOutcome::RemoteOnly(url) => write!(f, "video available remotely: {url}"),
            PipelineOutcome::Pending(url) => write!(f, "render still in progress, check {url}"),
            PipelineOutcome::RenderFailed(reason) => write!(f, "render failed: {reason}"),
            PipelineOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub struct Pipeline<A, R> {
    resolver: VisualResolver,
    render: RenderJobClient<A>,
    compositor: Option<SubtitleCompositor<R>>,
    output_dir: PathBuf,
}

impl Pipeline<SynthesiaClient, Ffmpeg> {
    /// Production wiring. Fails before any network call when the render
    /// credential is missing.
    pub fn from_config(cfg: &Config) -> std::result::Result<Self, ConfigError> {
        let key = cfg.render_key()?;
        let client = http_client(Duration::from_secs(HTTP_READ_TIMEOUT_SECS))?;

        let api = SynthesiaClient::new(client.clone(), key, cfg.render.api_base.clone());
        let policy = RetryPolicy::new(cfg.render.max_poll_attempts, cfg.poll_interval());
        let render = RenderJobClient::new(api, policy)
            .with_intro_clip(cfg.render.intro_clip)
            .with_test_mode(cfg.render.test_mode);

        let compositor = cfg.subtitles.enabled.then(|| {
            SubtitleCompositor::new(Ffmpeg::new())
                .with_timing(cfg.subtitles.timing)
                .with_style(CaptionStyle {
                    font_size: cfg.subtitles.font_size,
                })
        });

        Ok(Pipeline::new(
            VisualResolver::from_config(cfg, &client),
            render,
            cfg.output_dir.clone(),
        )
        .with_compositor(compositor))
    }
}

impl<A: RenderApi, R: MediaRenderer> Pipeline<A, R> {
    pub fn new(
        resolver: VisualResolver,
        render: RenderJobClient<A>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            render,
            compositor: None,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_compositor(mut self, compositor: Option<SubtitleCompositor<R>>) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.render = self.render.with_seed(seed);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Asks `proposer` for a script, then runs it.
    pub async fn generate(
        &mut self,
        proposer: &dyn ScriptProposer,
        request: &str,
        cancel: &CancelToken,
    ) -> Result<(TrainingScript, PipelineOutcome)> {
        let raw = proposer.propose(request).await?;
        self.run(&raw, cancel).await
    }

    /// Parses raw proposer output and runs the resulting script.
    pub async fn run(
        &mut self,
        raw: &str,
        cancel: &CancelToken,
    ) -> Result<(TrainingScript, PipelineOutcome)> {
        let mut script = TrainingScript::from_response(raw)?;
        let outcome = self.run_script(&mut script, cancel).await?;
        Ok((script, outcome))
    }

    pub async fn run_script(
        &mut self,
        script: &mut TrainingScript,
        cancel: &CancelToken,
    ) -> Result<PipelineOutcome> {
        if !self.render.api().has_credentials() {
            return Err(missing_render_key());
        }

        info!("resolving visuals for {} scenes", script.scenes.len());
        self.resolver.resolve_all(script).await;
        if cancel.is_cancelled() {
            return Ok(PipelineOutcome::Cancelled);
        }

        let job_id = match self.render.submit(script).await {
            Ok(id) => id,
            Err(RenderError::Auth) => return Err(missing_render_key()),
            Err(err) => {
                error!("render submission failed: {err}");
                return Ok(PipelineOutcome::RenderFailed(err.to_string()));
            }
        };

        let url = match self.render.poll(&job_id, cancel).await {
            RenderOutcome::Ready(url) => url,
            RenderOutcome::Cancelled => return Ok(PipelineOutcome::Cancelled),
            RenderOutcome::Failed => {
                return Ok(PipelineOutcome::RenderFailed(format!("render job {job_id} failed")));
            }
            RenderOutcome::MissingArtifact
            | RenderOutcome::TimedOut { .. }
            | RenderOutcome::Unavailable(_) => {
                let page = self.render.status_page(&job_id);
                warn!("render job {job_id} has no artifact yet; follow up at {page}");
                return Ok(PipelineOutcome::Pending(page));
            }
        };

        let dest = self.output_dir.join(format!("training_{job_id}.mp4"));
        let video = match self.render.download(&url, &dest, cancel).await {
            Ok(path) => path,
            Err(RenderError::Cancelled) => return Ok(PipelineOutcome::Cancelled),
            Err(err) => {
                warn!("keeping remote link after download error: {err}");
                return Ok(PipelineOutcome::RemoteOnly(url));
            }
        };

        let Some(compositor) = &self.compositor else {
            return Ok(PipelineOutcome::Uncaptioned(video));
        };
        let intro = self.render.intro_narration(script);
        let captioned = compositor.burn_in(&video, script, intro.as_deref()).await;
        if captioned == video {
            Ok(PipelineOutcome::Uncaptioned(video))
        } else {
            Ok(PipelineOutcome::Captioned(captioned))
        }
    }
}

fn missing_render_key() -> PipelineError {
    PipelineError::Config(ConfigError::MissingCredential("SYNTHESIA_API_KEY"))
}

/// Builds the production pipeline from `cfg` and runs `raw` through it.
pub async fn run_pipeline(
    cfg: &Config,
    raw: &str,
    cancel: &CancelToken,
) -> Result<(TrainingScript, PipelineOutcome)> {
    let mut pipeline = Pipeline::from_config(cfg)?;
    pipeline.run(raw, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_messages_name_the_follow_up() {
        assert_eq!(
            PipelineOutcome::Pending("https://app.synthesia.io/video/j1".into()).to_string(),
            "render still in progress, check https://app.synthesia.io/video/j1"
        );
        assert_eq!(
            PipelineOutcome::Captioned(PathBuf::from("out/v_subtitled.mp4")).to_string(),
            "captioned video: out/v_subtitled.mp4"
        );
    }

    #[test]
    fn missing_key_fails_before_wiring() {
        let cfg = Config::default();
        assert!(matches!(
            Pipeline::from_config(&cfg),
            Err(ConfigError::MissingCredential("SYNTHESIA_API_KEY"))
        ));
    }

    #[tokio::test]
    async fn run_pipeline_rejects_missing_key_before_parsing() {
        let err = run_pipeline(&Config::default(), "not json", &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn subtitles_can_be_disabled() {
        let mut cfg = Config::default();
        cfg.render_key = Some("k".into());
        cfg.subtitles.enabled = false;
        let pipeline = Pipeline::from_config(&cfg).unwrap();
        assert!(pipeline.compositor.is_none());
        assert_eq!(pipeline.output_dir(), Path::new("output"));
    }
}
