//! Burns one caption per narrated scene into the rendered video.
//!
//! Scene timing is an approximation: the provider does not report where
//! each clip starts, so the video's total duration is divided among the
//! narrated scenes (equally by default, or by word count). Silent scenes
//! get no window and do not count toward the split. When the video opens
//! with a spoken introduction, that text takes the first window so the
//! scene captions line up with their clips. Windows are gapless, never
//! overlap, and the last one ends exactly at the video's end.

use crate::error::SubtitleError;
use crate::script::TrainingScript;
use crate::srt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleTiming {
    #[default]
    EqualSlice,
    WordPaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub cues: Vec<Cue>,
}

impl SubtitleTrack {
    /// Splits `total` across the narrated scenes of `script`, in order.
    pub fn for_script(
        script: &TrainingScript,
        total: Duration,
        timing: SubtitleTiming,
    ) -> Result<Self, SubtitleError> {
        Self::with_intro(script, None, total, timing)
    }

    /// Like [`SubtitleTrack::for_script`], with `intro` as the first cue.
    pub fn with_intro(
        script: &TrainingScript,
        intro: Option<&str>,
        total: Duration,
        timing: SubtitleTiming,
    ) -> Result<Self, SubtitleError> {
        if !script.has_narration() {
            return Err(SubtitleError::NothingToCaption);
        }
        let narrated: Vec<&str> = intro
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .into_iter()
            .chain(script.narrated_scenes().map(|s| s.narration.trim()))
            .collect();
        Self::for_narrations(&narrated, total, timing)
    }

    /// One cue per text, in order.
    pub fn for_narrations(
        narrated: &[&str],
        total: Duration,
        timing: SubtitleTiming,
    ) -> Result<Self, SubtitleError> {
        if narrated.is_empty() {
            return Err(SubtitleError::NothingToCaption);
        }
        if total.is_zero() {
            return Err(SubtitleError::InvalidDuration(0.0));
        }

        let weights: Vec<u128> = match timing {
            SubtitleTiming::EqualSlice => vec![1; narrated.len()],
            SubtitleTiming::WordPaced => narrated
                .iter()
                .map(|text| text.split_whitespace().count().max(1) as u128)
                .collect(),
        };
        let sum: u128 = weights.iter().sum();
        let total_nanos = total.as_nanos();

        let mut cues = Vec::with_capacity(narrated.len());
        let mut acc = 0u128;
        let mut start = Duration::ZERO;
        for (i, (text, weight)) in narrated.iter().zip(&weights).enumerate() {
            acc += weight;
            let end = if i + 1 == narrated.len() {
                total
            } else {
                nanos_to_duration(total_nanos * acc / sum)
            };
            cues.push(Cue {
                start,
                end,
                text: text.to_string(),
            });
            start = end;
        }

        Ok(Self { cues })
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / 1_000_000_000) as u64;
    let sub = (nanos % 1_000_000_000) as u32;
    Duration::new(secs, sub)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionStyle {
    pub font_size: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self { font_size: 28 }
    }
}

/// Media toolchain used to measure and re-encode the video.
#[async_trait]
pub trait MediaRenderer: Send + Sync {
    async fn duration(&self, video: &Path) -> Result<Duration, SubtitleError>;

    async fn burn_in(
        &self,
        video: &Path,
        cue_file: &Path,
        out: &Path,
        style: &CaptionStyle,
    ) -> Result<(), SubtitleError>;
}

pub struct SubtitleCompositor<R> {
    renderer: R,
    timing: SubtitleTiming,
    style: CaptionStyle,
}

impl<R: MediaRenderer> SubtitleCompositor<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            timing: SubtitleTiming::default(),
            style: CaptionStyle::default(),
        }
    }

    pub fn with_timing(mut self, timing: SubtitleTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_style(mut self, style: CaptionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Returns the captioned video, or `video` untouched if any step fails.
    /// `intro` is the narration of a clip that precedes the scenes.
    pub async fn burn_in(
        &self,
        video: &Path,
        script: &TrainingScript,
        intro: Option<&str>,
    ) -> PathBuf {
        match self.try_burn_in(video, script, intro).await {
            Ok(out) => {
                info!("subtitled video written: {}", out.display());
                out
            }
            Err(err) => {
                warn!("subtitles skipped for {}: {}", video.display(), err);
                video.to_path_buf()
            }
        }
    }

    pub async fn try_burn_in(
        &self,
        video: &Path,
        script: &TrainingScript,
        intro: Option<&str>,
    ) -> Result<PathBuf, SubtitleError> {
        let total = self.renderer.duration(video).await?;
        let track = SubtitleTrack::with_intro(script, intro, total, self.timing)?;
        info!(
            "captioning {} scenes over {:.2}s",
            track.cues.len(),
            total.as_secs_f64()
        );

        let cue_file = video.with_extension("srt");
        srt::write_cue_file(&cue_file, &track).await?;

        let out = subtitled_path(video);
        self.renderer
            .burn_in(video, &cue_file, &out, &self.style)
            .await?;
        if tokio::fs::metadata(&out).await.is_err() {
            return Err(SubtitleError::Tool {
                tool: "ffmpeg",
                detail: format!("no output at {}", out.display()),
            });
        }
        Ok(out)
    }
}

/// `dir/name.mp4` becomes `dir/name_subtitled.mp4`.
pub fn subtitled_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let ext = video
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    video.with_file_name(format!("{stem}_subtitled.{ext}"))
}
