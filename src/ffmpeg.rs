use crate::error::SubtitleError;
use crate::subtitle::{CaptionStyle, MediaRenderer};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// `ffprobe`/`ffmpeg` on the PATH.
#[derive(Debug, Clone, Default)]
pub struct Ffmpeg;

impl Ffmpeg {
    pub fn new() -> Self {
        Self
    }
}

async fn run_cmd(tool: &'static str, args: &[String]) -> Result<String, SubtitleError> {
    debug!("{} {}", tool, args.join(" "));
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|e| SubtitleError::Tool {
            tool,
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SubtitleError::Tool {
            tool,
            detail: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn parse_duration(text: &str) -> Result<Duration, SubtitleError> {
    let secs = text.trim().parse::<f64>().unwrap_or(-1.0);
    if !secs.is_finite() || secs <= 0.1 {
        return Err(SubtitleError::InvalidDuration(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Quotes a path for use inside a filtergraph argument.
pub fn escape_filter_path(path: &Path) -> String {
    let mut out = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("\\'"),
            ',' => out.push_str("\\,"),
            '[' => out.push_str("\\["),
            ']' => out.push_str("\\]"),
            _ => out.push(c),
        }
    }
    out
}

pub fn subtitles_filter(cue_file: &Path, style: &CaptionStyle) -> String {
    format!(
        "subtitles={}:force_style='Fontsize={},OutlineColour=&H000000&,Outline=2'",
        escape_filter_path(cue_file),
        style.font_size
    )
}

#[async_trait]
impl MediaRenderer for Ffmpeg {
    async fn duration(&self, video: &Path) -> Result<Duration, SubtitleError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            video.display().to_string(),
        ];
        let text = run_cmd("ffprobe", &args).await?;
        parse_duration(&text)
    }

    async fn burn_in(
        &self,
        video: &Path,
        cue_file: &Path,
        out: &Path,
        style: &CaptionStyle,
    ) -> Result<(), SubtitleError> {
        let args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            video.display().to_string(),
            "-vf".to_string(),
            subtitles_filter(cue_file, style),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            "22".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            out.display().to_string(),
        ];
        run_cmd("ffmpeg", &args).await?;
        Ok(())
    }
}
