use crate::config::Config;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Saved scripts and teleprompter exports go here, under the output dir.
pub const SCRIPTS_SUBDIR: &str = "scripts";

pub fn scripts_dir(cfg: &Config) -> PathBuf {
    cfg.output_dir.join(SCRIPTS_SUBDIR)
}

pub async fn ensure_directories(cfg: &Config) -> std::io::Result<()> {
    for dir in [cfg.output_dir.clone(), scripts_dir(cfg)] {
        if !Path::new(&dir).exists() {
            fs::create_dir_all(&dir).await?;
            info!("created directory: {}", dir.display());
        }
    }
    Ok(())
}

/// Whether `ffmpeg` is callable; without it subtitles are skipped.
pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_output_and_scripts_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config {
            output_dir: tmp.path().join("out"),
            ..Config::default()
        };
        ensure_directories(&cfg).await.unwrap();
        assert!(cfg.output_dir.is_dir());
        assert!(scripts_dir(&cfg).is_dir());

        // Second call is a no-op.
        ensure_directories(&cfg).await.unwrap();
    }
}
