use crate::error::ConfigError;
use crate::subtitle::SubtitleTiming;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "synthesia_api_key", default)]
    pub render_key: Option<String>,
    #[serde(default)]
    pub pexels_key: Option<String>,
    #[serde(rename = "unsplash_access_key", default)]
    pub unsplash_key: Option<String>,
    #[serde(rename = "openai_api_key", default)]
    pub openai_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub visuals: VisualSettings,
    #[serde(default)]
    pub subtitles: SubtitleSettings,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "default_render_base")]
    pub api_base: String,
    #[serde(default = "default_true")]
    pub test_mode: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default)]
    pub intro_clip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualSettings {
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_courtesy_delay_ms")]
    pub courtesy_delay_ms: u64,
    #[serde(default)]
    pub remap_queries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub timing: SubtitleTiming,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_render_base() -> String {
    "https://api.synthesia.io".to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_courtesy_delay_ms() -> u64 {
    500
}

fn default_font_size() -> u32 {
    28
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            api_base: default_render_base(),
            test_mode: true,
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            intro_clip: false,
        }
    }
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout_secs(),
            courtesy_delay_ms: default_courtesy_delay_ms(),
            remap_queries: false,
        }
    }
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            font_size: default_font_size(),
            timing: SubtitleTiming::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render_key: None,
            pexels_key: None,
            unsplash_key: None,
            openai_key: None,
            openai_model: default_openai_model(),
            render: RenderSettings::default(),
            visuals: VisualSettings::default(),
            subtitles: SubtitleSettings::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let shown = path.as_ref().display().to_string();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: shown.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: shown,
            source,
        })
    }

    /// Reads credentials and overrides from the process environment,
    /// after loading a `.env` file when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut cfg = Config {
            render_key: non_blank("SYNTHESIA_API_KEY"),
            pexels_key: non_blank("PEXELS_API_KEY"),
            unsplash_key: non_blank("UNSPLASH_ACCESS_KEY"),
            openai_key: non_blank("OPENAI_API_KEY"),
            ..Config::default()
        };

        if let Some(model) = non_blank("OPENAI_MODEL") {
            cfg.openai_model = model;
        }
        if let Some(raw) = non_blank("RENDER_POLL_INTERVAL_SECS") {
            cfg.render.poll_interval_secs = parse_number("RENDER_POLL_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = non_blank("RENDER_MAX_POLL_ATTEMPTS") {
            cfg.render.max_poll_attempts = parse_number("RENDER_MAX_POLL_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = non_blank("RENDER_TEST_MODE") {
            cfg.render.test_mode = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "RENDER_TEST_MODE",
                        value: raw,
                    });
                }
            };
        }

        Ok(cfg)
    }

    /// The render credential, required by every path that submits a job.
    pub fn render_key(&self) -> Result<&str, ConfigError> {
        match self.render_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential("SYNTHESIA_API_KEY")),
        }
    }

    pub fn openai_key(&self) -> Result<&str, ConfigError> {
        match self.openai_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential("OPENAI_API_KEY")),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.render.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.visuals.probe_timeout_secs)
    }

    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_millis(self.visuals.courtesy_delay_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
