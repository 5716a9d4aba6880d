use thiserror::Error;

/// Missing or unusable configuration. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is missing or empty")]
    MissingCredential(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The proposer's document does not satisfy the training script contract.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("document root is not an object")]
    NotAnObject,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("scenes must be a list")]
    ScenesNotSequence,

    #[error("scene {scene}: missing field {field}")]
    MissingSceneField { scene: usize, field: &'static str },

    #[error("failed to read script {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the render job client.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("render API key is not configured")]
    Auth,

    #[error("no scene carries narration; nothing to render")]
    Validation,

    #[error("render provider returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("render job {job_id} failed")]
    Failed { job_id: String },

    #[error("render job {job_id} completed without a download link")]
    MissingArtifact { job_id: String },

    #[error("render job {job_id} still pending after {attempts} polls")]
    Timeout { job_id: String, attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("download failed: {0}")]
    Download(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single call to an image-search or text-generation provider failed.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} returned HTTP {status}: {body}")]
    Remote {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} response had no usable content")]
    EmptyResponse { provider: &'static str },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while burning subtitles. Never fatal to the pipeline.
#[derive(Error, Debug)]
pub enum SubtitleError {
    #[error("no narrated scene to caption")]
    NothingToCaption,

    #[error("invalid video duration {0}")]
    InvalidDuration(f64),

    #[error("{tool} failed: {detail}")]
    Tool { tool: &'static str, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that escape the pipeline. Everything else degrades to an outcome.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("script proposer failed: {0}")]
    Proposer(#[from] ProviderError),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
