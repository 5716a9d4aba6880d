//! Training video generation: turn a model-proposed script into a rendered,
//! subtitled presenter video.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod generator;
pub mod init;
pub mod lang;
pub mod render;
pub mod retry;
pub mod script;
pub mod srt;
pub mod subtitle;
pub mod validate;
pub mod visuals;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use generator::{Pipeline, PipelineOutcome, run_pipeline};
pub use retry::CancelToken;
pub use script::{Scene, TrainingScript};
