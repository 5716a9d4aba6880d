use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use training_video::api::openai::OpenAiProposer;
use training_video::api::synthesia::SynthesiaClient;
use training_video::ffmpeg::Ffmpeg;
use training_video::subtitle::SubtitleTiming;
use training_video::{
    CancelToken, Config, Pipeline, PipelineOutcome, TrainingScript, extract, init, validate,
};

#[derive(Parser)]
#[command(name = "training-video")]
#[command(about = "Generate narrated training videos from a text request", long_about = None)]
struct Cli {
    /// JSON config file; environment variables and .env are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    flags: RunFlags,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunFlags {
    /// Prepend a spoken introduction built from the title and objectives
    #[arg(long, global = true)]
    intro: bool,

    /// Keep the rendered video as is
    #[arg(long, global = true)]
    no_subtitles: bool,

    /// Seed for the presenter choice
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Size subtitle windows by word count instead of equal slices
    #[arg(long, global = true)]
    word_paced: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the language model for a script, then render it
    Generate {
        /// What the training should cover
        #[arg(short, long)]
        request: String,
    },

    /// Render an existing script document
    Render {
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Extract and validate a script document or raw model output
    Validate {
        #[arg(short, long)]
        script: PathBuf,
    },
}

async fn load_config(path: Option<&Path>, flags: &RunFlags) -> Result<Config> {
    let mut cfg = match path {
        Some(p) => Config::load(p).await?,
        None => Config::from_env()?,
    };
    if flags.intro {
        cfg.render.intro_clip = true;
    }
    if flags.no_subtitles {
        cfg.subtitles.enabled = false;
    }
    if flags.word_paced {
        cfg.subtitles.timing = SubtitleTiming::WordPaced;
    }
    Ok(cfg)
}

fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}

async fn save_script(cfg: &Config, script: &TrainingScript) -> Result<()> {
    let dir = init::scripts_dir(cfg);
    let json = script.save_json(&dir, None).await?;
    let teleprompter = json.with_extension("txt");
    script.save_teleprompter(&teleprompter).await?;
    let storyboard = json.with_extension("md");
    script.save_storyboard(&storyboard).await?;
    info!("script saved: {}", json.display());
    info!("teleprompter saved: {}", teleprompter.display());
    info!("storyboard saved: {}", storyboard.display());
    Ok(())
}

fn report(outcome: &PipelineOutcome) -> i32 {
    println!("{outcome}");
    match outcome {
        PipelineOutcome::Captioned(_)
        | PipelineOutcome::Uncaptioned(_)
        | PipelineOutcome::RemoteOnly(_)
        | PipelineOutcome::Pending(_) => 0,
        PipelineOutcome::RenderFailed(_) => 1,
        PipelineOutcome::Cancelled => 130,
    }
}

async fn prepare(cfg: &Config) -> Result<Pipeline<SynthesiaClient, Ffmpeg>> {
    init::ensure_directories(cfg).await?;
    if cfg.subtitles.enabled && !init::check_ffmpeg().await {
        warn!("ffmpeg not found in PATH; videos will not be subtitled");
    }
    Ok(Pipeline::from_config(cfg)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Validate { script } => {
            let raw = tokio::fs::read_to_string(&script)
                .await
                .with_context(|| format!("reading {}", script.display()))?;
            let doc: serde_json::Value = serde_json::from_str(&extract::extract(&raw))
                .context("document is not valid JSON")?;
            let report = validate::validate(&doc)?;
            for advisory in &report.advisories {
                println!("warning: {advisory}");
            }
            let parsed: TrainingScript = serde_json::from_value(doc)?;
            println!("{}", parsed.stats());
            0
        }
        Commands::Generate { request } => {
            let cfg = load_config(cli.config.as_deref(), &cli.flags).await?;
            let mut pipeline = prepare(&cfg).await?;
            if let Some(seed) = cli.flags.seed {
                pipeline = pipeline.with_seed(seed);
            }
            let proposer = OpenAiProposer::from_config(&cfg, reqwest::Client::new())?;
            let cancel = cancel_on_ctrl_c();

            let (script, outcome) = pipeline.generate(&proposer, &request, &cancel).await?;
            save_script(&cfg, &script).await?;
            report(&outcome)
        }
        Commands::Render { script } => {
            let cfg = load_config(cli.config.as_deref(), &cli.flags).await?;
            let mut pipeline = prepare(&cfg).await?;
            if let Some(seed) = cli.flags.seed {
                pipeline = pipeline.with_seed(seed);
            }
            let mut doc = TrainingScript::from_json_file(&script).await?;
            info!("rendering {}", script.display());
            let cancel = cancel_on_ctrl_c();

            let outcome = pipeline.run_script(&mut doc, &cancel).await?;
            report(&outcome)
        }
    };

    std::process::exit(code);
}
