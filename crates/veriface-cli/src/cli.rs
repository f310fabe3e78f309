use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "veriface",
    about = "Verify captured face images against enrolled reference photos",
    version
)]
pub struct Cli {
    /// Emit structured JSON to stdout instead of human-readable logs
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity (may be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Alternative configuration file (defaults to the system search path)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Verify a probe image against a user's enrolled references
    Verify(VerifyArgs),
    /// Register a new reference image for a user
    Register(RegisterArgs),
    /// Build or refresh a user's reference embedding cache
    Precompute(PrecomputeArgs),
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// User whose enrolled references the probe is checked against
    pub user: String,

    /// Path to the captured probe image
    pub image: PathBuf,

    /// Verification model name (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Detector backend to try, in priority order (repeatable)
    #[arg(long = "backend")]
    pub backends: Vec<String>,

    /// Acceptance threshold override (otherwise calibrated per model)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Ignore the durable embedding cache for this call
    #[arg(long)]
    pub no_cache: bool,

    /// Base directory holding per-user reference folders
    #[arg(long)]
    pub users_dir: Option<PathBuf>,

    /// Optional path to the dlib landmark predictor model
    #[arg(long)]
    pub landmark_model: Option<PathBuf>,

    /// Optional path to the dlib face recognition network
    #[arg(long)]
    pub encoder_model: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// User to enroll the reference image for
    pub user: String,

    /// Image file to copy into the user's reference folder
    pub image: PathBuf,

    /// Base directory holding per-user reference folders
    #[arg(long)]
    pub users_dir: Option<PathBuf>,

    /// Rebuild the embedding cache right after registering
    #[arg(long)]
    pub precompute: bool,

    /// Optional path to the dlib landmark predictor model
    #[arg(long)]
    pub landmark_model: Option<PathBuf>,

    /// Optional path to the dlib face recognition network
    #[arg(long)]
    pub encoder_model: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PrecomputeArgs {
    /// User whose reference embeddings should be (re)computed
    pub user: String,

    /// Verification model name (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Detector backend to try, in priority order (repeatable)
    #[arg(long = "backend")]
    pub backends: Vec<String>,

    /// Base directory holding per-user reference folders
    #[arg(long)]
    pub users_dir: Option<PathBuf>,

    /// Optional path to the dlib landmark predictor model
    #[arg(long)]
    pub landmark_model: Option<PathBuf>,

    /// Optional path to the dlib face recognition network
    #[arg(long)]
    pub encoder_model: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

impl From<bool> for OutputMode {
    fn from(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(self.json)
    }
}
