use std::process::ExitCode;

use thiserror::Error;
use veriface_config::ConfigError;
use veriface_core::AppError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] AppError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("face extraction support is not compiled in; rebuild with `--features dlib`")]
    ExtractorUnavailable,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Core(err) => err.exit_code(),
            CliError::Config(_) => ExitCode::from(2),
            CliError::ExtractorUnavailable => ExitCode::from(5),
            _ => ExitCode::from(1),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
