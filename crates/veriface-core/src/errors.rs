use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use image::ImageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("input file not found or unreadable: {path}")]
    MissingInput { path: PathBuf },

    #[error("no face detected in {path}")]
    NoFaceDetected { path: PathBuf },

    #[error("embedding extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("missing {kind} model; provide {flag} or set ${env}")]
    MissingModel {
        kind: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("failed to enumerate reference images in {path}: {source}")]
    SourceList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read embedding cache {path}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write embedding cache {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("embedding cache {path} is invalid: {message}")]
    InvalidCacheBlob { path: PathBuf, message: String },

    #[error("invalid user name '{user}': {message}")]
    InvalidUser { user: String, message: String },

    #[error("unsupported image format '{extension}' for reference image")]
    UnsupportedFormat { extension: String },

    #[error("failed to read reference image {path}: {source}")]
    ReferenceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write reference image {path}: {source}")]
    ReferenceWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::MissingInput { .. } => ExitCode::from(2),
            AppError::ImageDecode { .. } => ExitCode::from(2),
            AppError::MissingModel { .. } => ExitCode::from(2),
            AppError::ModelLoad { .. } => ExitCode::from(2),
            AppError::InvalidUser { .. } => ExitCode::from(2),
            AppError::UnsupportedFormat { .. } => ExitCode::from(2),
            AppError::NoFaceDetected { .. } => ExitCode::from(3),
            AppError::Extraction { .. } => ExitCode::from(3),
            AppError::SourceList { .. } => ExitCode::from(4),
            AppError::ReferenceRead { .. } => ExitCode::from(4),
            AppError::ReferenceWrite { .. } => ExitCode::from(4),
            _ => ExitCode::from(1),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
