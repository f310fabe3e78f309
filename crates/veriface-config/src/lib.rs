use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const PRIMARY_CONFIG_PATH: &str = "/etc/veriface/config.toml";
pub const SECONDARY_CONFIG_PATH: &str = "/usr/local/etc/veriface/config.toml";

pub const DEFAULT_MODEL_NAME: &str = "dlib-resnet-v1";
pub const DEFAULT_DETECTOR_BACKENDS: &[&str] = &["hog"];
pub const DEFAULT_USERS_DIR: &str = "/var/lib/veriface/users";
pub const DEFAULT_USE_CACHE: bool = true;
pub const DEFAULT_JITTERS: u32 = 1;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    pub model_name: Option<String>,
    pub detector_backends: Option<Vec<String>>,
    pub users_dir: Option<PathBuf>,
    pub use_cache: Option<bool>,
    pub distance_threshold: Option<f64>,
    pub landmark_model: Option<PathBuf>,
    pub encoder_model: Option<PathBuf>,
    pub jitters: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub model_name: String,
    pub detector_backends: Vec<String>,
    pub users_dir: PathBuf,
    pub use_cache: bool,
    /// Overrides the model's calibrated threshold when set.
    pub distance_threshold: Option<f64>,
    pub landmark_model: Option<PathBuf>,
    pub encoder_model: Option<PathBuf>,
    pub jitters: u32,
}

impl ResolvedConfig {
    pub fn from_raw(raw: ConfigFile) -> Self {
        Self {
            model_name: raw
                .model_name
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            detector_backends: raw.detector_backends.unwrap_or_else(|| {
                DEFAULT_DETECTOR_BACKENDS
                    .iter()
                    .map(|backend| backend.to_string())
                    .collect()
            }),
            users_dir: raw
                .users_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_USERS_DIR)),
            use_cache: raw.use_cache.unwrap_or(DEFAULT_USE_CACHE),
            distance_threshold: raw.distance_threshold,
            landmark_model: raw.landmark_model,
            encoder_model: raw.encoder_model,
            jitters: raw.jitters.unwrap_or(DEFAULT_JITTERS),
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::from_raw(ConfigFile::default())
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub contents: ConfigFile,
    pub source: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfigWithSource {
    pub resolved: ResolvedConfig,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub fn load_resolved_config() -> Result<ResolvedConfigWithSource, ConfigError> {
    let sources = [
        PathBuf::from(PRIMARY_CONFIG_PATH),
        PathBuf::from(SECONDARY_CONFIG_PATH),
    ];
    load_resolved_from_paths(&sources)
}

pub fn load_from_paths(paths: &[PathBuf]) -> Result<Option<LoadedConfig>, ConfigError> {
    for path in paths {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let parsed = toml::from_str::<ConfigFile>(&contents).map_err(|err| {
                    ConfigError::Parse {
                        path: path.clone(),
                        message: err.to_string(),
                    }
                })?;
                return Ok(Some(LoadedConfig {
                    contents: parsed,
                    source: path.clone(),
                }));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(ConfigError::Read {
                    path: path.clone(),
                    source: err,
                });
            }
        }
    }
    Ok(None)
}

pub fn load_resolved_from_paths(
    paths: &[PathBuf],
) -> Result<ResolvedConfigWithSource, ConfigError> {
    match load_from_paths(paths)? {
        Some(loaded) => Ok(ResolvedConfigWithSource {
            resolved: ResolvedConfig::from_raw(loaded.contents),
            source: Some(loaded.source),
        }),
        None => Ok(ResolvedConfigWithSource {
            resolved: ResolvedConfig::default(),
            source: None,
        }),
    }
}

pub fn config_source_label(source: Option<&Path>) -> String {
    match source {
        Some(path) => path.display().to_string(),
        None => "builtin defaults".to_string(),
    }
}
