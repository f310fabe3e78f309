//! Wires the configuration layer to the core: resolves effective settings
//! and constructs the extractor, store, and verifier.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use veriface_config::{
    config_source_label, load_resolved_config, load_resolved_from_paths, ResolvedConfig,
};
use veriface_core::{
    identity_folder, DirectoryReferenceSource, EmbeddingExtractor, FilesystemCacheStore,
    ReferenceStore, Verifier,
};

use crate::errors::CliResult;

pub const USERS_DIR_ENV: &str = "VERIFACE_USERS_DIR";

pub type CliExtractor = Box<dyn EmbeddingExtractor + Send + Sync>;
pub type CliVerifier = Verifier<CliExtractor, DirectoryReferenceSource, FilesystemCacheStore>;
pub type CliReferenceStore =
    ReferenceStore<CliExtractor, DirectoryReferenceSource, FilesystemCacheStore>;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model_name: String,
    pub backends: Vec<String>,
    pub users_dir: PathBuf,
    pub use_cache: bool,
    pub distance_threshold: Option<f64>,
    pub landmark_model: Option<PathBuf>,
    pub encoder_model: Option<PathBuf>,
    pub jitters: u32,
}

impl EngineSettings {
    pub fn from_resolved(resolved: ResolvedConfig) -> Self {
        let users_dir = env::var(USERS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or(resolved.users_dir);
        Self {
            model_name: resolved.model_name,
            backends: resolved.detector_backends,
            users_dir,
            use_cache: resolved.use_cache,
            distance_threshold: resolved.distance_threshold,
            landmark_model: resolved.landmark_model,
            encoder_model: resolved.encoder_model,
            jitters: resolved.jitters,
        }
    }

    /// Command line flags win over env and config file values.
    pub fn apply_overrides(
        &mut self,
        users_dir: Option<PathBuf>,
        model: Option<String>,
        backends: &[String],
        landmark_model: Option<PathBuf>,
        encoder_model: Option<PathBuf>,
    ) {
        if let Some(dir) = users_dir {
            self.users_dir = dir;
        }
        if let Some(model) = model {
            self.model_name = model;
        }
        if !backends.is_empty() {
            self.backends = backends.to_vec();
        }
        if let Some(path) = landmark_model {
            self.landmark_model = Some(path);
        }
        if let Some(path) = encoder_model {
            self.encoder_model = Some(path);
        }
    }
}

pub fn resolve_settings(config_override: Option<&Path>) -> CliResult<EngineSettings> {
    let loaded = match config_override {
        Some(path) => load_resolved_from_paths(&[path.to_path_buf()])?,
        None => load_resolved_config()?,
    };
    debug!(
        source = config_source_label(loaded.source.as_deref()).as_str(),
        "loaded configuration"
    );
    Ok(EngineSettings::from_resolved(loaded.resolved))
}

#[cfg(feature = "dlib")]
pub fn build_extractor(settings: &EngineSettings) -> CliResult<CliExtractor> {
    use veriface_core::{DlibExtractor, EnvModelPathResolver, ModelPathResolver};

    let resolver = EnvModelPathResolver {
        landmark_override: settings.landmark_model.clone(),
        encoder_override: settings.encoder_model.clone(),
    };
    let models = resolver.resolve()?;
    let extractor = DlibExtractor::new(&models, settings.jitters)?;
    Ok(Box::new(extractor))
}

#[cfg(not(feature = "dlib"))]
pub fn build_extractor(_settings: &EngineSettings) -> CliResult<CliExtractor> {
    Err(crate::errors::CliError::ExtractorUnavailable)
}

pub fn build_reference_store(settings: &EngineSettings) -> CliResult<CliReferenceStore> {
    Ok(ReferenceStore::new(
        build_extractor(settings)?,
        DirectoryReferenceSource,
        FilesystemCacheStore,
    ))
}

pub fn build_verifier(settings: &EngineSettings) -> CliResult<CliVerifier> {
    Ok(Verifier::new(build_reference_store(settings)?))
}

#[derive(Debug, Serialize)]
pub struct PrecomputeReport {
    pub user: String,
    pub model: String,
    pub embeddings: usize,
    pub sources: usize,
}

pub fn precompute(settings: &EngineSettings, user: &str) -> CliResult<PrecomputeReport> {
    let store = build_reference_store(settings)?;
    let folder = identity_folder(&settings.users_dir, user);
    let embeddings = store.get(
        &folder,
        &settings.model_name,
        &settings.backends,
        settings.use_cache,
    )?;
    let sources: HashSet<&str> = embeddings
        .iter()
        .map(|reference| reference.source_id.as_str())
        .collect();
    Ok(PrecomputeReport {
        user: user.to_string(),
        model: settings.model_name.clone(),
        embeddings: embeddings.len(),
        sources: sources.len(),
    })
}
