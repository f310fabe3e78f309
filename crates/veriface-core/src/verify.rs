//! Verification orchestrator: a stateless pipeline from probe image to
//! verified/not-verified decision.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheStore, ReferenceStore};
use crate::errors::AppResult;
use crate::extract::{
    extract_with_fallback, EmbeddingExtractor, FallbackOutcome, DEFAULT_DETECTOR_BACKENDS,
    DEFAULT_MODEL,
};
use crate::matcher::{accept, cosine_distance};
use crate::sources::ReferenceSource;

pub const NOT_FOUND_MESSAGE: &str = "Image file not found.";

pub const NO_REFERENCES_MESSAGE: &str =
    "No reference face images found for this user. Add photos to the user folder.";

pub const NO_FACE_MESSAGE: &str = "No face detected in the captured image. \
     Try facing the camera more directly, or ensure good lighting.";

pub const NO_MATCH_MESSAGE: &str = "Face does not match the registered user.";

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub probe_image: PathBuf,
    /// Identity folder holding the enrolled reference images.
    pub references: PathBuf,
    pub model_name: Option<String>,
    pub detector_backends: Option<Vec<String>>,
    /// Overrides the model's calibrated threshold when set.
    pub distance_threshold: Option<f64>,
    pub use_cache: bool,
}

impl VerifyRequest {
    pub fn new(probe_image: impl Into<PathBuf>, references: impl Into<PathBuf>) -> Self {
        Self {
            probe_image: probe_image.into(),
            references: references.into(),
            model_name: None,
            detector_backends: None,
            distance_threshold: None,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub message: String,
    pub distance: Option<f64>,
    pub matched_source: Option<String>,
    #[serde(skip)]
    pub logs: Vec<String>,
}

impl VerificationOutcome {
    fn rejection(message: &str, logs: Vec<String>) -> Self {
        Self {
            verified: false,
            message: message.to_string(),
            distance: None,
            matched_source: None,
            logs,
        }
    }
}

pub struct Verifier<X, S, C>
where
    X: EmbeddingExtractor,
    S: ReferenceSource,
    C: CacheStore,
{
    store: ReferenceStore<X, S, C>,
}

impl<X, S, C> Verifier<X, S, C>
where
    X: EmbeddingExtractor,
    S: ReferenceSource,
    C: CacheStore,
{
    pub fn new(store: ReferenceStore<X, S, C>) -> Self {
        Self { store }
    }

    pub fn reference_store(&self) -> &ReferenceStore<X, S, C> {
        &self.store
    }

    /// Decides whether the probe image shows the identity enrolled in the
    /// reference folder. Stages: path check, reference lookup, probe
    /// extraction, matching; the first unmet precondition short-circuits
    /// into a rejection with a fixed message.
    pub fn verify(&self, request: &VerifyRequest) -> AppResult<VerificationOutcome> {
        let mut logs = Vec::new();

        if !request.probe_image.exists() {
            return Ok(VerificationOutcome::rejection(NOT_FOUND_MESSAGE, logs));
        }

        let model_name = request.model_name.as_deref().unwrap_or(DEFAULT_MODEL);
        let backends: Vec<String> = match &request.detector_backends {
            Some(backends) => backends.clone(),
            None => DEFAULT_DETECTOR_BACKENDS
                .iter()
                .map(|backend| backend.to_string())
                .collect(),
        };

        let references =
            self.store
                .get(&request.references, model_name, &backends, request.use_cache)?;
        if references.is_empty() {
            return Ok(VerificationOutcome::rejection(NO_REFERENCES_MESSAGE, logs));
        }
        logs.push(format!(
            "Loaded {} reference embedding(s)",
            references.len()
        ));

        let probe_embeddings = match extract_with_fallback(
            self.store.extractor(),
            &request.probe_image,
            model_name,
            &backends,
            true,
        ) {
            FallbackOutcome::Found(embeddings) => embeddings,
            FallbackOutcome::NoFace | FallbackOutcome::Exhausted => {
                return Ok(VerificationOutcome::rejection(NO_FACE_MESSAGE, logs));
            }
        };

        // Only the first detected face in the probe is matched.
        let probe = &probe_embeddings[0];
        logs.push(format!("Probe embedding length: {}", probe.len()));

        for reference in references.iter() {
            let distance = cosine_distance(probe, &reference.embedding);
            debug!(
                source = reference.source_id.as_str(),
                distance, "compared probe against reference"
            );
            let accepted = match request.distance_threshold {
                Some(threshold) => distance <= threshold,
                None => accept(distance, model_name),
            };
            if accepted {
                let message = format!("Face verified (distance: {distance:.3})");
                logs.push(message.clone());
                return Ok(VerificationOutcome {
                    verified: true,
                    message,
                    distance: Some(distance),
                    matched_source: Some(reference.source_id.clone()),
                    logs,
                });
            }
        }

        Ok(VerificationOutcome::rejection(NO_MATCH_MESSAGE, logs))
    }
}
