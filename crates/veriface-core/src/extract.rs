//! Extraction adapter: the seam to the embedding-extraction capability and
//! the detector-backend fallback policy shared by reference building and
//! probe extraction.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};

pub type Embedding = Vec<f64>;

/// Verification model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "dlib-resnet-v1";

/// Detector backends tried in priority order, most pose-tolerant first.
pub const DEFAULT_DETECTOR_BACKENDS: &[&str] = &["hog"];

const LANDMARK_ENV: &str = "VERIFACE_LANDMARK_MODEL";
const ENCODER_ENV: &str = "VERIFACE_ENCODER_MODEL";

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub model_name: String,
    pub detector_backend: String,
    pub align: bool,
    pub enforce_detection: bool,
}

impl ExtractionRequest {
    pub fn new(model_name: &str, detector_backend: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            detector_backend: detector_backend.to_string(),
            align: true,
            enforce_detection: true,
        }
    }
}

/// One call tries exactly one backend; callers run the fallback policy.
/// An empty result is valid only when `enforce_detection` is false.
pub trait EmbeddingExtractor {
    fn extract(&self, image: &Path, request: &ExtractionRequest) -> AppResult<Vec<Embedding>>;
}

impl EmbeddingExtractor for Box<dyn EmbeddingExtractor + Send + Sync> {
    fn extract(&self, image: &Path, request: &ExtractionRequest) -> AppResult<Vec<Embedding>> {
        (**self).extract(image, request)
    }
}

const NO_FACE_PHRASES: &[&str] = &["no face", "face could not be detected"];

/// Classifies a failure as "no usable face in the image", as opposed to
/// I/O errors, unsupported formats, or model failures. Backends that only
/// report free-form messages are recognized by phrase.
pub fn is_no_face_failure(err: &AppError) -> bool {
    match err {
        AppError::NoFaceDetected { .. } => true,
        AppError::Extraction { message, .. } => {
            let message = message.to_ascii_lowercase();
            NO_FACE_PHRASES.iter().any(|phrase| message.contains(phrase))
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    /// The first backend that produced at least one embedding.
    Found(Vec<Embedding>),
    /// A backend classified the image as containing no face and the caller
    /// asked to stop there (lighting or pose will not improve by switching
    /// detectors).
    NoFace,
    /// Every backend failed or produced nothing.
    Exhausted,
}

/// Iterates `backends` in order and stops at the first one yielding at least
/// one embedding. With `stop_on_no_face` (probe extraction) a classified
/// no-face failure short-circuits the whole iteration; reference building
/// keeps trying the remaining backends instead.
pub fn extract_with_fallback<X>(
    extractor: &X,
    image: &Path,
    model_name: &str,
    backends: &[String],
    stop_on_no_face: bool,
) -> FallbackOutcome
where
    X: EmbeddingExtractor + ?Sized,
{
    for backend in backends {
        let request = ExtractionRequest::new(model_name, backend);
        match extractor.extract(image, &request) {
            Ok(embeddings) if !embeddings.is_empty() => {
                debug!(
                    backend = backend.as_str(),
                    count = embeddings.len(),
                    image = %image.display(),
                    "extracted embeddings"
                );
                return FallbackOutcome::Found(embeddings);
            }
            Ok(_) => continue,
            Err(err) if is_no_face_failure(&err) => {
                if stop_on_no_face {
                    return FallbackOutcome::NoFace;
                }
                debug!(
                    backend = backend.as_str(),
                    image = %image.display(),
                    "backend found no face, trying next"
                );
            }
            Err(err) => {
                warn!(
                    backend = backend.as_str(),
                    image = %image.display(),
                    error = %err,
                    "detector backend failed, trying next"
                );
            }
        }
    }
    FallbackOutcome::Exhausted
}

#[derive(Debug, Clone)]
pub struct DlibModelPaths {
    pub landmark: PathBuf,
    pub encoder: PathBuf,
}

pub trait ModelPathResolver {
    fn resolve(&self) -> AppResult<DlibModelPaths>;
}

/// Resolves model paths from explicit overrides, falling back to env vars.
#[derive(Debug, Clone, Default)]
pub struct EnvModelPathResolver {
    pub landmark_override: Option<PathBuf>,
    pub encoder_override: Option<PathBuf>,
}

impl ModelPathResolver for EnvModelPathResolver {
    fn resolve(&self) -> AppResult<DlibModelPaths> {
        let landmark = self
            .landmark_override
            .clone()
            .or_else(|| env::var(LANDMARK_ENV).ok().map(PathBuf::from))
            .ok_or(AppError::MissingModel {
                kind: "landmark predictor",
                flag: "--landmark-model",
                env: LANDMARK_ENV,
            })?;

        let encoder = self
            .encoder_override
            .clone()
            .or_else(|| env::var(ENCODER_ENV).ok().map(PathBuf::from))
            .ok_or(AppError::MissingModel {
                kind: "face encoding network",
                flag: "--encoder-model",
                env: ENCODER_ENV,
            })?;

        Ok(DlibModelPaths { landmark, encoder })
    }
}

#[cfg(feature = "dlib")]
pub use dlib::DlibExtractor;

#[cfg(feature = "dlib")]
mod dlib {
    use std::path::Path;

    use dlib_face_recognition::{
        FaceDetector, FaceDetectorTrait, FaceEncoderNetwork, FaceEncoderTrait, ImageMatrix,
        LandmarkPredictor, LandmarkPredictorTrait,
    };
    use image::RgbImage;
    use tracing::debug;

    use super::{DlibModelPaths, Embedding, EmbeddingExtractor, ExtractionRequest, DEFAULT_MODEL};
    use crate::errors::{AppError, AppResult};

    const HOG_BACKEND: &str = "hog";

    pub struct DlibExtractor {
        detector: FaceDetector,
        predictor: LandmarkPredictor,
        encoder: FaceEncoderNetwork,
        jitters: u32,
    }

    impl DlibExtractor {
        pub fn new(models: &DlibModelPaths, jitters: u32) -> AppResult<Self> {
            debug!(path = %models.landmark.display(), "loading landmark model");
            let predictor =
                LandmarkPredictor::open(&models.landmark).map_err(|message| AppError::ModelLoad {
                    path: models.landmark.clone(),
                    message,
                })?;
            debug!(path = %models.encoder.display(), "loading encoder model");
            let encoder =
                FaceEncoderNetwork::open(&models.encoder).map_err(|message| AppError::ModelLoad {
                    path: models.encoder.clone(),
                    message,
                })?;
            let detector = FaceDetector::new();

            Ok(Self {
                detector,
                predictor,
                encoder,
                jitters,
            })
        }
    }

    impl EmbeddingExtractor for DlibExtractor {
        fn extract(&self, image: &Path, request: &ExtractionRequest) -> AppResult<Vec<Embedding>> {
            if request.model_name != DEFAULT_MODEL {
                return Err(AppError::Extraction {
                    path: image.to_path_buf(),
                    message: format!("unsupported model '{}'", request.model_name),
                });
            }
            if request.detector_backend != HOG_BACKEND {
                return Err(AppError::Extraction {
                    path: image.to_path_buf(),
                    message: format!(
                        "unsupported detector backend '{}'",
                        request.detector_backend
                    ),
                });
            }
            if !image.exists() {
                return Err(AppError::MissingInput {
                    path: image.to_path_buf(),
                });
            }

            let decoded = image::open(image).map_err(|source| AppError::ImageDecode {
                path: image.to_path_buf(),
                source,
            })?;
            let rgb: RgbImage = decoded.to_rgb8();
            let matrix = ImageMatrix::from_image(&rgb);

            let locations = self.detector.face_locations(&matrix);
            if locations.is_empty() {
                if request.enforce_detection {
                    return Err(AppError::NoFaceDetected {
                        path: image.to_path_buf(),
                    });
                }
                return Ok(Vec::new());
            }

            // The landmark step aligns each face before encoding; the align
            // flag exists for backends where alignment is skippable.
            let mut landmarks = Vec::with_capacity(locations.len());
            for rect in locations.iter() {
                landmarks.push(self.predictor.face_landmarks(&matrix, rect));
            }

            let encodings = self
                .encoder
                .get_face_encodings(&matrix, &landmarks, self.jitters);

            Ok(encodings
                .iter()
                .map(|encoding| encoding.as_ref().to_vec())
                .collect())
        }
    }
}
