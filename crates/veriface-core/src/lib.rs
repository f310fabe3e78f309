//! Face verification decision engine: decides whether a probe image matches
//! an identity's enrolled reference images, with a validity-checked cache of
//! reference embeddings so extraction only reruns when the reference set
//! changes.

pub mod cache;
pub mod enroll;
pub mod errors;
pub mod extract;
pub mod matcher;
pub mod sources;
pub mod verify;

pub use cache::{
    CacheBlob, CacheStore, FilesystemCacheStore, ReferenceEmbedding, ReferenceStore,
    CACHE_SCHEMA_VERSION,
};
pub use enroll::{run_registration, validate_user_name, RegistrationConfig, RegistrationOutcome};
pub use errors::{AppError, AppResult};
#[cfg(feature = "dlib")]
pub use extract::DlibExtractor;
pub use extract::{
    extract_with_fallback, is_no_face_failure, DlibModelPaths, Embedding, EmbeddingExtractor,
    EnvModelPathResolver, ExtractionRequest, FallbackOutcome, ModelPathResolver,
    DEFAULT_DETECTOR_BACKENDS, DEFAULT_MODEL,
};
pub use matcher::{accept, cosine_distance, distance_threshold, DEFAULT_DISTANCE_THRESHOLD};
pub use sources::{
    identity_folder, DirectoryReferenceSource, Fingerprint, ReferenceSource, Snapshot, SourceId,
    CACHE_FILE_NAME, IMAGE_EXTENSIONS,
};
pub use verify::{
    VerificationOutcome, Verifier, VerifyRequest, NO_FACE_MESSAGE, NO_MATCH_MESSAGE,
    NO_REFERENCES_MESSAGE, NOT_FOUND_MESSAGE,
};
