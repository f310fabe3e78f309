//! Reference embedding store: per-(identity, model) cache entries validated
//! against freshness snapshots, backed by a durable side-channel blob so a
//! fresh process can skip the initial extraction pass.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::extract::{extract_with_fallback, Embedding, EmbeddingExtractor, FallbackOutcome};
use crate::sources::{ReferenceSource, Snapshot, SourceId, CACHE_FILE_NAME};

pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceEmbedding {
    pub embedding: Embedding,
    pub source_id: SourceId,
}

/// Durable cache blob. Round-trips exactly through JSON; a blob whose
/// version, model name, or snapshot mismatches the current state is ignored
/// rather than trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheBlob {
    pub version: u32,
    pub model_name: String,
    pub snapshot: Snapshot,
    pub embeddings: Vec<ReferenceEmbedding>,
}

impl CacheBlob {
    pub fn to_bytes(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(AppError::from)
    }

    pub fn from_bytes(bytes: &[u8], origin: &Path) -> AppResult<CacheBlob> {
        serde_json::from_slice(bytes).map_err(|err| AppError::InvalidCacheBlob {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn matches(&self, model_name: &str, snapshot: &Snapshot) -> bool {
        self.version == CACHE_SCHEMA_VERSION
            && self.model_name == model_name
            && &self.snapshot == snapshot
    }
}

/// Durable side-channel for serialized cache blobs. Failures here are never
/// fatal to verification; callers degrade to a rebuild or skip persistence.
pub trait CacheStore {
    fn get(&self, folder: &Path, model_name: &str) -> AppResult<Option<Vec<u8>>>;
    fn put(&self, folder: &Path, model_name: &str, bytes: &[u8]) -> AppResult<()>;
}

/// Stores the blob as a hidden JSON file inside the identity folder itself,
/// so removing the folder removes the cache with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemCacheStore;

impl FilesystemCacheStore {
    fn blob_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }
}

impl CacheStore for FilesystemCacheStore {
    fn get(&self, folder: &Path, _model_name: &str) -> AppResult<Option<Vec<u8>>> {
        let path = Self::blob_path(folder);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|source| AppError::CacheRead { path, source })
    }

    fn put(&self, folder: &Path, _model_name: &str, bytes: &[u8]) -> AppResult<()> {
        let path = Self::blob_path(folder);
        fs::create_dir_all(folder).map_err(|source| AppError::CacheWrite {
            path: folder.to_path_buf(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(folder).map_err(|source| AppError::CacheWrite {
            path: path.clone(),
            source,
        })?;

        {
            let file = tmp.as_file_mut();
            {
                let mut writer = BufWriter::new(&mut *file);
                writer
                    .write_all(bytes)
                    .map_err(|source| AppError::CacheWrite {
                        path: path.clone(),
                        source,
                    })?;
                writer.flush().map_err(|source| AppError::CacheWrite {
                    path: path.clone(),
                    source,
                })?;
            }
            file.sync_all().map_err(|source| AppError::CacheWrite {
                path: path.clone(),
                source,
            })?;
        }

        let file = tmp.persist(&path).map_err(|err| AppError::CacheWrite {
            path: path.clone(),
            source: err.error,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file
                .metadata()
                .map_err(|source| AppError::CacheWrite {
                    path: path.clone(),
                    source,
                })?
                .permissions();
            perms.set_mode(0o600);
            file.set_permissions(perms)
                .map_err(|source| AppError::CacheWrite {
                    path: path.clone(),
                    source,
                })?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    folder: PathBuf,
    model: String,
}

struct CacheEntry {
    snapshot: Snapshot,
    embeddings: Arc<Vec<ReferenceEmbedding>>,
}

/// Single owner of all cache entries. The in-memory layer is authoritative
/// within the process; the side-channel copy is refreshed opportunistically
/// whenever a rebuild happens.
pub struct ReferenceStore<X, S, C>
where
    X: EmbeddingExtractor,
    S: ReferenceSource,
    C: CacheStore,
{
    extractor: X,
    source: S,
    side_channel: C,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    rebuild_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl<X, S, C> ReferenceStore<X, S, C>
where
    X: EmbeddingExtractor,
    S: ReferenceSource,
    C: CacheStore,
{
    pub fn new(extractor: X, source: S, side_channel: C) -> Self {
        Self {
            extractor,
            source,
            side_channel,
            entries: RwLock::new(HashMap::new()),
            rebuild_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn extractor(&self) -> &X {
        &self.extractor
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the (embedding, source id) sequence for the identity folder,
    /// served from cache when the folder's snapshot is unchanged. An empty
    /// result means the identity has no usable references.
    pub fn get(
        &self,
        folder: &Path,
        model_name: &str,
        backends: &[String],
        use_durable_cache: bool,
    ) -> AppResult<Arc<Vec<ReferenceEmbedding>>> {
        let snapshot = self.source.snapshot(folder)?;
        if snapshot.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let key = CacheKey {
            folder: folder.to_path_buf(),
            model: model_name.to_string(),
        };

        if let Some(hit) = self.lookup_memory(&key, &snapshot) {
            return Ok(hit);
        }

        // Serialize rebuilds per key. Extraction runs while holding only
        // this per-key lock, never the entry map lock, so unrelated
        // identities proceed unblocked. Waiters re-check memory once the
        // winner has populated it.
        let rebuild_lock = self.rebuild_lock(&key);
        let _guard = rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(hit) = self.lookup_memory(&key, &snapshot) {
            return Ok(hit);
        }

        if use_durable_cache {
            if let Some(hit) = self.lookup_side_channel(&key, &snapshot) {
                self.remember(&key, &snapshot, hit.clone());
                return Ok(hit);
            }
        }

        self.rebuild(&key, &snapshot, backends, use_durable_cache)
    }

    /// Drops the in-memory entry for one (identity, model) pair, forcing the
    /// next `get` to re-validate against the side channel or rebuild.
    pub fn invalidate(&self, folder: &Path, model_name: &str) {
        let key = CacheKey {
            folder: folder.to_path_buf(),
            model: model_name.to_string(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    fn lookup_memory(
        &self,
        key: &CacheKey,
        snapshot: &Snapshot,
    ) -> Option<Arc<Vec<ReferenceEmbedding>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if &entry.snapshot == snapshot && !entry.embeddings.is_empty() {
            return Some(entry.embeddings.clone());
        }
        None
    }

    fn lookup_side_channel(
        &self,
        key: &CacheKey,
        snapshot: &Snapshot,
    ) -> Option<Arc<Vec<ReferenceEmbedding>>> {
        let bytes = match self.side_channel.get(&key.folder, &key.model) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                warn!(folder = %key.folder.display(), error = %err, "cache read failed, rebuilding");
                return None;
            }
        };

        match CacheBlob::from_bytes(&bytes, &key.folder) {
            Ok(blob) if blob.matches(&key.model, snapshot) && !blob.embeddings.is_empty() => {
                debug!(
                    folder = %key.folder.display(),
                    count = blob.embeddings.len(),
                    "restored reference embeddings from durable cache"
                );
                Some(Arc::new(blob.embeddings))
            }
            Ok(_) => {
                debug!(folder = %key.folder.display(), "durable cache is stale, rebuilding");
                None
            }
            Err(err) => {
                warn!(folder = %key.folder.display(), error = %err, "durable cache is corrupt, rebuilding");
                None
            }
        }
    }

    fn rebuild(
        &self,
        key: &CacheKey,
        snapshot: &Snapshot,
        backends: &[String],
        use_durable_cache: bool,
    ) -> AppResult<Arc<Vec<ReferenceEmbedding>>> {
        let mut collected = Vec::new();
        for source_id in snapshot.keys() {
            let path = self.source.resolve(&key.folder, source_id);
            match extract_with_fallback(&self.extractor, &path, &key.model, backends, false) {
                FallbackOutcome::Found(embeddings) => {
                    for embedding in embeddings {
                        collected.push(ReferenceEmbedding {
                            embedding,
                            source_id: source_id.clone(),
                        });
                    }
                }
                FallbackOutcome::NoFace | FallbackOutcome::Exhausted => {
                    warn!(
                        source = source_id.as_str(),
                        folder = %key.folder.display(),
                        "no usable embedding from reference image, skipping"
                    );
                }
            }
        }

        let embeddings = Arc::new(collected);
        if embeddings.is_empty() {
            // Not cached: a later call should retry extraction rather than
            // serve a remembered failure.
            return Ok(embeddings);
        }

        self.remember(key, snapshot, embeddings.clone());
        if use_durable_cache {
            self.persist(key, snapshot, &embeddings);
        }
        Ok(embeddings)
    }

    fn remember(
        &self,
        key: &CacheKey,
        snapshot: &Snapshot,
        embeddings: Arc<Vec<ReferenceEmbedding>>,
    ) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.clone(),
                CacheEntry {
                    snapshot: snapshot.clone(),
                    embeddings,
                },
            );
    }

    fn persist(&self, key: &CacheKey, snapshot: &Snapshot, embeddings: &Arc<Vec<ReferenceEmbedding>>) {
        let blob = CacheBlob {
            version: CACHE_SCHEMA_VERSION,
            model_name: key.model.clone(),
            snapshot: snapshot.clone(),
            embeddings: embeddings.as_ref().clone(),
        };
        let bytes = match blob.to_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(folder = %key.folder.display(), error = %err, "failed to serialize embedding cache");
                return;
            }
        };
        if let Err(err) = self.side_channel.put(&key.folder, &key.model, &bytes) {
            warn!(folder = %key.folder.display(), error = %err, "failed to persist embedding cache, continuing");
        }
    }

    fn rebuild_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.rebuild_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::extract::ExtractionRequest;
    use crate::sources::Fingerprint;

    struct CountingExtractor {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingExtractor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Some(delay),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EmbeddingExtractor for CountingExtractor {
        fn extract(&self, image: &Path, _request: &ExtractionRequest) -> AppResult<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            // One embedding derived from the file name, so results are
            // stable across calls.
            let seed = image
                .file_name()
                .map(|name| name.len() as f64)
                .unwrap_or(1.0);
            Ok(vec![vec![seed, 1.0, 0.0]])
        }
    }

    struct NoFaceForExtractor {
        skip: String,
        inner: CountingExtractor,
    }

    impl EmbeddingExtractor for NoFaceForExtractor {
        fn extract(&self, image: &Path, request: &ExtractionRequest) -> AppResult<Vec<Embedding>> {
            let name = image.file_name().map(|n| n.to_string_lossy().into_owned());
            if name.as_deref() == Some(self.skip.as_str()) {
                return Err(AppError::NoFaceDetected {
                    path: image.to_path_buf(),
                });
            }
            self.inner.extract(image, request)
        }
    }

    struct FakeSource {
        snapshot: Mutex<Snapshot>,
    }

    impl FakeSource {
        fn new(entries: &[(&str, Fingerprint)]) -> Self {
            let snapshot = entries
                .iter()
                .map(|(id, fp)| (id.to_string(), *fp))
                .collect();
            Self {
                snapshot: Mutex::new(snapshot),
            }
        }

        fn touch(&self, source_id: &str, fingerprint: Fingerprint) {
            self.snapshot
                .lock()
                .unwrap()
                .insert(source_id.to_string(), fingerprint);
        }
    }

    impl ReferenceSource for FakeSource {
        fn snapshot(&self, _folder: &Path) -> AppResult<Snapshot> {
            Ok(self.snapshot.lock().unwrap().clone())
        }

        fn resolve(&self, folder: &Path, source_id: &str) -> PathBuf {
            folder.join(source_id)
        }
    }

    #[derive(Default)]
    struct MemorySideChannel {
        blobs: Mutex<HashMap<PathBuf, Vec<u8>>>,
        puts: AtomicUsize,
    }

    impl CacheStore for MemorySideChannel {
        fn get(&self, folder: &Path, _model_name: &str) -> AppResult<Option<Vec<u8>>> {
            Ok(self.blobs.lock().unwrap().get(folder).cloned())
        }

        fn put(&self, folder: &Path, _model_name: &str, bytes: &[u8]) -> AppResult<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.blobs
                .lock()
                .unwrap()
                .insert(folder.to_path_buf(), bytes.to_vec());
            Ok(())
        }
    }

    struct FailingSideChannel;

    impl CacheStore for FailingSideChannel {
        fn get(&self, folder: &Path, _model_name: &str) -> AppResult<Option<Vec<u8>>> {
            Err(AppError::CacheRead {
                path: folder.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "side channel down"),
            })
        }

        fn put(&self, folder: &Path, _model_name: &str, _bytes: &[u8]) -> AppResult<()> {
            Err(AppError::CacheWrite {
                path: folder.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "side channel down"),
            })
        }
    }

    fn backends() -> Vec<String> {
        vec!["hog".to_string()]
    }

    fn folder() -> PathBuf {
        PathBuf::from("/users/alice")
    }

    #[test]
    fn blob_round_trips_exactly() {
        let blob = CacheBlob {
            version: CACHE_SCHEMA_VERSION,
            model_name: "Facenet".into(),
            snapshot: [("a.jpg".to_string(), 17u64)].into_iter().collect(),
            embeddings: vec![ReferenceEmbedding {
                embedding: vec![0.1, -2.5, 1.0 / 3.0],
                source_id: "a.jpg".into(),
            }],
        };

        let bytes = blob.to_bytes().unwrap();
        let decoded = CacheBlob::from_bytes(&bytes, Path::new("cache")).unwrap();
        assert_eq!(decoded, blob);
    }

    #[test]
    fn blob_mismatch_detection() {
        let snapshot: Snapshot = [("a.jpg".to_string(), 17u64)].into_iter().collect();
        let blob = CacheBlob {
            version: CACHE_SCHEMA_VERSION,
            model_name: "Facenet".into(),
            snapshot: snapshot.clone(),
            embeddings: Vec::new(),
        };

        assert!(blob.matches("Facenet", &snapshot));
        assert!(!blob.matches("ArcFace", &snapshot));

        let mut stale = snapshot.clone();
        stale.insert("a.jpg".into(), 18);
        assert!(!blob.matches("Facenet", &stale));

        let future = CacheBlob {
            version: CACHE_SCHEMA_VERSION + 1,
            ..blob
        };
        assert!(!future.matches("Facenet", &snapshot));
    }

    #[test]
    fn filesystem_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = FilesystemCacheStore;
        assert!(store.get(tmp.path(), "Facenet").unwrap().is_none());

        store.put(tmp.path(), "Facenet", b"{\"v\":1}").unwrap();
        let bytes = store.get(tmp.path(), "Facenet").unwrap().unwrap();
        assert_eq!(bytes, b"{\"v\":1}");
        assert!(tmp.path().join(CACHE_FILE_NAME).exists());
    }

    #[test]
    fn second_get_serves_from_memory_without_extraction() {
        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1), ("b.jpg", 2)]),
            MemorySideChannel::default(),
        );

        let first = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(store.extractor().calls(), 2);

        let second = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(store.extractor().calls(), 2);
        assert_eq!(*second, *first);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn touching_one_source_rebuilds_all_of_them() {
        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1), ("b.jpg", 2), ("c.jpg", 3)]),
            MemorySideChannel::default(),
        );

        store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(store.extractor().calls(), 3);

        store.source().touch("b.jpg", 99);
        let rebuilt = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(store.extractor().calls(), 6);
        assert_eq!(rebuilt.len(), 3);
    }

    #[test]
    fn matching_durable_blob_restores_without_extraction() {
        let snapshot: Snapshot = [("a.jpg".to_string(), 1u64)].into_iter().collect();
        let blob = CacheBlob {
            version: CACHE_SCHEMA_VERSION,
            model_name: "Facenet".into(),
            snapshot,
            embeddings: vec![ReferenceEmbedding {
                embedding: vec![9.0, 9.0],
                source_id: "a.jpg".into(),
            }],
        };
        let side_channel = MemorySideChannel::default();
        side_channel
            .put(&folder(), "Facenet", &blob.to_bytes().unwrap())
            .unwrap();

        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1)]),
            side_channel,
        );

        let restored = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(store.extractor().calls(), 0);
        assert_eq!(restored.as_ref(), &blob.embeddings);
    }

    #[test]
    fn mismatched_model_blob_triggers_rebuild() {
        let snapshot: Snapshot = [("a.jpg".to_string(), 1u64)].into_iter().collect();
        let blob = CacheBlob {
            version: CACHE_SCHEMA_VERSION,
            model_name: "ArcFace".into(),
            snapshot,
            embeddings: vec![ReferenceEmbedding {
                embedding: vec![9.0, 9.0],
                source_id: "a.jpg".into(),
            }],
        };
        let side_channel = MemorySideChannel::default();
        side_channel
            .put(&folder(), "ArcFace", &blob.to_bytes().unwrap())
            .unwrap();

        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1)]),
            side_channel,
        );

        store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(store.extractor().calls(), 1);
    }

    #[test]
    fn corrupt_blob_degrades_to_rebuild() {
        let side_channel = MemorySideChannel::default();
        side_channel.put(&folder(), "Facenet", b"not json").unwrap();

        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1)]),
            side_channel,
        );

        let result = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(store.extractor().calls(), 1);
    }

    #[test]
    fn failing_side_channel_never_aborts() {
        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1)]),
            FailingSideChannel,
        );

        let result = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn durable_cache_disabled_skips_side_channel() {
        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1)]),
            MemorySideChannel::default(),
        );

        store.get(&folder(), "Facenet", &backends(), false).unwrap();
        assert_eq!(store.extractor().calls(), 1);
        assert_eq!(store.side_channel.puts.load(Ordering::SeqCst), 0);
        assert!(store.side_channel.blobs.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_snapshot_returns_empty_without_extraction() {
        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[]),
            MemorySideChannel::default(),
        );

        let result = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert!(result.is_empty());
        assert_eq!(store.extractor().calls(), 0);
    }

    #[test]
    fn no_face_reference_is_skipped_not_fatal() {
        let extractor = NoFaceForExtractor {
            skip: "a.jpg".into(),
            inner: CountingExtractor::new(),
        };
        let store = ReferenceStore::new(
            extractor,
            FakeSource::new(&[("a.jpg", 1), ("b.jpg", 2)]),
            MemorySideChannel::default(),
        );

        let result = store.get(&folder(), "Facenet", &backends(), true).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source_id, "b.jpg");
    }

    #[test]
    fn invalidate_forces_revalidation() {
        let store = ReferenceStore::new(
            CountingExtractor::new(),
            FakeSource::new(&[("a.jpg", 1)]),
            MemorySideChannel::default(),
        );

        store.get(&folder(), "Facenet", &backends(), false).unwrap();
        store.invalidate(&folder(), "Facenet");
        store.get(&folder(), "Facenet", &backends(), false).unwrap();
        assert_eq!(store.extractor().calls(), 2);
    }

    #[test]
    fn concurrent_gets_rebuild_once() {
        let store = ReferenceStore::new(
            CountingExtractor::with_delay(Duration::from_millis(20)),
            FakeSource::new(&[("a.jpg", 1), ("b.jpg", 2)]),
            MemorySideChannel::default(),
        );

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let result = store.get(&folder(), "Facenet", &backends(), true).unwrap();
                    assert_eq!(result.len(), 2);
                });
            }
        });

        assert_eq!(store.extractor().calls(), 2);
    }
}
