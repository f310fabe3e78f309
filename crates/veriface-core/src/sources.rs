//! Reference source enumeration: which images make up an identity's
//! reference set, and the freshness fingerprint of each.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;

use crate::errors::{AppError, AppResult};

pub type SourceId = String;

/// Last-modified time in whole milliseconds since the Unix epoch.
pub type Fingerprint = u64;

/// Snapshot of an identity's reference set at one point in time. Keys are
/// iterated lexicographically, which fixes the matching order.
pub type Snapshot = BTreeMap<SourceId, Fingerprint>;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Cache blob file kept alongside the reference images.
pub const CACHE_FILE_NAME: &str = ".face_embeddings.json";

/// Folder holding the reference images for one identity.
pub fn identity_folder(base_dir: &Path, user: &str) -> PathBuf {
    base_dir.join(user.trim().to_ascii_lowercase())
}

pub trait ReferenceSource {
    /// Current (source id, fingerprint) snapshot for the identity folder.
    /// An identity with no usable reference images yields an empty snapshot.
    fn snapshot(&self, folder: &Path) -> AppResult<Snapshot>;

    /// Filesystem path at which `source_id` can be handed to the extractor.
    fn resolve(&self, folder: &Path, source_id: &str) -> PathBuf;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryReferenceSource;

impl ReferenceSource for DirectoryReferenceSource {
    fn snapshot(&self, folder: &Path) -> AppResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        if !folder.is_dir() {
            return Ok(snapshot);
        }

        let entries = fs::read_dir(folder).map_err(|source| AppError::SourceList {
            path: folder.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| AppError::SourceList {
                path: folder.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_reference_image(&name) {
                continue;
            }
            match entry.metadata().and_then(|metadata| metadata.modified()) {
                Ok(modified) => {
                    let millis = modified
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_millis() as u64;
                    snapshot.insert(name, millis);
                }
                Err(err) => {
                    debug!(file = name.as_str(), error = %err, "skipping unreadable reference image");
                }
            }
        }

        Ok(snapshot)
    }

    fn resolve(&self, folder: &Path, source_id: &str) -> PathBuf {
        folder.join(source_id)
    }
}

pub fn is_reference_image(name: &str) -> bool {
    if name == CACHE_FILE_NAME {
        return false;
    }
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn identity_folder_normalizes_user_id() {
        let folder = identity_folder(Path::new("/data/users"), "  Alice ");
        assert_eq!(folder, PathBuf::from("/data/users/alice"));
    }

    #[test]
    fn snapshot_of_missing_folder_is_empty() {
        let source = DirectoryReferenceSource;
        let snapshot = source.snapshot(Path::new("/definitely/not/here")).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn snapshot_filters_non_images_and_cache_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.jpg"), b"jpg").unwrap();
        std::fs::write(tmp.path().join("a.PNG"), b"png").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"text").unwrap();
        std::fs::write(tmp.path().join(CACHE_FILE_NAME), b"{}").unwrap();

        let source = DirectoryReferenceSource;
        let snapshot = source.snapshot(tmp.path()).unwrap();
        let names: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg"]);
    }

    #[test]
    fn snapshot_order_is_lexicographic() {
        let tmp = TempDir::new().unwrap();
        for name in ["zeta.jpg", "alpha.jpg", "mid.jpg"] {
            std::fs::write(tmp.path().join(name), b"img").unwrap();
        }

        let source = DirectoryReferenceSource;
        let snapshot = source.snapshot(tmp.path()).unwrap();
        let names: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha.jpg", "mid.jpg", "zeta.jpg"]);
    }

    #[test]
    fn adding_a_file_changes_the_snapshot() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("one.jpg"), b"img").unwrap();

        let source = DirectoryReferenceSource;
        let before = source.snapshot(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("two.jpg"), b"img").unwrap();
        let after = source.snapshot(tmp.path()).unwrap();
        assert_ne!(before, after);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn resolve_joins_source_id_onto_folder() {
        let source = DirectoryReferenceSource;
        assert_eq!(
            source.resolve(Path::new("/users/alice"), "ref_1.jpg"),
            PathBuf::from("/users/alice/ref_1.jpg")
        );
    }

    #[test]
    fn extension_check_requires_a_stem() {
        assert!(is_reference_image("photo.webp"));
        assert!(!is_reference_image("photo"));
        assert!(!is_reference_image(".jpg"));
    }
}
