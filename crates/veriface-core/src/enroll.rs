//! Registration of reference images: validated, renamed, and placed into
//! the identity folder so the next cache snapshot picks them up.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::sources::{identity_folder, IMAGE_EXTENSIONS};

#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub user: String,
    /// Image file to enroll as a new reference.
    pub image: PathBuf,
    /// Base directory under which each identity has its folder.
    pub base_dir: PathBuf,
}

#[derive(Debug)]
pub struct RegistrationOutcome {
    pub user: String,
    pub stored_path: PathBuf,
    pub source_id: String,
    pub created_at: String,
    pub logs: Vec<String>,
}

pub fn validate_user_name(user: &str) -> AppResult<()> {
    if user.trim().is_empty() {
        return Err(AppError::InvalidUser {
            user: user.to_string(),
            message: "user name cannot be empty".into(),
        });
    }

    if !user
        .trim()
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(AppError::InvalidUser {
            user: user.to_string(),
            message: "use ASCII letters, numbers, '-' or '_' only".into(),
        });
    }

    Ok(())
}

pub fn run_registration(config: &RegistrationConfig) -> AppResult<RegistrationOutcome> {
    validate_user_name(&config.user)?;

    if !config.image.exists() {
        return Err(AppError::MissingInput {
            path: config.image.clone(),
        });
    }

    let extension = config
        .image
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::UnsupportedFormat { extension });
    }

    let bytes = fs::read(&config.image).map_err(|source| AppError::ReferenceRead {
        path: config.image.clone(),
        source,
    })?;

    // Reject undecodable uploads before they poison the reference set.
    image::load_from_memory(&bytes).map_err(|source| AppError::ImageDecode {
        path: config.image.clone(),
        source,
    })?;

    let mut logs = Vec::new();
    logs.push(format!(
        "Validated reference image {} ({} bytes)",
        config.image.display(),
        bytes.len()
    ));

    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    let source_id = format!("ref_{id}.{extension}");

    let folder = identity_folder(&config.base_dir, &config.user);
    let stored_path = folder.join(&source_id);
    write_reference_image(&stored_path, &bytes)?;
    debug!(path = %stored_path.display(), "stored reference image");
    logs.push(format!("Stored reference image as {}", stored_path.display()));

    Ok(RegistrationOutcome {
        user: config.user.clone(),
        stored_path,
        source_id,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        logs,
    })
}

fn write_reference_image(path: &std::path::Path, bytes: &[u8]) -> AppResult<()> {
    let parent = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    fs::create_dir_all(parent).map_err(|source| AppError::ReferenceWrite {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|source| AppError::ReferenceWrite {
        path: path.to_path_buf(),
        source,
    })?;

    tmp.write_all(bytes)
        .map_err(|source| AppError::ReferenceWrite {
            path: path.to_path_buf(),
            source,
        })?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|source| AppError::ReferenceWrite {
            path: path.to_path_buf(),
            source,
        })?;

    let file = tmp.persist(path).map_err(|err| AppError::ReferenceWrite {
        path: path.to_path_buf(),
        source: err.error,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file
            .metadata()
            .map_err(|source| AppError::ReferenceWrite {
                path: path.to_path_buf(),
                source,
            })?
            .permissions();
        perms.set_mode(0o600);
        file.set_permissions(perms)
            .map_err(|source| AppError::ReferenceWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }

    Ok(())
}
