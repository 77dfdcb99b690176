// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local storage for uploaded images and annotated results
//!
//! Both directories are append-only: files are written once under a
//! unique name and never modified or deleted by the service.

use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Upload extensions accepted by the file picker
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Prefix added to an upload's file name to name its result image
pub const RESULT_PREFIX: &str = "result_";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file extension '{0}', expected one of: jpg, jpeg, png")]
    UnsupportedExtension(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode result image: {0}")]
    Encode(#[from] image::ImageError),
}

/// A file written by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    /// Unique identifier (the file stem for uploads)
    pub id: String,
    /// File name inside its directory
    pub file_name: String,
    /// Full path on disk
    pub path: PathBuf,
    /// Bytes written
    pub size_bytes: usize,
}

/// Filesystem bookkeeping over the `uploads/` and `results/` directories
#[derive(Debug, Clone)]
pub struct ImageStore {
    upload_dir: PathBuf,
    result_dir: PathBuf,
}

impl ImageStore {
    /// Open the store, creating both directories if they don't exist
    pub async fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        upload_dir: P,
        result_dir: Q,
    ) -> Result<Self, StorageError> {
        let upload_dir = upload_dir.as_ref().to_path_buf();
        let result_dir = result_dir.as_ref().to_path_buf();

        for dir in [&upload_dir, &result_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }

        info!(
            "Image store ready (uploads: {}, results: {})",
            upload_dir.display(),
            result_dir.display()
        );

        Ok(Self {
            upload_dir,
            result_dir,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Extract the lowercased extension (with leading dot) from a client file name
    pub fn upload_extension(original_name: &str) -> Result<String, StorageError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(StorageError::UnsupportedExtension(ext));
        }

        Ok(format!(".{}", ext))
    }

    /// Persist an uploaded image under `<uuid><ext>`
    pub async fn save_upload(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<StoredImage, StorageError> {
        let ext = Self::upload_extension(original_name)?;
        let id = Uuid::new_v4().to_string();
        let file_name = format!("{}{}", id, ext);
        let path = self.upload_dir.join(&file_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("Stored upload {} ({} bytes)", file_name, bytes.len());

        Ok(StoredImage {
            id,
            file_name,
            path,
            size_bytes: bytes.len(),
        })
    }

    /// Name of the result image derived from an upload
    pub fn result_file_name(upload_name: &str) -> String {
        format!("{}{}", RESULT_PREFIX, upload_name)
    }

    /// Resolve a stored upload name to its path
    pub fn upload_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(name)?;
        Ok(self.upload_dir.join(name))
    }

    /// Resolve a stored result name to its path
    pub fn result_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(name)?;
        Ok(self.result_dir.join(name))
    }

    /// Read back a previously stored upload
    pub async fn read_upload(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.upload_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Encode and persist the annotated image for an upload as `result_<upload name>`
    pub async fn save_result(
        &self,
        upload_name: &str,
        image: &RgbImage,
    ) -> Result<StoredImage, StorageError> {
        validate_file_name(upload_name)?;
        let file_name = Self::result_file_name(upload_name);
        let path = self.result_path(&file_name)?;

        let format = ImageFormat::from_path(&path)?;
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format)?;
        let bytes = buf.into_inner();

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("Stored result {} ({} bytes)", file_name, bytes.len());

        let id = Path::new(upload_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(StoredImage {
            id,
            file_name,
            path,
            size_bytes: bytes.len(),
        })
    }
}

/// Accept only a single plain path component
fn validate_file_name(name: &str) -> Result<(), StorageError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name => Ok(()),
        _ => Err(StorageError::InvalidName(name.to_string())),
    }
}
