//! Uploaded photo storage.
//!
//! # Responsibility
//! - Decode base64 image payloads (optionally wrapped in a `data:` URL).
//! - Persist student reference photos and classroom photos under one root.
//!
//! # Invariants
//! - Ids embedded in file names never contain path separators or `..`.
//! - Written files are fully flushed before their path is returned.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const STUDENT_PHOTOS_DIR: &str = "student_photos";
const CLASSROOM_PHOTOS_DIR: &str = "classroom_photos";
const DATA_URL_MARKER: &str = "base64,";

#[derive(Debug)]
pub enum PhotoError {
    /// Payload is empty after stripping any data URL prefix.
    EmptyPayload,
    Decode(base64::DecodeError),
    /// Id cannot be used as part of a file name.
    UnsafeName(String),
    Io { path: PathBuf, source: std::io::Error },
}

impl Display for PhotoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "image payload is empty"),
            Self::Decode(err) => write!(f, "invalid base64 image: {err}"),
            Self::UnsafeName(value) => write!(f, "unsafe file name component `{value}`"),
            Self::Io { path, source } => write!(f, "failed to write {}: {source}", path.display()),
        }
    }
}

impl Error for PhotoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::EmptyPayload | Self::UnsafeName(_) => None,
        }
    }
}

/// Decodes a base64 image, accepting `data:image/...;base64,` prefixes.
pub fn decode_base64_image(payload: &str) -> Result<Vec<u8>, PhotoError> {
    let encoded = match payload.split_once(DATA_URL_MARKER) {
        Some((_, rest)) => rest,
        None => payload,
    }
    .trim();
    if encoded.is_empty() {
        return Err(PhotoError::EmptyPayload);
    }
    STANDARD.decode(encoded).map_err(PhotoError::Decode)
}

/// File-system store rooted at the uploads directory.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Stores a base64 student reference photo as `student_photos/{student_id}.jpg`.
    pub fn save_student_photo(&self, student_id: &str, payload: &str) -> Result<PathBuf, PhotoError> {
        self.save_student_photo_bytes(student_id, &decode_base64_image(payload)?)
    }

    pub fn save_student_photo_bytes(
        &self,
        student_id: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, PhotoError> {
        let name = format!("{}.jpg", safe_component(student_id)?);
        self.write(STUDENT_PHOTOS_DIR, &name, bytes)
    }

    /// Stores a base64 classroom photo as
    /// `classroom_photos/class_{class_id}_{YYYY_MM_DD}.jpg`.
    pub fn save_classroom_photo(
        &self,
        class_id: &str,
        date: NaiveDate,
        payload: &str,
    ) -> Result<PathBuf, PhotoError> {
        self.save_classroom_photo_bytes(class_id, date, &decode_base64_image(payload)?)
    }

    pub fn save_classroom_photo_bytes(
        &self,
        class_id: &str,
        date: NaiveDate,
        bytes: &[u8],
    ) -> Result<PathBuf, PhotoError> {
        let name = format!(
            "class_{}_{}.jpg",
            safe_component(class_id)?,
            date.format("%Y_%m_%d")
        );
        self.write(CLASSROOM_PHOTOS_DIR, &name, bytes)
    }

    fn write(&self, dir: &str, name: &str, bytes: &[u8]) -> Result<PathBuf, PhotoError> {
        if bytes.is_empty() {
            return Err(PhotoError::EmptyPayload);
        }
        let dir_path = self.root.join(dir);
        let path = dir_path.join(name);

        let result = std::fs::create_dir_all(&dir_path)
            .and_then(|()| std::fs::write(&path, bytes))
            .map_err(|source| PhotoError::Io {
                path: path.clone(),
                source,
            });
        match result {
            Ok(()) => {
                info!(
                    "event=photo_saved module=photo status=ok dir={dir} bytes={}",
                    bytes.len()
                );
                Ok(path)
            }
            Err(err) => {
                error!("event=photo_saved module=photo status=error dir={dir} error={err}");
                Err(err)
            }
        }
    }
}

fn safe_component(value: &str) -> Result<&str, PhotoError> {
    let trimmed = value.trim();
    let unsafe_name = trimmed.is_empty()
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(PhotoError::UnsafeName(value.to_string()));
    }
    Ok(trimmed)
}
