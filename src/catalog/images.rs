//! Stored pictures for recipes and ingredients.
//!
//! A row only ever holds a reference (`<namespace>/<key>`). The services
//! store a new picture before their database write and release the old one
//! after it commits; [`superseded`] decides whether a release is due.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Result, ServerError, ValidationErrors};
use crate::storage::{namespaces, StorageBackend, StorageError};

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Picture as it arrives inside a JSON body.
#[derive(Clone, Debug, Deserialize)]
pub struct ImageUpload {
    pub content_type: String,
    /// Base64 (standard alphabet, padded)
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    extension: &'static str,
    bytes: Bytes,
}

/// What an edit does to the picture column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Replace(DecodedImage),
    Remove,
}

#[derive(Clone)]
pub struct ImageStore {
    backend: Arc<dyn StorageBackend>,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(backend: Arc<dyn StorageBackend>, max_bytes: usize) -> Self {
        Self { backend, max_bytes }
    }

    /// Turn the submitted image fields into a change, recording any problem.
    pub fn decode(
        &self,
        upload: Option<&ImageUpload>,
        remove: bool,
        errors: &mut ValidationErrors,
    ) -> ImageChange {
        let upload = match (upload, remove) {
            (None, false) => return ImageChange::Keep,
            (None, true) => return ImageChange::Remove,
            (Some(_), true) => {
                errors.push("image", "Either upload a new image or remove the current one, not both.");
                return ImageChange::Keep;
            }
            (Some(upload), false) => upload,
        };

        let content_type = upload.content_type.trim().to_ascii_lowercase();
        let content_type = if content_type == "image/jpg" { "image/jpeg".to_string() } else { content_type };
        let extension = match IMAGE_TYPES.iter().find(|(ct, _)| *ct == content_type) {
            Some((_, ext)) => *ext,
            None => {
                errors.push("image", format!("Unsupported image type \"{}\".", upload.content_type));
                return ImageChange::Keep;
            }
        };

        let bytes = match BASE64.decode(upload.data.trim()) {
            Ok(bytes) => bytes,
            Err(_) => {
                errors.push("image", "Image data is not valid base64.");
                return ImageChange::Keep;
            }
        };
        if bytes.is_empty() {
            errors.push("image", "The submitted image is empty.");
            return ImageChange::Keep;
        }
        if bytes.len() > self.max_bytes {
            errors.push(
                "image",
                format!("Image is too large ({} bytes, limit {}).", bytes.len(), self.max_bytes),
            );
            return ImageChange::Keep;
        }

        ImageChange::Replace(DecodedImage {
            extension,
            bytes: Bytes::from(bytes),
        })
    }

    /// Store `image` under a fresh key and return its reference.
    pub async fn store(&self, namespace: &str, image: &DecodedImage) -> Result<String> {
        let key = new_key(image.extension);
        self.backend.put(namespace, &key, image.bytes.clone()).await?;
        tracing::debug!("Stored image {}/{} ({} bytes)", namespace, key, image.bytes.len());
        Ok(format!("{}/{}", namespace, key))
    }

    /// Remove a stored image. Releasing something already gone is fine.
    pub async fn release(&self, reference: &str) -> Result<()> {
        let (namespace, key) = split_reference(reference)
            .ok_or_else(|| ServerError::Internal(format!("malformed image reference {:?}", reference)))?;
        self.backend.delete(namespace, key).await?;
        tracing::debug!("Released image {}", reference);
        Ok(())
    }

    /// Release once the request outcome no longer depends on it (the row
    /// change committed, or the row write failed); failures are only logged.
    pub async fn release_logged(&self, reference: &str) {
        if let Err(e) = self.release(reference).await {
            tracing::error!("Failed to release image {}: {}", reference, e);
        }
    }

    /// Bytes and content type of a stored image.
    pub async fn open(&self, namespace: &str, key: &str) -> Result<(Bytes, &'static str)> {
        let not_found = || ServerError::NotFound(format!("Image {}/{}", namespace, key));
        if !namespaces::is_known(namespace) {
            return Err(not_found());
        }
        let extension = key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let content_type = IMAGE_TYPES
            .iter()
            .find(|(_, ext)| *ext == extension)
            .map(|(ct, _)| *ct)
            .ok_or_else(not_found)?;

        match self.backend.get(namespace, key).await {
            Ok(bytes) => Ok((bytes, content_type)),
            Err(StorageError::NotFound(_)) | Err(StorageError::InvalidKey(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The reference to release once `new` replaces `old`: only when there was
/// an old image and it is actually different.
pub fn superseded<'a>(old: Option<&'a str>, new: Option<&str>) -> Option<&'a str> {
    match old {
        Some(old) if Some(old) != new => Some(old),
        _ => None,
    }
}

fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let (namespace, key) = reference.split_once('/')?;
    if namespace.is_empty() || key.is_empty() {
        return None;
    }
    Some((namespace, key))
}

/// Random v4 key. Two uploads of the same picture still get distinct keys,
/// so releasing one row's image never touches another's.
fn new_key(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}
