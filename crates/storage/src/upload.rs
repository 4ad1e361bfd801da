//! Opaque "bytes in, URL out" upload capability and the key scheme that
//! namespaces every object by its owner.

use async_trait::async_trait;
use brandkit_core::{BrandkitError, BrandkitResult, UserId};
use bytes::Bytes;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Logo,
    ElementImage,
}

/// Storage key of an uploaded object. Only constructible through the
/// owner-namespaced constructors below.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    path: String,
    kind: ObjectKind,
}

impl ObjectKey {
    /// `{user}/logo`. Extension-free so that a user has at most one logo
    /// object whatever the file type; the content type travels with the bytes.
    pub fn logo(user: &UserId) -> Self {
        Self {
            path: format!("{user}/logo"),
            kind: ObjectKind::Logo,
        }
    }

    /// `{user}/templates/{template}/{session}/{index}.{ext}`: one object per
    /// content slot per editing session, so a later session never replaces an
    /// image a committed customization points at.
    pub fn element_image(
        user: &UserId,
        template_id: &str,
        session: Uuid,
        index: u32,
        ext: &str,
    ) -> Self {
        let template = template_id.replace(['/', '\\'], "_");
        Self {
            path: format!("{user}/templates/{template}/{session}/{index}.{ext}"),
            kind: ObjectKind::ElementImage,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A file picked by the user, as handed to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased text after the last dot of the file name.
    pub fn extension(&self) -> BrandkitResult<String> {
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                Ok(ext.to_ascii_lowercase())
            }
            _ => Err(BrandkitError::Upload(format!(
                "'{}' has no file extension",
                self.file_name
            ))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Ok("png") => "image/png",
            Ok("jpg") | Ok("jpeg") => "image/jpeg",
            Ok("svg") => "image/svg+xml",
            Ok("webp") => "image/webp",
            Ok("gif") => "image/gif",
            _ => "application/octet-stream",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[async_trait]
pub trait UploadCapability: Send + Sync {
    /// Store `upload` under `key`, overwriting any existing object, and return
    /// its public URL. Fails with [`BrandkitError::Upload`] when the asset is
    /// rejected.
    async fn upload(&self, key: &ObjectKey, upload: &ImageUpload) -> BrandkitResult<String>;
}
