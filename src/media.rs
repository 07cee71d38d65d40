//! Uploaded image storage.
//!
//! Images are decoded, scaled down to the configured width and re-encoded as
//! WebP under `<root>/<kind>/<uuid>.webp`. The returned path
//! (`/uploads/<kind>/<uuid>.webp`) is what gets stored on seller and product
//! rows, and what [`crate::core::assets::authorize_asset`] later resolves.

use crate::{
    config::MediaConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use std::{
    io::Cursor,
    path::{Component, Path, PathBuf},
};

/// Public prefix of every stored asset path.
pub const URL_PREFIX: &str = "/uploads";

/// What an image belongs to; selects the storage sub-directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Seller logo or cover
    Seller,
    /// Product photo
    Product,
}

impl MediaKind {
    /// Sub-directory name.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Seller => "sellers",
            Self::Product => "products",
        }
    }

    /// Kind encoded in a stored asset path, if any.
    #[must_use]
    pub fn from_asset_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(URL_PREFIX)?.strip_prefix('/')?;
        let (dir, file) = rest.split_once('/')?;
        if file.is_empty() || file.contains('/') {
            return None;
        }
        match dir {
            "sellers" => Some(Self::Seller),
            "products" => Some(Self::Product),
            _ => None,
        }
    }
}

/// Image storage backend.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Processes and persists `bytes`, returning the public asset path.
    async fn store(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<String>;

    /// Deletes a previously stored asset. Missing files are not an error.
    async fn remove(&self, path: &str) -> Result<()>;
}

/// Removes `path` if present, logging instead of failing.
pub async fn remove_quietly(store: &dyn ImageStore, path: Option<&str>) {
    let Some(path) = path else {
        return;
    };
    if let Err(e) = store.remove(path).await {
        tracing::warn!(path, error = %e, "failed to remove stored image");
    }
}

/// Filesystem-backed [`ImageStore`].
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    max_bytes: usize,
    max_width: u32,
}

impl LocalImageStore {
    /// Store rooted at `config.root`.
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            max_bytes: config.max_bytes,
            max_width: config.max_width,
        }
    }

    /// Filesystem location of a public asset path.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let kind = MediaKind::from_asset_path(path)
            .ok_or_else(|| Error::validation("path", format!("not a stored asset: {path}")))?;
        let file = Path::new(path)
            .file_name()
            .ok_or_else(|| Error::validation("path", format!("not a stored asset: {path}")))?;
        let relative = Path::new(kind.dir()).join(file);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::validation("path", format!("not a stored asset: {path}")));
        }
        Ok(self.root.join(relative))
    }

    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.len() > self.max_bytes {
            return Err(Error::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let decoded = image::load_from_memory(bytes).map_err(|e| Error::UnsupportedFormat {
            message: e.to_string(),
        })?;

        let scaled = if decoded.width() > self.max_width {
            decoded.resize(self.max_width, u32::MAX, FilterType::Triangle)
        } else {
            decoded
        };

        let rgba = DynamicImage::ImageRgba8(scaled.to_rgba8());
        let mut out = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut out), ImageFormat::WebP)
            .map_err(|e| Error::UnsupportedFormat {
                message: e.to_string(),
            })?;
        Ok(out)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<String> {
        let encoded = self.encode(&bytes)?;

        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.webp", uuid::Uuid::new_v4());
        tokio::fs::write(dir.join(&file_name), &encoded).await?;

        let path = format!("{URL_PREFIX}/{}/{file_name}", kind.dir());
        tracing::debug!(%path, size = encoded.len(), "image stored");
        Ok(path)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
