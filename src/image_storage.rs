mod mirror;
mod path;

use url::Url;

use crate::{config::ImageStorageConfig, error::Result};

pub use mirror::ImageMirror;
pub use path::{derive_path, validate_url};

/// Resolves where a mirrored image is served from.
///
/// Posts keep a handle to the storage that was current when they were
/// returned, so cached posts always resolve against the live
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStorage {
  relative_storage_path: String,
  base_url: Option<Url>,
}

impl ImageStorage {
  pub fn new(config: &ImageStorageConfig) -> Self {
    Self {
      relative_storage_path: config.relative_storage_path().to_string(),
      base_url: config.base_url.clone(),
    }
  }

  /// Path of the image relative to the storage root.
  pub fn relative_internal_url(&self, url: &str) -> Result<String> {
    derive_path(url)
  }

  /// Public URL of the mirrored image. Without a configured base URL
  /// the result is relative to the site root.
  pub fn absolute_internal_url(&self, url: &str) -> Result<String> {
    let relative = self.relative_internal_url(url)?;
    let base = self
      .base_url
      .as_ref()
      .map(|base| base.as_str().trim_end_matches('/'))
      .unwrap_or_default();

    Ok(format!("{}/{}/{}", base, self.relative_storage_path, relative))
  }
}

impl Default for ImageStorage {
  fn default() -> Self {
    Self::new(&ImageStorageConfig::default())
  }
}
