use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::{client::ClientConfig, error::Result};

pub const DEFAULT_NAMESPACE: &str = "wordpress-post-feed";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub feed: FeedConfig,
  pub client: ClientConfig,
  pub images: ImageStorageConfig,
  /// Directory of the file backed cache used by the command line tool.
  pub cache_dir: Option<PathBuf>,
}

impl Config {
  pub fn load_from_file(path: &Path) -> Result<Self> {
    let f = std::fs::File::open(path)?;
    let config: Config = serde_yaml::from_reader(f)?;
    Ok(config)
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedConfig {
  /// How long both the raw feed and the parsed posts stay cached.
  /// (Examples: "2h", "30m")
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  pub expiration_time: Duration,
  /// Cache namespace holding every entry written by the loader.
  pub namespace: String,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      expiration_time: default_expiration_time(),
      namespace: DEFAULT_NAMESPACE.to_string(),
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ImageStorageConfig {
  /// Directory on disk where mirrored images are written.
  pub storage_path: Option<PathBuf>,
  /// Public path prefix under which `storage_path` is served.
  pub relative_storage_path: String,
  /// Externally visible origin (scheme and host) used for absolute
  /// image URLs. Without it only relative URLs can be produced.
  pub base_url: Option<Url>,
}

impl Default for ImageStorageConfig {
  fn default() -> Self {
    Self {
      storage_path: None,
      relative_storage_path: DEFAULT_NAMESPACE.to_string(),
      base_url: None,
    }
  }
}

impl ImageStorageConfig {
  pub fn new(storage_path: impl Into<PathBuf>) -> Self {
    Self {
      storage_path: Some(storage_path.into()),
      ..Self::default()
    }
  }

  pub fn with_base_url(mut self, base_url: Url) -> Self {
    self.base_url = Some(base_url);
    self
  }

  pub(crate) fn relative_storage_path(&self) -> &str {
    let path = self.relative_storage_path.trim_matches('/');
    if path.is_empty() {
      warn!("relative storage path can not be empty, using default");
      return DEFAULT_NAMESPACE;
    }
    path
  }
}

fn default_expiration_time() -> Duration {
  Duration::from_secs(2 * 3600)
}
