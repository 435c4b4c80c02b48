pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The cache backend refused to store an entry.
#[derive(Debug, thiserror::Error)]
#[error("failed to write cache entry {key:?}: {reason}")]
pub struct CacheWriteError {
  pub key: String,
  pub reason: String,
}

impl CacheWriteError {
  pub fn new(key: impl Into<String>, reason: impl ToString) -> Self {
    Self {
      key: key.into(),
      reason: reason.to_string(),
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("failed to fetch {url}: {reason}")]
  Fetch { url: String, reason: String },

  #[error(transparent)]
  CacheWrite(#[from] CacheWriteError),

  #[error("given input is not a valid absolute URL: {0:?}")]
  InvalidUrl(String),

  #[error(
    "security issue: downloaded file {0:?} is not a valid image, \
     content does not match an accepted image type"
  )]
  Security(String),

  #[error("feed parsing error: {0}")]
  Parse(String),

  #[error("image storage is not attached to this post")]
  ImageStorageMissing,

  #[error("IO error")]
  Io(#[from] std::io::Error),

  #[error("Reqwest client error {0:?}")]
  Reqwest(#[from] reqwest::Error),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("YAML config error")]
  Yaml(#[from] serde_yaml::Error),
}

impl Error {
  pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
    Error::Fetch {
      url: url.into(),
      reason: reason.to_string(),
    }
  }
}

impl From<rss::Error> for Error {
  fn from(e: rss::Error) -> Self {
    Error::Parse(e.to_string())
  }
}
