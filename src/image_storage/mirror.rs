use std::{
  fs,
  io::Write,
  path::{Path, PathBuf},
  sync::Arc,
};

use image::ImageFormat;
use tracing::info;

use super::path::derive_path;
use crate::{
  client::Fetch,
  error::{Error, Result},
};

/// Formats a downloaded payload may sniff as to be stored.
const ACCEPTED_FORMATS: &[ImageFormat] = &[
  ImageFormat::Jpeg,
  ImageFormat::Png,
  ImageFormat::Gif,
  ImageFormat::WebP,
  ImageFormat::Bmp,
];

/// Downloads images into a local directory tree laid out by
/// [`derive_path`](super::derive_path).
pub struct ImageMirror {
  root: PathBuf,
  fetch: Arc<dyn Fetch>,
}

impl ImageMirror {
  pub fn new(root: impl Into<PathBuf>, fetch: Arc<dyn Fetch>) -> Self {
    Self {
      root: root.into(),
      fetch,
    }
  }

  /// Absolute disk path the image at `url` is written to.
  pub fn internal_path(&self, url: &str) -> Result<PathBuf> {
    Ok(self.root.join(derive_path(url)?))
  }

  /// Store a local copy of the image at `url` unless one exists.
  pub fn mirror(&self, url: &str) -> Result<()> {
    let path = self.internal_path(url)?;
    if path.is_file() {
      return Ok(());
    }

    let content = self.fetch.get(url)?;
    if !is_accepted_image(&content) {
      return Err(Error::Security(url.to_string()));
    }

    write_atomic(&path, &content)?;
    info!("mirrored image {} to {}", url, path.display());
    Ok(())
  }
}

fn is_accepted_image(content: &[u8]) -> bool {
  image::guess_format(content)
    .map(|format| ACCEPTED_FORMATS.contains(&format))
    .unwrap_or(false)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(dir)?;

  let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
  tmp.write_all(content)?;
  tmp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

#[cfg(test)]
mod test {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;

  const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";
  const GIF: &[u8] = b"GIF89a\x01\0\x01\0\0\0\0;";
  const IMAGE_URL: &str = "https://x.example/a.png";

  struct StubFetch {
    body: Mutex<Vec<u8>>,
    calls: AtomicUsize,
  }

  impl StubFetch {
    fn new(body: &[u8]) -> Arc<Self> {
      Arc::new(Self {
        body: Mutex::new(body.to_vec()),
        calls: AtomicUsize::new(0),
      })
    }
  }

  impl Fetch for StubFetch {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let body = self.body.lock().unwrap().clone();
      if body.is_empty() {
        return Err(Error::fetch(url, "empty response body"));
      }
      Ok(body)
    }
  }

  #[test]
  fn test_mirror_writes_image() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = StubFetch::new(PNG);
    let mirror = ImageMirror::new(dir.path(), fetch.clone());

    mirror.mirror(IMAGE_URL).unwrap();

    let path = dir.path().join("75493a7/75493a7-a.png");
    assert_eq!(mirror.internal_path(IMAGE_URL).unwrap(), path);
    assert_eq!(fs::read(path).unwrap(), PNG);
  }

  #[test]
  fn test_mirror_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = StubFetch::new(GIF);
    let mirror = ImageMirror::new(dir.path(), fetch.clone());

    mirror.mirror("https://x.example/b.gif").unwrap();
    mirror.mirror("https://x.example/b.gif").unwrap();

    assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_non_image_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = StubFetch::new(b"<html><body>not an image</body></html>");
    let mirror = ImageMirror::new(dir.path(), fetch.clone());

    let err = mirror.mirror(IMAGE_URL).unwrap_err();

    assert!(matches!(err, Error::Security(_)));
    assert!(!mirror.internal_path(IMAGE_URL).unwrap().exists());
  }

  #[test]
  fn test_image_extension_is_not_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = StubFetch::new(PNG);
    let mirror = ImageMirror::new(dir.path(), fetch.clone());

    // the URL claims a script, the content decides
    mirror.mirror("https://x.example/a.js").unwrap();
    *fetch.body.lock().unwrap() = b"alert(1)".to_vec();
    assert!(matches!(
      mirror.mirror("https://x.example/b.jpg"),
      Err(Error::Security(_))
    ));
  }

  #[test]
  fn test_invalid_url_is_not_fetched() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = StubFetch::new(PNG);
    let mirror = ImageMirror::new(dir.path(), fetch.clone());

    assert!(matches!(
      mirror.mirror("/relative.png"),
      Err(Error::InvalidUrl(_))
    ));
    assert_eq!(fetch.calls.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_fetch_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = StubFetch::new(b"");
    let mirror = ImageMirror::new(dir.path(), fetch.clone());

    assert!(matches!(mirror.mirror(IMAGE_URL), Err(Error::Fetch { .. })));
  }
}
