//! Deterministic mapping from an image's origin URL to its location in
//! the local mirror.
//!
//! Layout: `<prefix>/<short hash>-<base name>`. The prefix is `YYYY-MM`
//! for WordPress style upload paths and the short hash otherwise. The
//! layout is shared with trees mirrored by earlier deployments, so the
//! output must stay byte for byte stable.

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

const MAX_BASE_NAME_LEN: usize = 64;
const SHORT_HASH_LEN: usize = 7;

lazy_static::lazy_static! {
  static ref UPLOAD_DATE_REGEX: Regex =
    Regex::new(r"wp-content.+([0-9]{4})/([0-9]{2})").unwrap();
  static ref FILE_NAME_REGEX: Regex =
    Regex::new(r"^.*/([^/]+)\.([^.]+)$").unwrap();
}

/// Parse `url`, accepting only absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<Url> {
  let invalid = || Error::InvalidUrl(url.to_string());
  if url.trim().is_empty() {
    return Err(invalid());
  }

  let parsed = Url::parse(url).map_err(|_| invalid())?;
  if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
    return Err(invalid());
  }

  Ok(parsed)
}

/// Relative storage path for the image at `url`.
pub fn derive_path(url: &str) -> Result<String> {
  validate_url(url)?;

  let hash = short_hash(url);
  let prefix = match UPLOAD_DATE_REGEX.captures(url) {
    Some(caps) => format!("{}-{}", &caps[1], &caps[2]),
    None => hash.clone(),
  };

  Ok(format!("{}/{}-{}", prefix, hash, base_name(url)))
}

fn short_hash(url: &str) -> String {
  let digest = format!("{:x}", md5::compute(url.as_bytes()));
  digest[..SHORT_HASH_LEN].to_string()
}

fn base_name(url: &str) -> String {
  // an "extension" spanning a slash means the file name has none
  let caps = FILE_NAME_REGEX
    .captures(url)
    .filter(|caps| !caps[2].contains('/'));
  if let Some(caps) = caps {
    let mut stem = webalize(&caps[1]);
    stem.truncate(MAX_BASE_NAME_LEN);
    return format!("{}.{}", stem, caps[2].to_ascii_lowercase());
  }

  // no extension: fall back to the last path segment
  let segment = url
    .trim_end_matches('/')
    .rsplit('/')
    .next()
    .unwrap_or_default();
  let mut stem = webalize(segment);
  stem.truncate(MAX_BASE_NAME_LEN);
  if stem.is_empty() {
    return "image".to_string();
  }
  stem
}

/// Transliterate to ASCII, lowercase, and collapse every run of
/// characters outside `[a-z0-9]` into a single dash.
fn webalize(s: &str) -> String {
  let ascii = deunicode::deunicode(s).to_ascii_lowercase();

  let mut out = String::with_capacity(ascii.len());
  let mut pending_dash = false;
  for c in ascii.chars() {
    if c.is_ascii_lowercase() || c.is_ascii_digit() {
      if pending_dash && !out.is_empty() {
        out.push('-');
      }
      pending_dash = false;
      out.push(c);
    } else {
      pending_dash = true;
    }
  }

  out
}
