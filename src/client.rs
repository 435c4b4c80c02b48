use std::time::Duration;

use mime::Mime;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  error::{Error, Result},
  util,
};

/// Something that can download the bytes behind a URL.
///
/// Implementations return [`Error::Fetch`] whenever no usable bytes came
/// back: connection failures, timeouts, error statuses and empty bodies.
pub trait Fetch: Send + Sync {
  fn get(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientConfig {
  user_agent: Option<String>,
  accept: Option<String>,
  referer: Option<String>,
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  timeout: Duration,
  /// Skip TLS certificate validation. Some image hosts serve broken
  /// certificate chains.
  accept_invalid_certs: bool,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      user_agent: None,
      accept: None,
      referer: None,
      timeout: default_timeout(),
      accept_invalid_certs: false,
    }
  }
}

impl ClientConfig {
  fn to_builder(&self) -> Result<reqwest::blocking::ClientBuilder> {
    let mut builder = reqwest::blocking::Client::builder();

    if let Some(user_agent) = &self.user_agent {
      builder = builder.user_agent(user_agent);
    } else {
      builder = builder.user_agent(util::USER_AGENT);
    }

    let mut header_map = HeaderMap::new();
    if let Some(accept) = &self.accept {
      header_map.append("Accept", header_value("Accept", accept)?);
    }

    if let Some(referer) = &self.referer {
      header_map.append("Referer", header_value("Referer", referer)?);
    }

    if !header_map.is_empty() {
      builder = builder.default_headers(header_map);
    }

    builder = builder
      .timeout(self.timeout)
      .danger_accept_invalid_certs(self.accept_invalid_certs);

    Ok(builder)
  }

  pub fn build(&self) -> Result<Client> {
    let client = self.to_builder()?.build()?;
    Ok(Client { client })
  }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
  value.try_into().map_err(|e| {
    Error::Config(format!("invalid {name} header {value:?}: {e}"))
  })
}

/// Blocking HTTP client used for both feeds and images.
pub struct Client {
  client: reqwest::blocking::Client,
}

impl Fetch for Client {
  fn get(&self, url: &str) -> Result<Vec<u8>> {
    let resp = self
      .client
      .get(url)
      .send()
      .map_err(|e| Error::fetch(url, e))?;
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
      return Err(Error::fetch(url, format!("HTTP status {status}")));
    }

    let content_type = resp
      .headers()
      .get("content-type")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.parse::<Mime>().ok());
    let body = resp.bytes().map_err(|e| Error::fetch(url, e))?.to_vec();
    if body.is_empty() {
      return Err(Error::fetch(url, "empty response body"));
    }

    debug!("fetched {} bytes from {}", body.len(), url);
    Ok(normalize_charset(content_type.as_ref(), body))
  }
}

/// Re-encode textual responses that declare a non UTF-8 charset.
fn normalize_charset(content_type: Option<&Mime>, body: Vec<u8>) -> Vec<u8> {
  let Some(mime) = content_type else {
    return body;
  };
  let textual = mime.type_() == mime::TEXT
    || mime.subtype() == mime::XML
    || mime.suffix() == Some(mime::XML);
  if !textual || declares_xml_encoding(&body) {
    return body;
  }

  let Some(encoding) = mime.get_param(mime::CHARSET).and_then(|charset| {
    encoding_rs::Encoding::for_label(charset.as_str().as_bytes())
  }) else {
    return body;
  };
  if encoding == encoding_rs::UTF_8 {
    return body;
  }

  let (text, _, _) = encoding.decode(&body);
  text.into_owned().into_bytes()
}

// the parser honours an encoding named in the XML declaration itself
fn declares_xml_encoding(body: &[u8]) -> bool {
  let head = &body[..body.len().min(128)];
  let Some(end) = head.windows(2).position(|w| w == b"?>") else {
    return false;
  };
  let decl = &head[..end];
  decl.starts_with(b"<?xml")
    && decl.windows(b"encoding".len()).any(|w| w == b"encoding")
}

fn default_timeout() -> Duration {
  Duration::from_secs(10)
}
