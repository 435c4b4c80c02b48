use std::borrow::Cow;

use regex::{Captures, Regex};

lazy_static::lazy_static! {
  static ref IMAGE_REGEX: Regex =
    Regex::new(r#"<img\s[^>]*?src="([^"]+)"[^>]*?>"#).unwrap();
  static ref LEADING_PARAGRAPH_REGEX: Regex =
    Regex::new(r"^<p>(.+?)</p>.*").unwrap();
  static ref TAG_REGEX: Regex = Regex::new(r"<[^>]*>").unwrap();
  static ref ENTITY_REGEX: Regex =
    Regex::new(r"&(?:[a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
  pub text: String,
  pub main_image_url: Option<String>,
}

/// Reduce an item description to its first paragraph of text and pull
/// out the first inline image.
///
/// Only the first `<img>` tag with a double quoted `src` is extracted
/// and removed. Any later images stay in the text untouched.
pub fn hydrate(raw: &str) -> Description {
  let mut main_image_url = None;
  let mut text = Cow::Borrowed(raw);

  if let Some(caps) = IMAGE_REGEX.captures(raw) {
    let tag = caps.get_match();
    main_image_url = Some(caps[1].trim().to_string());
    text = Cow::Owned(remove_span(raw, tag.start(), tag.end()));
  }

  let text = text.trim().replace('\n', " ");
  let text = LEADING_PARAGRAPH_REGEX.replace(&text, "$1");

  Description {
    text: decode_entities(text.trim()),
    main_image_url,
  }
}

/// Remove tags the way a plain text title expects, without touching
/// entities.
pub fn strip_tags(s: &str) -> String {
  TAG_REGEX.replace_all(s, "").into_owned()
}

// cut out `raw[start..end]`, merging the whitespace on both sides of it
fn remove_span(raw: &str, start: usize, end: usize) -> String {
  let before = &raw[..start];
  let mut after = &raw[end..];
  if before.ends_with(char::is_whitespace) {
    after = after.trim_start();
  }
  format!("{before}{after}")
}

fn decode_entities(s: &str) -> String {
  ENTITY_REGEX
    .replace_all(s, |caps: &Captures| {
      // unknown entities stay as written
      htmlescape::decode_html(&caps[0]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
