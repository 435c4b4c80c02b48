use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  image_storage::ImageStorage,
};

/// One syndicated article.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
  title: String,
  description: String,
  link: String,
  published_at: DateTime<FixedOffset>,
  creator: Option<String>,
  categories: Vec<String>,
  main_image_url: Option<String>,
  #[serde(skip)]
  image_storage: Option<Arc<ImageStorage>>,
}

impl Post {
  pub fn builder(
    title: impl Into<String>,
    description: impl Into<String>,
    link: impl Into<String>,
    published_at: DateTime<FixedOffset>,
  ) -> PostBuilder {
    PostBuilder {
      post: Post {
        title: title.into(),
        description: description.into(),
        link: link.into(),
        published_at,
        creator: None,
        categories: Vec::new(),
        main_image_url: None,
        image_storage: None,
      },
    }
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn link(&self) -> &str {
    &self.link
  }

  pub fn published_at(&self) -> DateTime<FixedOffset> {
    self.published_at
  }

  pub fn creator(&self) -> Option<&str> {
    self.creator.as_deref()
  }

  pub fn categories(&self) -> &[String] {
    &self.categories
  }

  /// Origin URL of the first image found in the description.
  pub fn main_image_url(&self) -> Option<&str> {
    self.main_image_url.as_deref()
  }

  /// Storage relative path of the mirrored main image.
  pub fn relative_image_url(&self) -> Result<Option<String>> {
    self.resolve_image(ImageStorage::relative_internal_url)
  }

  /// Public URL of the mirrored main image.
  pub fn absolute_image_url(&self) -> Result<Option<String>> {
    self.resolve_image(ImageStorage::absolute_internal_url)
  }

  fn resolve_image(
    &self,
    f: impl FnOnce(&ImageStorage, &str) -> Result<String>,
  ) -> Result<Option<String>> {
    let Some(url) = &self.main_image_url else {
      return Ok(None);
    };
    let storage = self
      .image_storage
      .as_deref()
      .ok_or(Error::ImageStorageMissing)?;
    f(storage, url).map(Some)
  }

  pub(crate) fn attach_image_storage(&mut self, storage: Arc<ImageStorage>) {
    self.image_storage = Some(storage);
  }
}

pub struct PostBuilder {
  post: Post,
}

impl PostBuilder {
  pub fn creator(mut self, creator: Option<String>) -> Self {
    self.post.creator = creator;
    self
  }

  pub fn categories(mut self, categories: Vec<String>) -> Self {
    self.post.categories = categories;
    self
  }

  pub fn main_image_url(mut self, main_image_url: Option<String>) -> Self {
    self.post.main_image_url = main_image_url;
    self
  }

  pub fn image_storage(mut self, storage: Arc<ImageStorage>) -> Self {
    self.post.image_storage = Some(storage);
    self
  }

  pub fn build(self) -> Post {
    self.post
  }
}

#[cfg(test)]
mod test {
  use chrono::Utc;

  use super::*;

  fn post(main_image_url: Option<&str>) -> PostBuilder {
    Post::builder("Title", "Body", "https://example.com/p/1", Utc::now().into())
      .main_image_url(main_image_url.map(String::from))
  }

  #[test]
  fn test_builder_fields() {
    let post = post(None)
      .creator(Some("jane".into()))
      .categories(vec!["rust".into(), "feeds".into()])
      .build();

    assert_eq!(post.title(), "Title");
    assert_eq!(post.description(), "Body");
    assert_eq!(post.link(), "https://example.com/p/1");
    assert_eq!(post.creator(), Some("jane"));
    assert_eq!(post.categories(), ["rust", "feeds"]);
    assert_eq!(post.main_image_url(), None);
  }

  #[test]
  fn test_no_image_needs_no_storage() {
    let post = post(None).build();
    assert_eq!(post.relative_image_url().unwrap(), None);
    assert_eq!(post.absolute_image_url().unwrap(), None);
  }

  #[test]
  fn test_image_without_storage() {
    let post = post(Some("https://x.example/a.png")).build();
    assert!(matches!(
      post.relative_image_url(),
      Err(Error::ImageStorageMissing)
    ));
  }

  #[test]
  fn test_image_urls_resolve_through_storage() {
    let post = post(Some("https://x.example/a.png"))
      .image_storage(Arc::new(ImageStorage::default()))
      .build();

    assert_eq!(
      post.relative_image_url().unwrap().as_deref(),
      Some("75493a7/75493a7-a.png")
    );
    assert_eq!(
      post.absolute_image_url().unwrap().as_deref(),
      Some("/wordpress-post-feed/75493a7/75493a7-a.png")
    );
  }

  #[test]
  fn test_serialized_post_drops_storage() {
    let post = post(Some("https://x.example/a.png"))
      .image_storage(Arc::new(ImageStorage::default()))
      .build();

    let json = serde_json::to_string(&post).unwrap();
    let restored: Post = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.main_image_url(), post.main_image_url());
    assert!(restored.image_storage.is_none());
  }
}
