mod description;
mod post;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
  cache::ContentCache,
  client::Fetch,
  config::FeedConfig,
  error::{Error, Result},
  image_storage::{ImageMirror, ImageStorage},
  util::parse_date_or_now,
};

pub use description::{Description, hydrate, strip_tags};
pub use post::{Post, PostBuilder};

/// Loads a remote RSS feed into [`Post`]s.
///
/// Two cache entries are kept per feed: the raw response keyed by URL,
/// and the parsed page of posts keyed by URL, limit, offset and a hash
/// of the raw response. Refreshing the raw entry therefore invalidates
/// every parsed page derived from it without touching them.
pub struct FeedLoader {
  config: FeedConfig,
  cache: Arc<dyn ContentCache>,
  fetch: Arc<dyn Fetch>,
  image_storage: Arc<ImageStorage>,
  image_mirror: Option<ImageMirror>,
}

impl FeedLoader {
  pub fn new(
    config: FeedConfig,
    cache: Arc<dyn ContentCache>,
    fetch: Arc<dyn Fetch>,
    image_storage: ImageStorage,
  ) -> Self {
    Self {
      config,
      cache,
      fetch,
      image_storage: Arc::new(image_storage),
      image_mirror: None,
    }
  }

  /// Also download each post's main image into `mirror`.
  pub fn with_image_mirror(mut self, mirror: ImageMirror) -> Self {
    self.image_mirror = Some(mirror);
    self
  }

  pub fn load(
    &self,
    url: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<Post>> {
    let offset = offset.unwrap_or(0);
    let raw = self.get_content(url, false)?;
    let key = parsed_cache_key(url, limit, offset, &raw);

    let posts = match self.load_parsed(&key) {
      Some(posts) => {
        debug!("parsed cache hit for {}", url);
        posts
      }
      None => {
        debug!("parsed cache miss for {}", url);
        let posts = paginate(parse_posts(&raw)?, limit, offset);
        self.mirror_images(&posts);
        self.save_parsed(&key, &posts);
        posts
      }
    };

    Ok(self.attach_image_storage(posts))
  }

  /// Re-download the raw feed and overwrite its cache entry.
  pub fn update_cache(&self, url: &str) -> Result<()> {
    self.get_content(url, true).map(|_| ())
  }

  /// Drop every entry this loader has written.
  pub fn clear_cache(&self) {
    self.cache.clear(&self.config.namespace);
  }

  fn get_content(&self, url: &str, flush: bool) -> Result<Vec<u8>> {
    if !flush {
      let cached = self.cache.load(&self.config.namespace, url);
      if let Some(raw) = cached.filter(|raw| !raw.is_empty()) {
        return Ok(raw);
      }
    }

    let raw = self.fetch.get(url)?;
    if raw.is_empty() {
      return Err(Error::fetch(url, "empty response body"));
    }
    info!("fetched feed {} ({} bytes)", url, raw.len());

    if let Err(e) = self.cache.save(
      &self.config.namespace,
      url,
      &raw,
      self.config.expiration_time,
    ) {
      warn!("{}", e);
    }

    Ok(raw)
  }

  fn load_parsed(&self, key: &str) -> Option<Vec<Post>> {
    let bytes = self.cache.load(&self.config.namespace, key)?;
    match serde_json::from_slice(&bytes) {
      Ok(posts) => Some(posts),
      Err(e) => {
        warn!("ignoring unreadable parsed cache entry {}: {}", key, e);
        None
      }
    }
  }

  fn save_parsed(&self, key: &str, posts: &[Post]) {
    let bytes = match serde_json::to_vec(posts) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!("failed to serialize posts for {}: {}", key, e);
        return;
      }
    };

    if let Err(e) = self.cache.save(
      &self.config.namespace,
      key,
      &bytes,
      self.config.expiration_time,
    ) {
      warn!("{}", e);
    }
  }

  fn mirror_images(&self, posts: &[Post]) {
    let Some(mirror) = &self.image_mirror else {
      return;
    };

    for url in posts.iter().filter_map(Post::main_image_url) {
      if let Err(e) = mirror.mirror(url) {
        warn!("failed to mirror image {}: {}", url, e);
      }
    }
  }

  fn attach_image_storage(&self, mut posts: Vec<Post>) -> Vec<Post> {
    for post in &mut posts {
      post.attach_image_storage(self.image_storage.clone());
    }
    posts
  }
}

fn parsed_cache_key(
  url: &str,
  limit: Option<usize>,
  offset: usize,
  raw: &[u8],
) -> String {
  let limit = limit.map(|l| l.to_string()).unwrap_or_default();
  let hash = blake3::hash(raw);
  format!("{}-{}-{}-{}", url, limit, offset, hash.to_hex())
}

/// Parse raw RSS bytes into posts, in document order.
pub fn parse_posts(raw: &[u8]) -> Result<Vec<Post>> {
  let channel = rss::Channel::read_from(raw)?;

  let posts = channel
    .items()
    .iter()
    .map(|item| {
      let description = hydrate(item.description().unwrap_or_default());
      let creator = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first())
        .map(String::as_str)
        .or(item.author())
        .map(String::from);
      let categories = item
        .categories()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

      Post::builder(
        strip_tags(item.title().unwrap_or_default()),
        description.text,
        item.link().unwrap_or_default(),
        parse_date_or_now(item.pub_date()),
      )
      .creator(creator)
      .categories(categories)
      .main_image_url(description.main_image_url)
      .build()
    })
    .collect();

  Ok(posts)
}

fn paginate(
  posts: Vec<Post>,
  limit: Option<usize>,
  offset: usize,
) -> Vec<Post> {
  let posts = posts.into_iter().skip(offset);
  match limit {
    Some(limit) => posts.take(limit).collect(),
    None => posts.collect(),
  }
}
