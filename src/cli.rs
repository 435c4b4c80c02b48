use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use feed_mirror::{
  Config, FeedLoader, FileCache, ImageMirror, ImageStorage, Post,
  client::Fetch, derive_path,
};

#[derive(Parser)]
#[clap(about = "Load RSS posts through a local cache and mirror their images")]
pub struct Cli {
  #[clap(subcommand)]
  subcmd: SubCommand,

  /// YAML config file. Defaults apply when omitted.
  #[clap(long, short, env = "FEED_MIRROR_CONFIG")]
  config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SubCommand {
  /// Print the posts of a feed
  Load(LoadConfig),
  /// Re-download a feed into the cache
  Update {
    /// The feed URL
    url: String,
  },
  /// Remove every cached feed and parsed result
  Clear,
  /// Print the local storage path of an image URL
  ImagePath {
    /// The origin URL of the image
    url: String,
  },
}

#[derive(Parser)]
struct LoadConfig {
  /// The feed URL
  url: String,
  /// Limit the number of posts
  #[clap(long, short('n'))]
  limit: Option<usize>,
  /// Skip this many posts first
  #[clap(long, short)]
  offset: Option<usize>,
  /// Print posts as JSON
  #[clap(long)]
  json: bool,
}

impl Cli {
  pub fn run(self) -> anyhow::Result<()> {
    let config = match &self.config {
      Some(path) => Config::load_from_file(path).with_context(|| {
        format!("failed to load config {}", path.display())
      })?,
      None => Config::default(),
    };

    match self.subcmd {
      SubCommand::Load(load) => {
        let loader = build_loader(&config)?;
        let posts = loader
          .load(&load.url, load.limit, load.offset)
          .with_context(|| format!("failed to load feed {}", load.url))?;
        print_posts(&posts, load.json)
      }
      SubCommand::Update { url } => {
        let loader = build_loader(&config)?;
        loader
          .update_cache(&url)
          .with_context(|| format!("failed to update feed {url}"))?;
        Ok(())
      }
      SubCommand::Clear => {
        build_loader(&config)?.clear_cache();
        Ok(())
      }
      SubCommand::ImagePath { url } => {
        let storage = ImageStorage::new(&config.images);
        println!("{}", derive_path(&url)?);
        println!("{}", storage.absolute_internal_url(&url)?);
        Ok(())
      }
    }
  }
}

fn build_loader(config: &Config) -> anyhow::Result<FeedLoader> {
  let client: Arc<dyn Fetch> = Arc::new(config.client.build()?);
  let cache_dir = config
    .cache_dir
    .clone()
    .unwrap_or_else(|| std::env::temp_dir().join(env!("CARGO_PKG_NAME")));

  let mut loader = FeedLoader::new(
    config.feed.clone(),
    Arc::new(FileCache::new(cache_dir)),
    client.clone(),
    ImageStorage::new(&config.images),
  );

  if let Some(storage_path) = &config.images.storage_path {
    loader = loader.with_image_mirror(ImageMirror::new(storage_path, client));
  }

  Ok(loader)
}

fn print_posts(posts: &[Post], json: bool) -> anyhow::Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(posts)?);
    return Ok(());
  }

  for post in posts {
    println!("{}  {}", post.published_at().format("%Y-%m-%d"), post.title());
    println!("    {}", post.link());
    if let Some(creator) = post.creator() {
      println!("    by {creator}");
    }
    if !post.categories().is_empty() {
      println!("    [{}]", post.categories().join(", "));
    }
    if let Some(image) = post.absolute_image_url()? {
      println!("    image: {image}");
    }
    if !post.description().is_empty() {
      println!("    {}", post.description());
    }
  }

  Ok(())
}
