//! Fetch an RSS feed, cache both the raw payload and the parsed posts,
//! and mirror each post's main image under a deterministic local path.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod image_storage;
pub mod util;

pub use cache::{ContentCache, FileCache, MemoryCache};
pub use client::{Client, ClientConfig, Fetch};
pub use config::{Config, FeedConfig, ImageStorageConfig};
pub use error::{CacheWriteError, Error, Result};
pub use feed::{FeedLoader, Post};
pub use image_storage::{ImageMirror, ImageStorage, derive_path};
