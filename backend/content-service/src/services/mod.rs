/// Business logic layer for content-service
///
/// This module provides high-level operations:
/// - Content service: per-kind create/update/delete/read with moderation
/// - Read race: concurrent store/cache single-record reads
/// - `ContentServices`: one service per content kind
pub mod content;
mod read_race;

pub use content::{ContentService, CreateOutcome, DEFAULT_OPERATION_TIMEOUT};

use crate::models::{Article, Meme, NewsItem, Wallpaper};
use std::sync::Arc;

/// One content service per kind, shared by the HTTP layer and the verdict
/// consumer.
#[derive(Clone)]
pub struct ContentServices {
    pub articles: Arc<ContentService<Article>>,
    pub memes: Arc<ContentService<Meme>>,
    pub wallpapers: Arc<ContentService<Wallpaper>>,
    pub news: Arc<ContentService<NewsItem>>,
}
