//! In-memory adapters for integration tests
//!
//! Fakes of the store, cache and bus that honour the same contracts as the
//! Postgres, Redis and Redis pub/sub implementations, with failure and latency
//! injection.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use content_service::bus::{MessageHandler, ModerationTransport, TransportError};
use content_service::cache::{CacheError, CacheKey, ContentCache};
use content_service::db::{ContentRepository, StoreError};
use content_service::models::fields::{decode_record, encode_record, item_fields};
use content_service::models::{
    Article, Content, FieldValue, Filter, FilterOp, Meme, NaturalKey, NewsItem, Patch, Wallpaper,
};
use content_service::moderation::ModerationSubmitter;
use content_service::services::{ContentService, ContentServices};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==================== Store ====================

pub struct InMemoryRepository<T> {
    records: Mutex<Vec<T>>,
    fail_io: AtomicBool,
    delay: Mutex<Duration>,
}

impl<T: Content> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_io: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_io.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn get(&self, key: &NaturalKey) -> Option<T> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|item| &item.natural_key() == key)
            .cloned()
    }

    /// Insert directly, bypassing the service.
    pub fn seed(&self, item: T) {
        self.records.lock().unwrap().push(item);
    }

    async fn simulate(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(StoreError::Io("connection reset".to_string()));
        }
        Ok(())
    }
}

fn matches_filter<T: Content>(item: &T, filter: &Filter) -> bool {
    let fields: HashMap<_, _> = match item_fields(item) {
        Ok(fields) => fields.into_iter().collect(),
        Err(_) => return false,
    };

    filter.conditions().iter().all(|cond| {
        match (cond.op, fields.get(cond.field.as_str()), &cond.value) {
            (FilterOp::Eq, Some(actual), expected) => actual == expected,
            (FilterOp::Contains, Some(FieldValue::TextList(items)), FieldValue::Text(needle)) => {
                items.contains(needle)
            }
            _ => false,
        }
    })
}

fn apply_patch<T: Content>(item: &T, patch: &Patch) -> T {
    let mut value = serde_json::to_value(item).unwrap();
    let object = value.as_object_mut().unwrap();
    for (field, change) in patch.changes() {
        object.insert(field.clone(), change.to_json());
    }
    serde_json::from_value(value).unwrap()
}

fn created_at<T: Content>(item: &T) -> chrono::DateTime<Utc> {
    item_fields(item)
        .unwrap()
        .into_iter()
        .find_map(|(name, value)| match (name, value) {
            ("created_at", FieldValue::Timestamp(ts)) => Some(ts),
            _ => None,
        })
        .unwrap()
}

#[async_trait]
impl<T: Content> ContentRepository<T> for InMemoryRepository<T> {
    async fn create(&self, item: &T) -> Result<(), StoreError> {
        self.simulate().await?;
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.natural_key() == item.natural_key()) {
            return Err(StoreError::DuplicateKey);
        }
        records.push(item.clone());
        Ok(())
    }

    async fn update(&self, key: &NaturalKey, patch: &Patch) -> Result<u64, StoreError> {
        self.simulate().await?;
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| &r.natural_key() == key) {
            Some(record) => {
                *record = apply_patch(record, patch);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, key: &NaturalKey) -> Result<u64, StoreError> {
        self.simulate().await?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| &r.natural_key() != key);
        Ok((before - records.len()) as u64)
    }

    async fn find_one(&self, key: &NaturalKey) -> Result<T, StoreError> {
        self.simulate().await?;
        self.get(key).ok_or(StoreError::NotFound)
    }

    async fn find_many(&self, filter: &Filter, limit: i64) -> Result<Vec<T>, StoreError> {
        self.simulate().await?;
        let mut items: Vec<T> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|item| matches_filter(*item, filter))
            .cloned()
            .collect();
        items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
        items.truncate(limit as usize);
        Ok(items)
    }
}

// ==================== Cache ====================

pub struct InMemoryCache<T> {
    records: Mutex<HashMap<String, HashMap<String, String>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_delay: Mutex<Duration>,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T: Content> InMemoryCache<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            read_delay: Mutex::new(Duration::ZERO),
            _kind: std::marker::PhantomData,
        }
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.records
            .lock()
            .unwrap()
            .contains_key(&CacheKey::content(T::KIND, key))
    }

    pub fn field(&self, key: &NaturalKey, field: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&CacheKey::content(T::KIND, key))
            .and_then(|record| record.get(field).cloned())
    }

    /// Store a raw hash, e.g. a corrupted record.
    pub fn insert_raw(&self, key: &NaturalKey, record: HashMap<String, String>) {
        self.records
            .lock()
            .unwrap()
            .insert(CacheKey::content(T::KIND, key), record);
    }

    /// Store an item without going through the service.
    pub fn seed(&self, item: &T) {
        let record = encode_record(item)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.insert_raw(&item.natural_key(), record);
    }

    fn write_error() -> CacheError {
        CacheError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "cache unavailable",
        )))
    }
}

#[async_trait]
impl<T: Content> ContentCache<T> for InMemoryCache<T> {
    async fn put(&self, item: &T) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.seed(item);
        Ok(())
    }

    async fn get(&self, key: &NaturalKey) -> Result<T, CacheError> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }

        let record = self
            .records
            .lock()
            .unwrap()
            .get(&CacheKey::content(T::KIND, key))
            .cloned()
            .ok_or(CacheError::NotFound)?;
        Ok(decode_record::<T>(&record)?)
    }

    async fn patch_field(
        &self,
        key: &NaturalKey,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&CacheKey::content(T::KIND, key)) {
            Some(record) => {
                record.insert(field.to_string(), value.encode());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &NaturalKey) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.records
            .lock()
            .unwrap()
            .remove(&CacheKey::content(T::KIND, key));
        Ok(())
    }
}

// ==================== Bus ====================

#[derive(Default)]
pub struct InMemoryTransport {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    handlers: Mutex<HashMap<String, Vec<MessageHandler>>>,
    fail_publish: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_publish.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_on(&self, channel: &str) -> Vec<Vec<u8>> {
        self.published()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| payload)
            .collect()
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.handlers.lock().unwrap().keys().cloned().collect();
        channels.sort();
        channels
    }

    /// Deliver a message to every handler of `channel`, one after another.
    pub async fn deliver(&self, channel: &str, payload: &[u8]) {
        let handlers = self
            .handlers
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(payload.to_vec()).await;
        }
    }
}

#[async_trait]
impl ModerationTransport for InMemoryTransport {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("bus down".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: MessageHandler,
    ) -> Result<(), TransportError> {
        self.handlers
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }
}

// ==================== Fixtures ====================

pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

pub struct Harness<T: Content> {
    pub repo: Arc<InMemoryRepository<T>>,
    pub cache: Arc<InMemoryCache<T>>,
    pub service: Arc<ContentService<T>>,
}

impl<T: Content> Harness<T> {
    pub fn new(submitter: Option<Arc<ModerationSubmitter>>) -> Self {
        Self::with_timeout(submitter, TEST_TIMEOUT)
    }

    pub fn with_timeout(submitter: Option<Arc<ModerationSubmitter>>, timeout: Duration) -> Self {
        let repo = Arc::new(InMemoryRepository::<T>::new());
        let cache = Arc::new(InMemoryCache::<T>::new());

        let service = ContentService::new(
            repo.clone(),
            cache.clone(),
            timeout,
            tracing::info_span!("test_content_service", kind = T::KIND.as_str()),
        );
        let service = match submitter {
            Some(submitter) => service.with_moderation(submitter),
            None => service,
        };

        Self {
            repo,
            cache,
            service: Arc::new(service),
        }
    }
}

pub fn submitter(transport: &Arc<InMemoryTransport>) -> Arc<ModerationSubmitter> {
    Arc::new(ModerationSubmitter::new(
        transport.clone(),
        tracing::info_span!("test_submitter"),
    ))
}

/// Every kind wired to in-memory adapters, with news and wallpapers reviewed.
pub struct Platform {
    pub transport: Arc<InMemoryTransport>,
    pub articles: Harness<Article>,
    pub memes: Harness<Meme>,
    pub wallpapers: Harness<Wallpaper>,
    pub news: Harness<NewsItem>,
}

impl Platform {
    pub fn new() -> Self {
        let transport = Arc::new(InMemoryTransport::new());
        let reviewed = submitter(&transport);

        Self {
            articles: Harness::new(None),
            memes: Harness::new(None),
            wallpapers: Harness::new(Some(reviewed.clone())),
            news: Harness::new(Some(reviewed)),
            transport,
        }
    }

    pub fn services(&self) -> ContentServices {
        ContentServices {
            articles: self.articles.service.clone(),
            memes: self.memes.service.clone(),
            wallpapers: self.wallpapers.service.clone(),
            news: self.news.service.clone(),
        }
    }
}

pub fn timestamp(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
}

pub fn article(author: &str, title: &str) -> Article {
    Article {
        author: author.to_string(),
        title: title.to_string(),
        topics: vec!["lore".to_string()],
        content: "x".to_string(),
        created_at: timestamp(0),
    }
}

pub fn meme(image_name: &str, author: &str) -> Meme {
    Meme {
        image_name: image_name.to_string(),
        author: author.to_string(),
        topics: vec!["goblins".to_string()],
        description: "a goblin".to_string(),
        created_at: timestamp(0),
    }
}

pub fn wallpaper(image_name: &str, topic: &str) -> Wallpaper {
    Wallpaper {
        image_name: image_name.to_string(),
        topic: topic.to_string(),
        author: "painter".to_string(),
        title: "Misty forest".to_string(),
        created_at: timestamp(0),
    }
}

pub fn news(author: &str, title: &str) -> NewsItem {
    NewsItem {
        author: author.to_string(),
        title: title.to_string(),
        topic: "war".to_string(),
        censor: 0,
        content: "The northern keep has fallen".to_string(),
        created_at: timestamp(0),
    }
}
