/// Data models for moderated content
///
/// Every content kind (articles, memes, wallpapers, news) is a plain struct that
/// implements [`Content`]. The trait carries the kind's static field schema, which
/// drives SQL column lists, cache record encoding, filter and patch validation.
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use std::fmt;

pub mod envelope;
pub mod fields;
pub mod query;

pub use envelope::{ModerationEnvelope, ModerationStatus, Verdict};
pub use fields::{FieldError, FieldSpec, FieldType, FieldValue};
pub use query::{Condition, Filter, FilterOp, Patch};

/// The content kinds served by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    Meme,
    Wallpaper,
    News,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Article,
        ContentKind::Meme,
        ContentKind::Wallpaper,
        ContentKind::News,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Meme => "meme",
            ContentKind::Wallpaper => "wallpaper",
            ContentKind::News => "news",
        }
    }

    /// Parse a kind name, accepting the plural forms used in routes.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "article" | "articles" => Some(ContentKind::Article),
            "meme" | "memes" => Some(ContentKind::Meme),
            "wallpaper" | "wallpapers" => Some(ContentKind::Wallpaper),
            "news" | "new" => Some(ContentKind::News),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite natural key of a content item, in the kind's key-field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub first: String,
    pub second: String,
}

impl NaturalKey {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn parts(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }

    /// Reject keys with a blank part.
    pub fn validate<T: Content>(&self) -> Result<(), FieldError> {
        for (field, part) in T::KEY_FIELDS.iter().zip(self.parts()) {
            if part.trim().is_empty() {
                return Err(FieldError::InvalidValue {
                    field: field.to_string(),
                    reason: "key field must not be blank".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Extract the key fields of `T` from a JSON object.
    ///
    /// Accepts both the snake_case field names and their camelCase spelling
    /// (`image_name` / `imageName`).
    pub fn from_payload<T: Content>(payload: &serde_json::Value) -> Option<Self> {
        let object = payload.as_object()?;
        let lookup = |field: &str| -> Option<String> {
            object
                .get(field)
                .or_else(|| object.get(&camel_case(field)))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let [first, second] = T::KEY_FIELDS;
        Some(Self::new(lookup(first)?, lookup(second)?))
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.second)
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// A storable, cacheable, moderatable content kind.
pub trait Content:
    Serialize
    + DeserializeOwned
    + Clone
    + fmt::Debug
    + Send
    + Sync
    + Unpin
    + 'static
    + for<'r> FromRow<'r, PgRow>
{
    const KIND: ContentKind;
    /// Postgres table holding this kind.
    const TABLE: &'static str;
    /// Natural key fields, in key order.
    const KEY_FIELDS: [&'static str; 2];
    /// Every persisted field, key fields included.
    const FIELDS: &'static [FieldSpec];

    fn natural_key(&self) -> NaturalKey;

    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|spec| spec.name == name)
    }

    fn is_key_field(name: &str) -> bool {
        Self::KEY_FIELDS.contains(&name)
    }
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(alias = "timestamp", default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Content for Article {
    const KIND: ContentKind = ContentKind::Article;
    const TABLE: &'static str = "articles";
    const KEY_FIELDS: [&'static str; 2] = ["author", "title"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("author", FieldType::Text),
        FieldSpec::new("title", FieldType::Text),
        FieldSpec::new("topics", FieldType::TextList),
        FieldSpec::new("content", FieldType::Text),
        FieldSpec::new("created_at", FieldType::Timestamp),
    ];

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.author, &self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Meme {
    #[serde(alias = "imageName")]
    pub image_name: String,
    pub author: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "timestamp", default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Content for Meme {
    const KIND: ContentKind = ContentKind::Meme;
    const TABLE: &'static str = "memes";
    const KEY_FIELDS: [&'static str; 2] = ["image_name", "author"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("image_name", FieldType::Text),
        FieldSpec::new("author", FieldType::Text),
        FieldSpec::new("topics", FieldType::TextList),
        FieldSpec::new("description", FieldType::Text),
        FieldSpec::new("created_at", FieldType::Timestamp),
    ];

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.image_name, &self.author)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Wallpaper {
    #[serde(alias = "imageName")]
    pub image_name: String,
    pub topic: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "timestamp", default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Content for Wallpaper {
    const KIND: ContentKind = ContentKind::Wallpaper;
    const TABLE: &'static str = "wallpapers";
    const KEY_FIELDS: [&'static str; 2] = ["image_name", "topic"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("image_name", FieldType::Text),
        FieldSpec::new("topic", FieldType::Text),
        FieldSpec::new("author", FieldType::Text),
        FieldSpec::new("title", FieldType::Text),
        FieldSpec::new("created_at", FieldType::Timestamp),
    ];

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.image_name, &self.topic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NewsItem {
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub topic: String,
    /// Censorship level assigned by the editor (0 = none).
    #[serde(default)]
    pub censor: i16,
    #[serde(default)]
    pub content: String,
    #[serde(alias = "timestamp", default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Content for NewsItem {
    const KIND: ContentKind = ContentKind::News;
    const TABLE: &'static str = "news";
    const KEY_FIELDS: [&'static str; 2] = ["author", "title"];
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("author", FieldType::Text),
        FieldSpec::new("title", FieldType::Text),
        FieldSpec::new("topic", FieldType::Text),
        FieldSpec::new("censor", FieldType::SmallInt),
        FieldSpec::new("content", FieldType::Text),
        FieldSpec::new("created_at", FieldType::Timestamp),
    ];

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.author, &self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names_round_trip_through_parse() {
        for kind in ContentKind::ALL {
            assert_eq!(ContentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentKind::parse("Wallpapers"), Some(ContentKind::Wallpaper));
        assert_eq!(ContentKind::parse("videos"), None);
    }

    #[test]
    fn test_key_from_payload_accepts_camel_case() {
        let key = NaturalKey::from_payload::<Wallpaper>(&json!({
            "imageName": "img1",
            "topic": "nature"
        }))
        .unwrap();
        assert_eq!(key, NaturalKey::new("img1", "nature"));
    }

    #[test]
    fn test_key_from_payload_requires_both_parts() {
        assert!(NaturalKey::from_payload::<Article>(&json!({"author": "A"})).is_none());
        assert!(NaturalKey::from_payload::<Article>(&json!(["A", "T"])).is_none());
    }

    #[test]
    fn test_blank_key_is_rejected() {
        assert!(NaturalKey::new("A", "T").validate::<Article>().is_ok());
        assert!(NaturalKey::new("  ", "T").validate::<Article>().is_err());
        assert!(NaturalKey::new("img", "").validate::<Meme>().is_err());
    }

    #[test]
    fn test_article_accepts_timestamp_alias_and_defaults() {
        let article: Article = serde_json::from_value(json!({
            "author": "A",
            "title": "T",
            "timestamp": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert!(article.topics.is_empty());
        assert_eq!(article.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_field_schema_covers_key_fields() {
        fn check<T: Content>() {
            for key in T::KEY_FIELDS {
                assert!(T::field(key).is_some(), "{} missing {}", T::KIND, key);
            }
        }
        check::<Article>();
        check::<Meme>();
        check::<Wallpaper>();
        check::<NewsItem>();
    }
}
