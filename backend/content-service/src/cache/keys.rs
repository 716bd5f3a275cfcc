//! Cache key scheme
//!
//! Key format: {kind}:{key_part_1}:{key_part_2}

use crate::models::{ContentKind, NaturalKey};

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Record of one content item
    /// Format: article:{author}:{title}, wallpaper:{image_name}:{topic}, ...
    pub fn content(kind: ContentKind, key: &NaturalKey) -> String {
        format!("{}:{}:{}", kind.as_str(), key.first, key.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_format() {
        assert_eq!(
            CacheKey::content(ContentKind::Wallpaper, &NaturalKey::new("img1", "nature")),
            "wallpaper:img1:nature"
        );
        assert_eq!(
            CacheKey::content(ContentKind::Article, &NaturalKey::new("A", "T")),
            "article:A:T"
        );
    }
}
