// Re-export modules
pub mod disk;

pub use disk::DiskCache;

use bytes::Bytes;
use mime::Mime;

/// Payload kinds the cache knows how to store.
///
/// Anything else is proxied but never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Jpeg,
    Png,
}

impl ContentKind {
    /// Classify a WMTS query string by its `FORMAT=` marker.
    ///
    /// JPEG wins when both markers are present.
    pub fn from_query(query: &str) -> Option<Self> {
        if query.contains("FORMAT=image/jpeg") {
            Some(ContentKind::Jpeg)
        } else if query.contains("FORMAT=image/png") {
            Some(ContentKind::Png)
        } else {
            None
        }
    }

    /// Classify a response `Content-Type` value. Parameters are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let parsed = content_type.trim().parse::<Mime>().ok()?;
        match parsed.essence_str() {
            "image/jpeg" => Some(ContentKind::Jpeg),
            "image/png" => Some(ContentKind::Png),
            _ => None,
        }
    }

    pub fn mime(self) -> Mime {
        match self {
            ContentKind::Jpeg => mime::IMAGE_JPEG,
            ContentKind::Png => mime::IMAGE_PNG,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContentKind::Jpeg => "jpg",
            ContentKind::Png => "png",
        }
    }
}

/// A stored response: the query it answers, its content type and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub query: String,
    pub content_type: String,
    pub contents: Bytes,
}

impl CacheEntry {
    pub fn new(query: impl Into<String>, content_type: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            query: query.into(),
            content_type: content_type.into(),
            contents: contents.into(),
        }
    }
}

/// File name an entry is stored under: `/` and `&` become `_`, plus the kind's extension.
///
/// Distinct queries may collide after escaping; the last write wins.
pub fn stored_file_name(query: &str, kind: ContentKind) -> String {
    let escaped = query.replace(&['/', '&'][..], "_");
    format!("{}.{}", escaped, kind.extension())
}

/// Trait for cache backends
#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    /// Look up the entry for a raw query string. Unclassifiable queries always miss.
    async fn try_get(&self, query: &str) -> crate::Result<Option<CacheEntry>>;

    /// Store an entry, replacing any previous one for the same stored path.
    /// Entries whose content type has no known extension are skipped with a warning.
    async fn put(&self, entry: &CacheEntry) -> crate::Result<()>;
}
