use crate::cache::{stored_file_name, Cache, CacheEntry, ContentKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Prefix of in-flight write files.
const TMP_PREFIX: &str = ".tmp-";

/// Write files have no extension; stored entries always end in `.jpg` or `.png`.
fn is_tmp_name(name: &str) -> bool {
    name.starts_with(TMP_PREFIX) && !name.ends_with(".jpg") && !name.ends_with(".png")
}

/// Disk-based cache, one file per distinct cacheable query.
///
/// Note: This implementation has limitations:
/// - No eviction policy
/// - No size limits
/// - Concurrent misses for one key each write; the last rename wins
pub struct DiskCache {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl DiskCache {
    /// Open the cache rooted at `dir`, creating the directory tree if needed.
    ///
    /// Write files left behind by an interrupted `put` are removed.
    pub async fn open(dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let stale = entry
                .file_name()
                .to_str()
                .map_or(false, is_tmp_name);
            if stale {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => tracing::info!("Removed stale write file {}", entry.path().display()),
                    Err(e) => tracing::warn!("Failed to remove stale write file {}: {}", entry.path().display(), e),
                }
            }
        }

        Ok(Self { dir, tmp_seq: AtomicU64::new(0) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, query: &str, kind: ContentKind) -> PathBuf {
        self.dir.join(stored_file_name(query, kind))
    }

    // Short and independent of the stored name, so it fits wherever the stored name fits
    fn tmp_path(&self) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{}{}-{}", TMP_PREFIX, std::process::id(), seq))
    }
}

#[async_trait::async_trait]
impl Cache for DiskCache {
    async fn try_get(&self, query: &str) -> crate::Result<Option<CacheEntry>> {
        let kind = match ContentKind::from_query(query) {
            Some(kind) => kind,
            None => return Ok(None),
        };

        let path = self.path_for(query, kind);
        match fs::read(&path).await {
            Ok(contents) => Ok(Some(CacheEntry::new(query, kind.mime().to_string(), contents))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, entry: &CacheEntry) -> crate::Result<()> {
        let kind = match ContentKind::from_content_type(&entry.content_type) {
            Some(kind) => kind,
            None => {
                tracing::warn!(
                    "Not caching response with unknown content type {:?} for query={}",
                    entry.content_type, entry.query
                );
                return Ok(());
            }
        };

        let path = self.path_for(&entry.query, kind);
        let tmp = self.tmp_path();

        // Whole file first, then rename into place
        if let Err(e) = fs::write(&tmp, &entry.contents).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!("Cached {} bytes at {}", entry.contents.len(), path.display());
        Ok(())
    }
}
