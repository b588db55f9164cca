//! 快照缓存模块
//!
//! 保存已生成的离线快照，供预览端点按 id 取回。
//! 缓存是有界的：条目数由 LRU 容量约束，存活时间由 TTL 约束，
//! 二者任一超限即失效，长时间运行不会无限占用内存。

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::debug;

/// 默认容量（条）
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// 默认存活时间
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// 一条缓存的快照
#[derive(Clone, Debug)]
pub struct SnapshotEntry {
    /// 自包含的 HTML 文档
    pub html: String,
    /// 页面标题
    pub title: Option<String>,
    /// 快照来源 URL
    pub source_url: String,
    created_at: Instant,
}

/// 有界、带 TTL 的快照缓存
pub struct SnapshotCache {
    entries: LruCache<String, SnapshotEntry>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity =
            NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// 存入快照，返回访问 id
    ///
    /// id 由来源 URL 和写入时刻哈希而来，同一 URL 的两次快照
    /// 有不同的 id。
    pub fn insert(&mut self, source_url: &str, html: String, title: Option<String>) -> String {
        let id = make_snapshot_id(source_url);

        self.entries.put(
            id.clone(),
            SnapshotEntry {
                html,
                title,
                source_url: source_url.to_string(),
                created_at: Instant::now(),
            },
        );

        debug!("快照已缓存: {} -> {}", source_url, id);
        id
    }

    /// 按 id 取回快照；过期条目当场剔除并返回 None
    pub fn get(&mut self, id: &str) -> Option<SnapshotEntry> {
        let expired = match self.entries.peek(id) {
            Some(entry) => entry.created_at.elapsed() > self.ttl,
            None => return None,
        };

        if expired {
            debug!("快照已过期: {}", id);
            self.entries.pop(id);
            return None;
        }

        self.entries.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

fn make_snapshot_id(source_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_url.as_bytes());
    hasher.update(
        std::time::UNIX_EPOCH
            .elapsed()
            .unwrap_or_default()
            .as_nanos()
            .to_le_bytes(),
    );
    let digest = hasher.finalize();

    // 取前 16 字节的十六进制表示，足够避免碰撞且 URL 友好
    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut cache = SnapshotCache::default();
        let id = cache.insert(
            "https://example.com/",
            "<!DOCTYPE html><html></html>".to_string(),
            Some("Example".to_string()),
        );

        let entry = cache.get(&id).unwrap();
        assert_eq!(entry.source_url, "https://example.com/");
        assert_eq!(entry.title.as_deref(), Some("Example"));
    }

    #[test]
    fn test_unknown_id_misses() {
        let mut cache = SnapshotCache::default();
        assert!(cache.get("deadbeef").is_none());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut cache = SnapshotCache::new(2, DEFAULT_CACHE_TTL);
        let first = cache.insert("https://a.example/", "a".to_string(), None);
        let _second = cache.insert("https://b.example/", "b".to_string(), None);
        let _third = cache.insert("https://c.example/", "c".to_string(), None);

        assert_eq!(cache.len(), 2);
        // 最早的条目被挤出
        assert!(cache.get(&first).is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let mut cache = SnapshotCache::new(8, Duration::from_millis(20));
        let id = cache.insert("https://example.com/", "x".to_string(), None);

        assert!(cache.get(&id).is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&id).is_none());
        // 过期条目被剔除，容量被释放
        assert!(cache.is_empty());
    }

    #[test]
    fn test_same_url_gets_distinct_ids() {
        let mut cache = SnapshotCache::default();
        let first = cache.insert("https://example.com/", "v1".to_string(), None);
        std::thread::sleep(Duration::from_millis(2));
        let second = cache.insert("https://example.com/", "v2".to_string(), None);
        assert_ne!(first, second);
    }
}
