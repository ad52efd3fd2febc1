//! In-memory cache component

use crate::component::{Component, ComponentKind};
use crate::context::AppContext;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct Sweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A `DataSource` component storing JSON values with optional TTL
///
/// Expired entries are never returned. Start spawns a sweeper task that
/// evicts them periodically; Stop cancels and joins it.
pub struct MemoryCache {
    name: String,
    entries: Arc<DashMap<String, CacheEntry>>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<Sweeper>>,
}

impl MemoryCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(DashMap::new()),
            sweep_interval: Duration::from_secs(30),
            sweeper: Mutex::new(None),
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.insert(key, value, None)
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()> {
        self.insert(key, value, Some(Instant::now() + ttl))
    }

    fn insert<T: Serialize>(&self, key: &str, value: &T, expires_at: Option<Instant>) -> anyhow::Result<()> {
        let value = serde_json::to_value(value)?;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    /// Fetch and deserialize `key`; `Ok(None)` when missing or expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.value.clone(),
            _ => return Ok(None),
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Entries currently stored, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }
}

fn purge(entries: &DashMap<String, CacheEntry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

#[async_trait]
impl Component for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::DataSource
    }

    async fn initialize(&self, _ctx: &CancellationToken, _app: &AppContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn start(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let entries = Arc::clone(&self.entries);
        let interval = self.sweep_interval;
        let name = self.name.clone();
        let stop = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = purge(&entries);
                        if removed > 0 {
                            tracing::debug!(cache = %name, removed, "evicted expired entries");
                        }
                    }
                }
            }
        });

        *sweeper = Some(Sweeper { token, handle });
        Ok(())
    }

    async fn stop(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        let Some(sweeper) = self.sweeper.lock().take() else {
            return Ok(());
        };
        sweeper.token.cancel();
        sweeper.handle.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppShared;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Session {
        user: String,
        admin: bool,
    }

    #[test]
    fn test_set_get_remove() {
        let cache = MemoryCache::new("sessions");
        let session = Session {
            user: "ada".into(),
            admin: true,
        };

        cache.set("s1", &session).unwrap();
        assert_eq!(cache.get::<Session>("s1").unwrap(), Some(session));
        assert_eq!(cache.get::<Session>("s2").unwrap(), None);

        assert!(cache.remove("s1"));
        assert!(!cache.remove("s1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_hidden_and_purged() {
        let cache = MemoryCache::new("cache");
        cache.set_with_ttl("gone", &1u32, Duration::ZERO).unwrap();
        cache.set("kept", &2u32).unwrap();

        assert_eq!(cache.get::<u32>("gone").unwrap(), None);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get::<u32>("kept").unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_sweeper_lifecycle_and_idempotent_stop() {
        let cache = MemoryCache::new("cache").with_sweep_interval(Duration::from_millis(10));
        let token = CancellationToken::new();
        let ctx = AppContext::new(&Arc::new(AppShared::new("app".into(), "0".into())));

        cache.initialize(&token, &ctx).await.unwrap();
        assert!(!cache.is_sweeping());

        cache.start(&token).await.unwrap();
        assert!(cache.is_sweeping());

        cache.set_with_ttl("short", &"x", Duration::ZERO).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty());

        cache.stop(&token).await.unwrap();
        assert!(!cache.is_sweeping());
        cache.stop(&token).await.unwrap();
    }
}
