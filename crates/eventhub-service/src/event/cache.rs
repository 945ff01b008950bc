//! Read-through cache for event reads.
//!
//! Every operation here is best-effort: a cache failure is logged and
//! reported as a miss, never as an error to the caller.
//!
//! Fills are tagged with the invalidation generation seen before the store
//! read. A fill that raced an invalidation is dropped, so a snapshot read
//! before a commit cannot outlive that commit's invalidation. The counter is
//! per process; across processes sharing Redis, the TTL bounds staleness.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use eventhub_cache::CacheManager;
use eventhub_cache::keys;
use eventhub_core::config::CacheConfig;
use eventhub_core::traits::CacheProvider;
use eventhub_core::types::pagination::{PageRequest, PageResponse};
use eventhub_entity::event::{Event, EventQuery};

/// Event and event-list cache shared by the services that read or
/// mutate events.
#[derive(Debug, Clone)]
pub struct EventCache {
    cache: Arc<CacheManager>,
    generation: Arc<AtomicU64>,
    event_ttl: Duration,
    list_ttl: Duration,
}

impl EventCache {
    /// Creates a new event cache with TTLs from configuration.
    pub fn new(cache: Arc<CacheManager>, config: &CacheConfig) -> Self {
        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
            event_ttl: Duration::from_secs(config.event_ttl_seconds),
            list_ttl: Duration::from_secs(config.list_ttl_seconds),
        }
    }

    /// Current invalidation generation. Take it before reading the store and
    /// hand it to the matching `put_*`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Cached snapshot of one event.
    pub async fn get_event(&self, event_id: Uuid) -> Option<Event> {
        self.read(&keys::event_by_id(event_id)).await
    }

    /// Store a snapshot of one event read at generation `seen`.
    pub async fn put_event(&self, event: &Event, seen: u64) {
        self.fill(&keys::event_by_id(event.id), event, self.event_ttl, seen)
            .await;
    }

    /// Cached page of an event list.
    pub async fn get_list(
        &self,
        query: &EventQuery,
        page: &PageRequest,
    ) -> Option<PageResponse<Event>> {
        self.read(&keys::event_list(query, page)).await
    }

    /// Store a page of an event list read at generation `seen`.
    pub async fn put_list(
        &self,
        query: &EventQuery,
        page: &PageRequest,
        events: &PageResponse<Event>,
        seen: u64,
    ) {
        self.fill(&keys::event_list(query, page), events, self.list_ttl, seen)
            .await;
    }

    /// Drop the event's entry and every cached list.
    ///
    /// Runs after the mutation has committed; failures only shorten how
    /// long a stale entry can survive to its TTL.
    pub async fn invalidate(&self, event_id: Uuid) {
        // Bump before deleting so an in-flight fill sees the change.
        self.generation.fetch_add(1, Ordering::AcqRel);
        let key = keys::event_by_id(event_id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(event_id = %event_id, error = %e, "Failed to invalidate cached event");
        }
        match self.cache.delete_pattern(keys::event_list_pattern()).await {
            Ok(count) => debug!(event_id = %event_id, count, "Invalidated cached event lists"),
            Err(e) => warn!(
                event_id = %event_id,
                error = %e,
                "Failed to invalidate cached event lists"
            ),
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to store");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                if let Err(e) = self.cache.delete(key).await {
                    warn!(key, error = %e, "Failed to delete undecodable cache entry");
                }
                None
            }
        }
    }

    async fn fill<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration, seen: u64) {
        if self.generation() != seen {
            debug!(key, "Skipping cache fill after invalidation");
            return;
        }
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &json, ttl).await {
            warn!(key, error = %e, "Cache write failed");
            return;
        }
        // An invalidation may have run its delete between the check and
        // the write.
        if self.generation() != seen {
            if let Err(e) = self.cache.delete(key).await {
                warn!(key, error = %e, "Failed to drop raced cache entry");
            }
        }
    }
}
