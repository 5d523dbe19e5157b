//! Bounded, TTL-expiring cache of assembled responses.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::config::CacheSettings;
use crate::llm::GenerationRequest;
use crate::stream::AssembledResponse;

struct CachedResponse {
    stored_at: Instant,
    response: AssembledResponse,
}

/// Owned by the caller and handed to [`GenerationSession`](crate::llm::GenerationSession)
/// per call; there is no process-wide instance.
pub struct ResponseCache {
    entries: LruCache<String, CachedResponse>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// `None` when caching is switched off in the settings.
    pub fn from_settings(settings: &CacheSettings) -> Option<Self> {
        if !settings.enabled {
            tracing::debug!("Response cache disabled");
            return None;
        }
        let capacity = NonZeroUsize::new(settings.capacity).unwrap_or(NonZeroUsize::MIN);
        Some(Self::new(capacity, Duration::from_secs(settings.ttl_secs)))
    }

    /// Stable key over everything sent: system prompt, prompt, files and
    /// conversation history.
    pub fn key_for(request: &GenerationRequest) -> String {
        let mut hasher = Sha256::new();
        match request.system_prompt {
            Some(ref system_prompt) => {
                hasher.update([1u8]);
                update_field(&mut hasher, system_prompt);
            }
            None => hasher.update([0u8]),
        }
        update_field(&mut hasher, &request.prompt);

        hasher.update((request.files.len() as u64).to_le_bytes());
        for file in &request.files {
            update_field(&mut hasher, &file.path);
            update_field(&mut hasher, &file.content);
        }

        hasher.update((request.history.len() as u64).to_le_bytes());
        for message in &request.history {
            update_field(&mut hasher, message.role.as_str());
            update_field(&mut hasher, &message.content);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&mut self, key: &str) -> Option<AssembledResponse> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.pop(key);
        }
        None
    }

    pub fn insert(&mut self, key: String, response: AssembledResponse) {
        self.entries.put(
            key,
            CachedResponse {
                stored_at: Instant::now(),
                response,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Length-prefixed so adjacent fields cannot run together.
fn update_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
