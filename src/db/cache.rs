use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Errors raised by response cache backends
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw model output, addressed by the digest of (model id, prompt)
    ModelResponse(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::ModelResponse(digest) => write!(f, "llm:{}", digest),
        }
    }
}

/// Memoization store for raw model responses
///
/// Implementations must be safe to share across concurrent recommend calls.
/// Overlapping writes for the same key are last-write-wins.
#[async_trait::async_trait]
pub trait ResponseCache: Send + Sync {
    /// Returns the cached text if present and not expired
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<String>>;

    /// Stores text under `key` for `ttl`
    async fn put(&self, key: &CacheKey, value: &str, ttl: Duration) -> CacheResult<()>;
}

/// Time source for TTL checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
struct PendingRequest {
    stored_at: Instant,
    ttl: Duration,
    text: String,
}

/// In-process response cache with lazy expiry
pub struct InMemoryResponseCache<C: Clock = SystemClock> {
    entries: RwLock<HashMap<String, PendingRequest>>,
    clock: C,
}

impl InMemoryResponseCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryResponseCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryResponseCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl<C: Clock> ResponseCache for InMemoryResponseCache<C> {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let key = key.to_string();
        let now = self.clock.now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if now.duration_since(entry.stored_at) < entry.ttl => {
                    return Ok(Some(entry.text.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict, unless a fresher write landed in between
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(&key) {
            if now.duration_since(entry.stored_at) >= entry.ttl {
                entries.remove(&key);
                tracing::debug!(key = %key, "Evicted expired response");
            }
        }

        Ok(None)
    }

    async fn put(&self, key: &CacheKey, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = PendingRequest {
            stored_at: self.clock.now(),
            ttl,
            text: value.to_string(),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}
