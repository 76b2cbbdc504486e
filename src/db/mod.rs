pub mod cache;
pub mod preferences;
pub mod recommendations;
pub mod redis;

pub use cache::{CacheKey, Clock, InMemoryResponseCache, ManualClock, ResponseCache, SystemClock};
pub use preferences::PreferenceStore;
pub use recommendations::RecommendationStore;
pub use self::redis::{create_redis_client, RedisResponseCache};
