//! Cache module for Redis-backed session state
//!
//! Provides the connection wrapper with retry logic and the `SessionStore`
//! implementation shared by every API instance.

pub mod redis_client;
pub mod session_store;


pub use redis_client::RedisClient;
pub use session_store::{session_key, session_ttl_secs, RedisSessionStore};

// Re-export commonly used types
pub use ga_shared::config::RedisConfig;
