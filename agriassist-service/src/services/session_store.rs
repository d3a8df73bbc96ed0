//! Chat session persistence.
//!
//! A session is an ordered list of turns under a client-chosen id. Stores
//! only ever append; nothing here deletes a session.

use crate::models::Turn;
use async_trait::async_trait;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, Client};
use thiserror::Error;

const KEY_PREFIX: &str = "agriassist:session";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Corrupt session turn: {0}")]
    Codec(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Turns of `session_id` in insertion order; empty for unknown ids.
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, StoreError>;

    /// Append `turns` as one unit: readers see all of them or none.
    async fn append(&self, session_id: &str, turns: &[Turn]) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}

/// Process-local store. Unbounded and never expires.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Vec<Turn>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|turns| turns.clone())
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, turns: &[Turn]) -> Result<(), StoreError> {
        // The entry guard holds the shard lock for the whole extend.
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .extend_from_slice(turns);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Redis-backed store: one list per session, refreshed TTL on every append.
#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, ttl_seconds: u64) -> Result<Self, StoreError> {
        tracing::info!("Connecting to Redis session store");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get Redis connection manager");
            e
        })?;

        tracing::info!(ttl_seconds, "Connected to Redis session store");
        Ok(Self {
            manager,
            ttl_seconds,
        })
    }

    fn key(session_id: &str) -> String {
        format!("{}:{}", KEY_PREFIX, session_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(Self::key(session_id))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        decode_turns(&raw)
    }

    async fn append(&self, session_id: &str, turns: &[Turn]) -> Result<(), StoreError> {
        if turns.is_empty() {
            return Ok(());
        }

        let encoded = encode_turns(turns)?;
        let mut conn = self.manager.clone();
        append_pipeline(&Self::key(session_id), &encoded, self.ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn encode_turns(turns: &[Turn]) -> Result<Vec<String>, StoreError> {
    turns
        .iter()
        .map(|turn| serde_json::to_string(turn).map_err(StoreError::from))
        .collect()
}

fn decode_turns(raw: &[String]) -> Result<Vec<Turn>, StoreError> {
    raw.iter()
        .map(|item| serde_json::from_str(item).map_err(StoreError::from))
        .collect()
}

/// `MULTI; RPUSH key turns..; EXPIRE key ttl; EXEC`. The TTL restarts on
/// every append, so idle sessions expire and active ones do not.
fn append_pipeline(key: &str, encoded: &[String], ttl_seconds: u64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("RPUSH")
        .arg(key)
        .arg(encoded)
        .ignore()
        .cmd("EXPIRE")
        .arg(key)
        .arg(ttl_seconds)
        .ignore();
    pipe
}
