use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};

/// Expiring key-value storage for OTPs and session tokens.
///
/// Every entry carries a TTL. Reading an expired key behaves exactly like
/// reading a key that was never written.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), anyhow::Error>;
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    async fn delete(&self, key: &str) -> Result<(), anyhow::Error>;
}

pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<RedisStore, anyhow::Error> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);
        let client = Client::open(url)?;
        let conn = client.get_connection_manager_with_config(config).await?;
        Ok(RedisStore { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), anyhow::Error> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// In-process fallback used when no Redis instance is configured.
/// Expired entries are dropped lazily on the next read.
pub struct MemoryStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), anyhow::Error> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        // The guard must drop before the remove call on the same key.
        let expired = match self.entries.get(key) {
            Some(entry) => {
                let (value, deadline) = entry.value();
                if *deadline > Instant::now() {
                    return Ok(Some(value.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let store = MemoryStore::new();
        store
            .set("otp:a@b.c", "123456", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("otp:a@b.c").await.unwrap(),
            Some("123456".to_string())
        );
    }

    #[tokio::test]
    async fn get_of_unknown_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set("short", "lived", Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwriting_replaces_value_and_ttl() {
        let store = MemoryStore::new();
        store
            .set("key", "first", Duration::from_millis(30))
            .await
            .unwrap();
        store.set("key", "second", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("key").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemoryStore::new();
        store
            .set("key", "value", Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("key").await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), None);
    }
}
