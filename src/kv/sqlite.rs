//! SQLite key-value backend
//!
//! Uses the on-disk layout of the Keyv SQLite adapter: a single `keyv` table,
//! keys prefixed with a namespace and values wrapped in an envelope carrying
//! an optional expiry in milliseconds.

use std::str::FromStr as _;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::Client as _;

pub const DEFAULT_NAMESPACE: &str = "keyv";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("malformed entry {key}: {error}")]
    Envelope {
        key: String,
        error: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    value: serde_json::Value,
    #[serde(default)]
    expires: Option<i64>,
}

impl Envelope {
    fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires
            .is_some_and(|expires| expires <= now.timestamp_millis())
    }
}

pub struct SqliteClient {
    pool: sqlx::SqlitePool,
    namespace: String,
}

impl SqliteClient {
    pub async fn open(url: &str, namespace: Option<&str>) -> Result<Self, sqlx::Error> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)
            .inspect_err(|error| error!(%error, %url, "Failed to parse datasets db url"))?
            .create_if_missing(true);
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .inspect_err(|error| error!(%error, %url, "Failed to open datasets db"))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keyv(
                key VARCHAR(255) PRIMARY KEY,
                value TEXT
            );
        "#,
        )
        .execute(&pool)
        .await
        .inspect_err(|error| error!(%error, %url, "Failed to execute DDL to datasets db"))?;
        Ok(Self {
            pool,
            namespace: namespace.unwrap_or(DEFAULT_NAMESPACE).to_owned(),
        })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    /// Write a value that reads as absent once `expires` has passed.
    pub async fn set_until(
        &self,
        key: &str,
        value: serde_json::Value,
        expires: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), Error> {
        let envelope = Envelope {
            value,
            expires: expires.map(|expires| expires.timestamp_millis()),
        };
        let raw = serde_json::to_string(&envelope).map_err(|error| Error::Envelope {
            key: key.to_owned(),
            error,
        })?;
        sqlx::query(
            r#"
            INSERT INTO keyv(key, value)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET
                value = EXCLUDED.value
        "#,
        )
        .bind(self.prefixed(key))
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl super::Client for SqliteClient {
    type Error = Error;

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Self::Error> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM keyv WHERE key = ?")
                .bind(self.prefixed(key))
                .fetch_optional(&self.pool)
                .await?;
        let Some(raw) = raw.flatten() else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_str(&raw).map_err(|error| Error::Envelope {
            key: key.to_owned(),
            error,
        })?;
        if envelope.is_expired(chrono::Utc::now()) {
            debug!(key, "entry expired");
            self.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), Self::Error> {
        self.set_until(key, value, None).await
    }

    async fn delete(&self, key: &str) -> Result<(), Self::Error> {
        sqlx::query("DELETE FROM keyv WHERE key = ?")
            .bind(self.prefixed(key))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::kv::Client as _;

    #[tokio::test]
    async fn test_set_get_delete() {
        let client = SqliteClient::open("sqlite::memory:", None).await.unwrap();
        assert_eq!(client.get("datasets").await.unwrap(), None);
        client.set("datasets", json!([{"id": "a"}])).await.unwrap();
        assert_eq!(
            client.get("datasets").await.unwrap(),
            Some(json!([{"id": "a"}]))
        );
        client.delete("datasets").await.unwrap();
        assert_eq!(client.get("datasets").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keyv_layout() {
        let client = SqliteClient::open("sqlite::memory:", Some("bal"))
            .await
            .unwrap();
        client.set("a-report", json!({"ok": true})).await.unwrap();
        let (key, value): (String, String) = sqlx::query_as("SELECT key, value FROM keyv")
            .fetch_one(client.pool())
            .await
            .unwrap();
        assert_eq!(key, "bal:a-report");
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&value).unwrap(),
            json!({"value": {"ok": true}, "expires": null})
        );
    }

    #[tokio::test]
    async fn test_reads_entries_written_by_keyv() {
        let client = SqliteClient::open("sqlite::memory:", None).await.unwrap();
        sqlx::query("INSERT INTO keyv(key, value) VALUES (?, ?)")
            .bind("keyv:datasets")
            .bind(r#"{"value":[{"id":"x"}],"expires":null}"#)
            .execute(client.pool())
            .await
            .unwrap();
        assert_eq!(
            client.get("datasets").await.unwrap(),
            Some(json!([{"id": "x"}]))
        );
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let client = SqliteClient::open("sqlite::memory:", None).await.unwrap();
        let past = chrono::Utc::now() - chrono::Duration::minutes(1);
        client
            .set_until("stale", json!(1), Some(past))
            .await
            .unwrap();
        assert_eq!(client.get("stale").await.unwrap(), None);
    }
}
