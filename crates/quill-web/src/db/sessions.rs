//! Session records on the `sessions` table.
//!
//! Backs the session layer with the blog's own database so sessions
//! survive restarts and idle ones can be purged. The record data is stored
//! as JSON text and the expiry as a Unix timestamp, which both backends
//! compare natively.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::AnyPool;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};

/// [`SessionStore`] over the application's connection pool.
#[derive(Debug, Clone)]
pub struct SqlSessionStore {
    pool: AnyPool,
}

impl SqlSessionStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Number of stored session rows, expired ones included.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
    }
}

fn backend(err: sqlx::Error) -> session_store::Error {
    session_store::Error::Backend(err.to_string())
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;
        sqlx::query(
            "INSERT INTO sessions (id, data, expiry_date) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET data = excluded.data, expiry_date = excluded.expiry_date",
        )
        .bind(record.id.to_string())
        .bind(data)
        .bind(record.expiry_date.unix_timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT data, expiry_date FROM sessions WHERE id = $1 AND expiry_date > $2",
        )
        .bind(session_id.to_string())
        .bind(now())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some((data, expiry)) = row else {
            return Ok(None);
        };
        let data = serde_json::from_str(&data)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        let expiry_date = OffsetDateTime::from_unix_timestamp(expiry)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SqlSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let removed = sqlx::query("DELETE FROM sessions WHERE expiry_date <= $1")
            .bind(now())
            .execute(&self.pool)
            .await
            .map_err(backend)?
            .rows_affected();
        if removed > 0 {
            tracing::debug!(removed, "purged expired sessions");
        }
        Ok(())
    }
}

/// Delete expired sessions every `period`, forever.
///
/// Failures are logged and retried on the next tick.
pub async fn purge_expired(store: SqlSessionStore, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = store.delete_expired().await {
            tracing::warn!(error = %e, "failed to purge expired sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use tower_sessions::cookie::time::Duration as TimeDuration;

    fn record(expires_in: TimeDuration) -> Record {
        let mut data = std::collections::HashMap::new();
        data.insert("_user_id".to_string(), serde_json::json!(1));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn save_then_load() {
        let (pool, _dir) = test_pool().await;
        let store = SqlSessionStore::new(pool);
        let saved = record(TimeDuration::hours(1));
        store.save(&saved).await.unwrap();

        let loaded = store.load(&saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, saved.id);
        assert_eq!(loaded.data, saved.data);
        assert_eq!(
            loaded.expiry_date.unix_timestamp(),
            saved.expiry_date.unix_timestamp()
        );
    }

    #[tokio::test]
    async fn save_overwrites_existing_record() {
        let (pool, _dir) = test_pool().await;
        let store = SqlSessionStore::new(pool);
        let mut saved = record(TimeDuration::hours(1));
        store.save(&saved).await.unwrap();

        saved
            .data
            .insert("_flashes".to_string(), serde_json::json!(["hi"]));
        store.save(&saved).await.unwrap();

        let loaded = store.load(&saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.len(), 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_records_do_not_load_and_are_purged() {
        let (pool, _dir) = test_pool().await;
        let store = SqlSessionStore::new(pool);
        let live = record(TimeDuration::hours(1));
        let stale = record(TimeDuration::hours(-1));
        store.save(&live).await.unwrap();
        store.save(&stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 2);

        store.delete_expired().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.load(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (pool, _dir) = test_pool().await;
        let store = SqlSessionStore::new(pool);
        let saved = record(TimeDuration::hours(1));
        store.save(&saved).await.unwrap();
        store.delete(&saved.id).await.unwrap();
        assert!(store.load(&saved.id).await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
