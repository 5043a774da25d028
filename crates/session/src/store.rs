//! Persisted credential record.
//!
//! One record per process: access credential, refresh credential, role hint
//! and display-name hint. Every write replaces the whole record and every
//! clear removes it, so a reader sees either the old record, the new one, or
//! nothing.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use medgate_auth::Role;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;
use crate::types::Credentials;

/// Process-wide credential record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The current record, or `None` when signed out.
    async fn read(&self) -> Result<Option<Credentials>, StoreError>;

    /// Replace the whole record.
    async fn put(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Remove the whole record. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store; does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(credentials: Credentials) -> Self {
        Self {
            record: RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn read(&self) -> Result<Option<Credentials>, StoreError> {
        let guard = self
            .record
            .read()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        Ok(guard.clone())
    }

    async fn put(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let mut guard = self
            .record
            .write()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self
            .record
            .write()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// SQLite-backed store; survives a full restart of the client.
///
/// Cheap to clone; clones share the same lazily opened pool.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    path: PathBuf,
    pool: Arc<tokio::sync::Mutex<Option<SqlitePool>>>,
}

impl SqliteCredentialStore {
    /// Create a store at `path` (lazy initialization).
    ///
    /// The database file and its parent directory are created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the pool, opening the database and creating the table if needed.
    async fn pool(&self) -> Result<SqlitePool, StoreError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = open_pool(&self.path)
            .await
            .map_err(|err| StoreError::Unavailable(format!("{err:#}")))?;
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

async fn open_pool(path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create credential directory at {:?}", parent))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open credential store at {:?}", path))?;

    // `slot` pins the table to a single row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credentials (
            slot          INTEGER PRIMARY KEY CHECK (slot = 1),
            access_token  TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            role_hint     TEXT NULL,
            display_name  TEXT NULL,
            stored_at     TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .context("failed to create credentials table")?;

    Ok(pool)
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn read(&self) -> Result<Option<Credentials>, StoreError> {
        let pool = self.pool().await?;

        let row = sqlx::query(
            r#"
            SELECT access_token, refresh_token, role_hint, display_name
            FROM credentials
            WHERE slot = 1
            "#,
        )
        .fetch_optional(&pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_hint: Option<String> = row.try_get("role_hint")?;
        let role_hint = role_hint.and_then(|raw| match Role::from_str(&raw) {
            Ok(role) => Some(role),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable cached role hint");
                None
            }
        });

        Ok(Some(Credentials {
            access: row.try_get("access_token")?,
            refresh: row.try_get("refresh_token")?,
            role_hint,
            display_name: row.try_get("display_name")?,
        }))
    }

    async fn put(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let pool = self.pool().await?;

        sqlx::query(
            r#"
            INSERT INTO credentials (slot, access_token, refresh_token, role_hint, display_name, stored_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (slot) DO UPDATE SET
                access_token  = excluded.access_token,
                refresh_token = excluded.refresh_token,
                role_hint     = excluded.role_hint,
                display_name  = excluded.display_name,
                stored_at     = excluded.stored_at
            "#,
        )
        .bind(&credentials.access)
        .bind(&credentials.refresh)
        .bind(credentials.role_hint.map(|r| r.as_str()))
        .bind(credentials.display_name.as_deref())
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await?;

        tracing::debug!(path = ?self.path, "credential record replaced");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;

        sqlx::query("DELETE FROM credentials")
            .execute(&pool)
            .await?;

        tracing::debug!(path = ?self.path, "credential record cleared");
        Ok(())
    }
}
