use sqlx::{
    Sqlite, pool::PoolConnection, sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    }
};
use tokio::sync::{RwLock, RwLockReadGuard};

use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use anyhow::Context;
use tracing::debug;

pub(super) struct LogState {
    database_file: PathBuf,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for LogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogState")
            .field("database_file", &self.database_file)
            .finish()
    }
}

impl LogState {
    pub(super) async fn open<P: AsRef<Path>>(database_file: P) -> anyhow::Result<Self> {
        let database_file = database_file.as_ref().to_path_buf();
        if let Some(parent) = database_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&database_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open activity log {:?}", database_file))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        debug!(database = %database_file.display(), "Activity log opened");
        Ok(Self {
            database_file,
            pool: RwLock::new(pool),
        })
    }

    pub(super) fn database_file(&self) -> &Path {
        &self.database_file
    }

    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    pub(super) async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // Acquire the connection while the read lock is held; the guard keeps it held.
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    /// Close every pooled connection, waiting for outstanding guards to drop
    pub(super) async fn close(&self) {
        self.pool.write().await.close().await;
    }
}

pub struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
