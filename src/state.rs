use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    RunQueryDsl, SqliteConnection,
    connection::TransactionManager,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};
use tokio::task::spawn_blocking;

use crate::util_resp::FailureResponse;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// SQLite only enforces `REFERENCES ... ON DELETE CASCADE` when asked to, and
/// the setting is per connection.
#[derive(Debug)]
struct EnableForeignKeys;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for EnableForeignKeys
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(conn)
            .map(|_| ())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub const IN_MEMORY: &str = ":memory:";

/// How the pool treats its connections for a given database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_size: u32,
    pub max_lifetime: Option<Duration>,
    pub idle_timeout: Option<Duration>,
}

impl PoolSettings {
    pub fn for_url(db_url: &str) -> PoolSettings {
        if db_url == IN_MEMORY {
            // Every connection to `:memory:` is a separate database, so the
            // pool holds exactly one and never replaces it.
            PoolSettings {
                max_size: 1,
                max_lifetime: None,
                idle_timeout: None,
            }
        } else {
            PoolSettings {
                max_size: 10,
                max_lifetime: Some(Duration::from_secs(30 * 60)),
                idle_timeout: Some(Duration::from_secs(10 * 60)),
            }
        }
    }
}

pub fn make_pool(db_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    let settings = PoolSettings::for_url(db_url);
    Pool::builder()
        .max_size(settings.max_size)
        .max_lifetime(settings.max_lifetime)
        .idle_timeout(settings.idle_timeout)
        .connection_customizer(Box::new(EnableForeignKeys))
        .build(ConnectionManager::<SqliteConnection>::new(db_url))
}

/// The transaction opened (if any) while handling the current request.
///
/// [`commit_transactions`] places an empty slot in the request extensions
/// before the handler runs; [`ThreadSafeConn<true>`] fills it when it begins a
/// transaction.
#[derive(Clone, Default)]
pub struct OpenTransaction(
    Arc<std::sync::Mutex<Option<Arc<tokio::sync::Mutex<PooledConn>>>>>,
);

impl OpenTransaction {
    fn set(&self, conn: Arc<tokio::sync::Mutex<PooledConn>>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(conn);
        }
    }

    fn take(&self) -> Option<Arc<tokio::sync::Mutex<PooledConn>>> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Commits the transaction opened while handling a request if the response
/// indicates success, and rolls it back otherwise.
pub async fn commit_transactions(mut req: Request, next: Next) -> Response {
    let open = OpenTransaction::default();
    req.extensions_mut().insert(open.clone());

    let res = next.run(req).await;

    if let Some(conn) = open.take() {
        let mut conn = conn.lock().await;
        let status = res.status();

        let outcome = if status.is_success()
            || status.is_redirection()
            || status.is_informational()
        {
            <PooledConn as diesel::Connection>::TransactionManager::commit_transaction(&mut *conn)
        } else {
            <PooledConn as diesel::Connection>::TransactionManager::rollback_transaction(&mut *conn)
        };

        if let Err(e) = outcome {
            tracing::error!("failed to finish transaction: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    res
}

/// A database connection shared between all the extractors of one request.
///
/// When `TX` is true, a transaction is opened as soon as the connection is
/// checked out of the pool.
#[derive(Clone)]
pub struct ThreadSafeConn<const TX: bool> {
    pub inner: Arc<tokio::sync::Mutex<PooledConn>>,
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for ThreadSafeConn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        if let Some(conn) = parts.extensions.get::<ThreadSafeConn<TX>>() {
            return Ok(conn.clone());
        }

        let pool = DbPool::from_ref(state);
        let mut conn = spawn_blocking(move || pool.get())
            .await
            .map_err(|_| FailureResponse::ServerError(()))?
            .map_err(|e| {
                tracing::error!("could not check out a connection: {e}");
                FailureResponse::ServerError(())
            })?;

        let open = if TX {
            let open = parts
                .extensions
                .get::<OpenTransaction>()
                .cloned()
                .ok_or_else(|| {
                    tracing::error!(
                        "transactional connection requested without the commit middleware"
                    );
                    FailureResponse::ServerError(())
                })?;

            <PooledConn as diesel::Connection>::TransactionManager::begin_transaction(&mut conn)?;

            Some(open)
        } else {
            None
        };

        let conn = ThreadSafeConn::<TX> {
            inner: Arc::new(tokio::sync::Mutex::new(conn)),
        };
        if let Some(open) = open {
            open.set(conn.inner.clone());
        }
        parts.extensions.insert(conn.clone());

        Ok(conn)
    }
}

pub struct Conn<const TX: bool> {
    inner: tokio::sync::OwnedMutexGuard<PooledConn>,
}

impl<const TX: bool> Deref for Conn<TX> {
    type Target = PooledConn;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<const TX: bool> DerefMut for Conn<TX> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for Conn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let conn = ThreadSafeConn::<TX>::from_request_parts(parts, state).await?;
        Ok(Conn {
            inner: conn.inner.lock_owned().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_pool_keeps_its_only_connection() {
        let settings = PoolSettings::for_url(IN_MEMORY);
        assert_eq!(settings.max_size, 1);
        assert_eq!(settings.max_lifetime, None);
        assert_eq!(settings.idle_timeout, None);

        let pool = make_pool(IN_MEMORY).unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn file_pools_recycle_connections() {
        let settings = PoolSettings::for_url("san.sqlite3");
        assert_eq!(settings.max_size, 10);
        assert!(settings.max_lifetime.is_some());
        assert!(settings.idle_timeout.is_some());
    }
}
