use super::{Connection, Connector, config::ConnectionConfig};
use crate::core::{OrmError, Result, Row, Value};
use crate::executor::placeholder::PlaceholderStyle;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Connection pool
///
/// Hands out at most `max_connections` connections at a time. Further
/// `acquire` calls queue in FIFO order until a [`PoolGuard`] is dropped.
pub struct ConnectionPool {
    /// Pool configuration
    config: ConnectionConfig,
    /// Opens new connections
    connector: Arc<dyn Connector>,
    /// Idle connections, most recently released last
    available: Arc<Mutex<VecDeque<PooledConnection>>>,
    /// One permit per connection that may be checked out
    permits: Arc<Semaphore>,
    /// Idle plus checked-out connections
    total_connections: Arc<AtomicUsize>,
    /// Next connection ID
    next_id: AtomicU64,
}

/// A connection owned by the pool
struct PooledConnection {
    id: u64,
    connection: Box<dyn Connection>,
    created_at: Instant,
    last_used: Instant,
}

impl PooledConnection {
    fn new(id: u64, connection: Box<dyn Connection>) -> Self {
        let now = Instant::now();
        Self {
            id,
            connection,
            created_at: now,
            last_used: now,
        }
    }

    fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        max_lifetime.is_some_and(|lifetime| self.created_at.elapsed() > lifetime)
    }

    fn is_idle_too_long(&self, idle_timeout: Option<Duration>) -> bool {
        idle_timeout.is_some_and(|timeout| self.last_used.elapsed() > timeout)
    }
}

impl ConnectionPool {
    /// Create a pool and open `min_connections` connections up front.
    pub async fn connect<C>(config: ConnectionConfig, connector: C) -> Result<Self>
    where
        C: Connector + 'static,
    {
        Self::with_connector(config, Arc::new(connector)).await
    }

    pub async fn with_connector(
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;

        let pool = Self {
            permits: Arc::new(Semaphore::new(config.max_connections)),
            config,
            connector,
            available: Arc::new(Mutex::new(VecDeque::new())),
            total_connections: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        };

        pool.ensure_min_connections().await?;
        info!(
            "connection pool ready: {} (min {}, max {})",
            pool.config.to_url(),
            pool.config.min_connections,
            pool.config.max_connections
        );

        Ok(pool)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Check a connection out of the pool.
    ///
    /// The returned guard gives the connection back when dropped, on every
    /// exit path.
    pub async fn acquire(&self) -> Result<PoolGuard> {
        let permits = Arc::clone(&self.permits);
        let permit = match self.config.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, permits.acquire_owned())
                .await
                .map_err(|_| {
                    OrmError::PoolTimeout(format!(
                        "no connection available within {:?}",
                        timeout
                    ))
                })?,
            None => permits.acquire_owned().await,
        }
        .map_err(|_| OrmError::PoolTimeout("connection pool is closed".into()))?;

        let pooled = match self.checkout_idle().await? {
            Some(pooled) => pooled,
            None => self.open().await?,
        };

        Ok(PoolGuard {
            connection: Some(pooled),
            available: Arc::clone(&self.available),
            total_connections: Arc::clone(&self.total_connections),
            in_transaction: false,
            _permit: permit,
        })
    }

    /// Reuse an idle connection that still answers a ping. Dead ones are
    /// closed and the next idle one is tried.
    async fn checkout_idle(&self) -> Result<Option<PooledConnection>> {
        while let Some(mut pooled) = self.try_get_available()? {
            match pooled.connection.ping().await {
                Ok(()) => return Ok(Some(pooled)),
                Err(err) => {
                    warn!("closing connection #{}: ping failed: {}", pooled.id, err);
                    self.total_connections.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }
        Ok(None)
    }

    /// Pop an idle connection, closing any that outlived their limits.
    fn try_get_available(&self) -> Result<Option<PooledConnection>> {
        let mut available = self.available.lock()?;

        let before = available.len();
        available.retain(|pooled| {
            !pooled.is_expired(self.config.max_lifetime)
                && !pooled.is_idle_too_long(self.config.idle_timeout)
        });
        let removed = before - available.len();
        if removed > 0 {
            debug!("closed {} stale connection(s)", removed);
            self.total_connections.fetch_sub(removed, Ordering::SeqCst);
        }

        Ok(available.pop_front())
    }

    async fn open(&self) -> Result<PooledConnection> {
        let connection = self.connector.connect(&self.config).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.total_connections.fetch_add(1, Ordering::SeqCst);
        debug!("opened connection #{}", id);
        Ok(PooledConnection::new(id, connection))
    }

    async fn ensure_min_connections(&self) -> Result<()> {
        while self.total_connections.load(Ordering::SeqCst) < self.config.min_connections {
            let pooled = self.open().await?;
            self.available.lock()?.push_back(pooled);
        }
        Ok(())
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let available = self.available.lock().map(|a| a.len()).unwrap_or(0);
        let total = self.total_connections.load(Ordering::SeqCst);

        PoolStats {
            total_connections: total,
            available_connections: available,
            active_connections: total.saturating_sub(available),
            max_connections: self.config.max_connections,
        }
    }
}

/// Connection pool statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total_connections: usize,
    pub available_connections: usize,
    pub active_connections: usize,
    pub max_connections: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {}/{} active, {} available, max {}",
            self.active_connections,
            self.total_connections,
            self.available_connections,
            self.max_connections
        )
    }
}

/// RAII guard for pooled connections
///
/// Returns the connection to the pool when dropped. A connection dropped while
/// a transaction it began is still open is closed instead of reused.
pub struct PoolGuard {
    connection: Option<PooledConnection>,
    available: Arc<Mutex<VecDeque<PooledConnection>>>,
    total_connections: Arc<AtomicUsize>,
    in_transaction: bool,
    _permit: OwnedSemaphorePermit,
}

impl PoolGuard {
    fn pooled(&mut self) -> &mut PooledConnection {
        self.connection
            .as_mut()
            .expect("connection is present until the guard drops")
    }

    /// Pool-assigned connection ID
    pub fn id(&self) -> u64 {
        self.connection.as_ref().map(|pooled| pooled.id).unwrap_or(0)
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.connection
            .as_ref()
            .map(|pooled| pooled.connection.placeholder_style())
            .unwrap_or_default()
    }

    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub async fn query(&mut self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>> {
        self.pooled().connection.query(sql, args, limit).await
    }

    pub async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        self.pooled().connection.execute(sql, args).await
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.pooled().connection.begin().await?;
        self.in_transaction = true;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.pooled().connection.commit().await?;
        self.in_transaction = false;
        Ok(())
    }

    /// A failed rollback leaves the guard marked in-transaction, so the
    /// connection is discarded on drop.
    pub async fn rollback(&mut self) -> Result<()> {
        self.pooled().connection.rollback().await?;
        self.in_transaction = false;
        Ok(())
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        let Some(mut pooled) = self.connection.take() else {
            return;
        };

        if self.in_transaction {
            warn!(
                "connection #{} released with an open transaction; closing it",
                pooled.id
            );
            self.total_connections.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        pooled.last_used = Instant::now();
        match self.available.lock() {
            Ok(mut available) => available.push_back(pooled),
            Err(_) => {
                warn!("connection pool lock poisoned; closing connection #{}", pooled.id);
                self.total_connections.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

static GLOBAL_POOL: OnceLock<ConnectionPool> = OnceLock::new();

/// Create the process-wide pool. Fails if one already exists.
pub async fn create_pool<C>(config: ConnectionConfig, connector: C) -> Result<&'static ConnectionPool>
where
    C: Connector + 'static,
{
    if GLOBAL_POOL.get().is_some() {
        return Err(OrmError::PoolAlreadyInitialized);
    }
    info!("create database connection pool...");

    let pool = ConnectionPool::connect(config, connector).await?;
    GLOBAL_POOL
        .set(pool)
        .map_err(|_| OrmError::PoolAlreadyInitialized)?;
    global_pool()
}

/// The process-wide pool installed by [`create_pool`].
pub fn global_pool() -> Result<&'static ConnectionPool> {
    GLOBAL_POOL.get().ok_or(OrmError::PoolNotInitialized)
}
