use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, QueryResult,
    Statement, Value,
};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database
///
/// # Errors
/// Returns a `ServiceError` if the connection cannot be established
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    gauge!("salesdesk_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt)
        .await
        .map_err(ServiceError::DatabaseError)?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("salesdesk_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("salesdesk_db.connection_failures", 1);
        }
    }

    result
}

/// Rewrites `?` placeholders into `$1..$n` for backends that number their
/// parameters. The statements in this crate carry no literal `?` characters,
/// so a sequential scan is sufficient.
pub(crate) fn rewrite_placeholders<'a>(backend: DbBackend, sql: &'a str) -> Cow<'a, str> {
    if backend != DbBackend::Postgres || !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Raw-SQL access over the connection pool. The physical schema is owned
/// elsewhere; everything here is parameterized query/execute primitives.
#[derive(Debug, Clone)]
pub struct Gateway {
    pool: Arc<DbPool>,
}

impl Gateway {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn backend(&self) -> DbBackend {
        self.pool.get_database_backend()
    }

    fn statement(&self, sql: &str, params: Vec<Value>) -> Statement {
        let backend = self.backend();
        let sql = rewrite_placeholders(backend, sql);
        Statement::from_sql_and_values(backend, sql, params)
    }

    /// Runs a read and maps every returned row.
    pub async fn query<T, F>(
        &self,
        sql: &str,
        params: Vec<Value>,
        mut map: F,
    ) -> Result<Vec<T>, ServiceError>
    where
        F: FnMut(&QueryResult) -> Result<T, DbErr>,
    {
        let stmt = self.statement(sql, params);
        let start = std::time::Instant::now();

        debug!("Executing SQL query: {:?}", stmt);

        let rows = self.pool.query_all(stmt).await.map_err(|e| {
            error!("Database error executing query: {}", e);
            counter!("salesdesk_db.query.error", 1);
            ServiceError::DatabaseError(e)
        })?;

        let mapped = rows
            .iter()
            .map(&mut map)
            .collect::<Result<Vec<T>, DbErr>>()
            .map_err(|e| {
                error!("Failed to map query result: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        histogram!("salesdesk_db.query.duration", start.elapsed());

        Ok(mapped)
    }

    /// Runs a read expected to return at most one row.
    pub async fn query_one<T, F>(
        &self,
        sql: &str,
        params: Vec<Value>,
        map: F,
    ) -> Result<Option<T>, ServiceError>
    where
        F: FnOnce(&QueryResult) -> Result<T, DbErr>,
    {
        let stmt = self.statement(sql, params);

        debug!("Executing SQL query: {:?}", stmt);

        let row = self.pool.query_one(stmt).await.map_err(|e| {
            error!("Database error executing query: {}", e);
            counter!("salesdesk_db.query.error", 1);
            ServiceError::DatabaseError(e)
        })?;

        match row {
            Some(row) => {
                let value = map(&row).map_err(|e| {
                    error!("Failed to map query result: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Runs a write and returns the affected row count.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, ServiceError> {
        let stmt = self.statement(sql, params);
        let start = std::time::Instant::now();

        debug!("Executing SQL statement: {:?}", stmt);

        let result = self.pool.execute(stmt).await.map_err(|e| {
            error!("Database error executing statement: {}", e);
            counter!("salesdesk_db.execute.error", 1);
            ServiceError::DatabaseError(e)
        })?;

        histogram!("salesdesk_db.execute.duration", start.elapsed());

        Ok(result.rows_affected())
    }
}
