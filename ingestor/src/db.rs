use crate::errors::{Error, Result};
use crate::metrics::{INSERT_LATENCY_SECONDS, STORE_FAILURES_TOTAL};
use crate::model::{NewReading, Reading};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Upper bound for a single insert.
    pub write_timeout: Duration,
}

impl StoreConfig {
    /// Private in-memory database. Lives as long as the store's single connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Append-only table of readings. Every call goes to the database.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    write_timeout: Duration,
}

impl Store {
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        info!("Opening database...");
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(Error::StorageUnavailable)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(Error::StorageUnavailable)?;

        let store = Self {
            pool,
            write_timeout: config.write_timeout,
        };
        store.initialize().await?;

        Ok(store)
    }

    /// Creates the readings table if it does not exist yet. Safe to run on every start.
    pub async fn initialize(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    pub async fn insert(&self, reading: &NewReading) -> Result<()> {
        let start = Instant::now();

        let result = tokio::time::timeout(self.write_timeout, self.insert_inner(reading))
            .await
            .unwrap_or(Err(Error::StorageWriteTimeout(self.write_timeout)));

        match &result {
            Ok(()) => INSERT_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64()),
            Err(_) => STORE_FAILURES_TOTAL.inc(),
        }

        result
    }

    async fn insert_inner(&self, reading: &NewReading) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO dht_readings (timestamp, temperature, humidity) VALUES (?, ?, ?)",
        )
        .bind(&reading.timestamp)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .execute(&self.pool)
        .await
        .map_err(Error::StorageWrite)?;

        debug!("Inserted reading with id {}", result.last_insert_rowid());
        Ok(())
    }

    pub async fn latest(&self) -> Result<Reading> {
        sqlx::query_as::<_, Reading>(
            "SELECT id, timestamp, temperature, humidity FROM dht_readings ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Query)?
        .ok_or(Error::NotFound)
    }

    /// Up to `count` most recent readings, newest first.
    pub async fn history(&self, count: i64) -> Result<Vec<Reading>> {
        if count <= 0 {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Reading>(
            "SELECT id, timestamp, temperature, humidity FROM dht_readings ORDER BY id DESC LIMIT ?",
        )
        .bind(count)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Query)
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dht_readings")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Query)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
