use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::SqlitePool;
use thiserror::Error;

const LOGGED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeatherLogRecord {
    pub id: i64,
    pub city: Option<String>,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<i64>,
    pub description: Option<String>,
    #[serde(serialize_with = "serialize_logged_at")]
    pub logged_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWeatherLog {
    pub city: Option<String>,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<i64>,
    pub description: Option<String>,
    /// UTC; the insert time is used when absent.
    pub logged_at: Option<NaiveDateTime>,
}

fn serialize_logged_at<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&ts.format(LOGGED_AT_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

/// Append-only history of fetched readings.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS weather_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT,
                temp REAL,
                feels_like REAL,
                humidity INTEGER,
                description TEXT,
                logged_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_weather_logs_city ON weather_logs(city)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_weather_logs_logged_at ON weather_logs(logged_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn append(&self, record: NewWeatherLog) -> Result<WeatherLogRecord, DatabaseError> {
        let logged_at = record
            .logged_at
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());

        let result = sqlx::query_as::<_, WeatherLogRecord>(
            r#"
            INSERT INTO weather_logs (city, temp, feels_like, humidity, description, logged_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, city, temp, feels_like, humidity, description, logged_at
            "#,
        )
        .bind(record.city)
        .bind(record.temp)
        .bind(record.feels_like)
        .bind(record.humidity)
        .bind(record.description)
        .bind(logged_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<WeatherLogRecord>, DatabaseError> {
        let limit = limit.max(0);

        let results = sqlx::query_as::<_, WeatherLogRecord>(
            r#"
            SELECT id, city, temp, feels_like, humidity, description, logged_at
            FROM weather_logs
            ORDER BY logged_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weather_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn memory_database() -> Database {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let database = Database::new(pool);
    database.init_tables().await.unwrap();
    database
}
