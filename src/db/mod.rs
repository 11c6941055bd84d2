pub mod models;

use std::{str::FromStr, time::Duration};

use chrono::NaiveDate;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{info, warn};

use self::models::{NewReading, Reading, DATE_FORMAT};

/// Size of the window served by `GET /api/history`.
pub const HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const CREATE_READINGS: &str = r#"
    CREATE TABLE IF NOT EXISTS readings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        air_temp_f REAL,
        humidity REAL,
        lux REAL,
        soil_temp_f REAL,
        soil_moisture INTEGER,
        batt_volts REAL,
        batt_pct REAL
    )
"#;

/// Value columns that an older `readings` table may lack, with the type used
/// when adding them. `timestamp` is not listed: every table version has it as
/// `NOT NULL`, and a nullable copy would not decode into `Reading`.
const MIGRATABLE_COLUMNS: &[(&str, &str)] = &[
    ("air_temp_f", "REAL"),
    ("humidity", "REAL"),
    ("lux", "REAL"),
    ("soil_temp_f", "REAL"),
    ("soil_moisture", "INTEGER"),
    ("batt_volts", "REAL"),
    ("batt_pct", "REAL"),
];

const INSERT_READING: &str = r#"
    INSERT INTO readings
        (timestamp, air_temp_f, humidity, lux,
         soil_temp_f, soil_moisture, batt_volts, batt_pct)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_LATEST: &str = r#"
    SELECT id, timestamp, air_temp_f, humidity, lux,
           soil_temp_f, soil_moisture, batt_volts, batt_pct
    FROM readings
    ORDER BY id DESC
    LIMIT 1
"#;

const SELECT_RECENT: &str = r#"
    SELECT id, timestamp, air_temp_f, humidity, lux,
           soil_temp_f, soil_moisture, batt_volts, batt_pct
    FROM readings
    ORDER BY id DESC
    LIMIT ?
"#;

const SELECT_DATES: &str = r#"
    SELECT DISTINCT substr(timestamp, 1, 10) AS day
    FROM readings
    ORDER BY day DESC
"#;

const SELECT_ALL_ASC: &str = r#"
    SELECT id, timestamp, air_temp_f, humidity, lux,
           soil_temp_f, soil_moisture, batt_volts, batt_pct
    FROM readings
    ORDER BY id ASC
"#;

const SELECT_ON_DATE_ASC: &str = r#"
    SELECT id, timestamp, air_temp_f, humidity, lux,
           soil_temp_f, soil_moisture, batt_volts, batt_pct
    FROM readings
    WHERE substr(timestamp, 1, 10) = ?
    ORDER BY id ASC
"#;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Append-only store of telemetry readings.
///
/// Cheap to clone; every clone shares the same pool. `append`, `latest` and
/// `recent` are single statements, so atomicity and write serialisation come
/// from SQLite.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    pool: SqlitePool,
}

impl ReadingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the `readings` table if needed and adds any value column an
    /// older table is missing. Safe to run on every start; existing rows are
    /// never touched.
    ///
    /// Returns the names of the columns that had to be added.
    pub async fn initialize(&self) -> Result<Vec<&'static str>, StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(CREATE_READINGS).execute(&mut *tx).await?;

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('readings')")
                .fetch_all(&mut *tx)
                .await?;

        let mut added = Vec::new();
        for &(name, kind) in MIGRATABLE_COLUMNS {
            if existing.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                continue;
            }
            let ddl = format!("ALTER TABLE readings ADD COLUMN {name} {kind}");
            sqlx::query(&ddl).execute(&mut *tx).await?;
            warn!(column = name, "readings table was missing a column; added it");
            added.push(name);
        }

        tx.commit().await?;
        info!(added = added.len(), "readings table ready");
        Ok(added)
    }

    /// Inserts one row and returns its id. Ids are strictly increasing and
    /// never reused.
    pub async fn append(&self, reading: &NewReading) -> Result<i64, StorageError> {
        let result = sqlx::query(INSERT_READING)
            .bind(reading.timestamp.as_str())
            .bind(reading.air_temp_f)
            .bind(reading.humidity)
            .bind(reading.lux)
            .bind(reading.soil_temp_f)
            .bind(reading.soil_moisture)
            .bind(reading.batt_volts)
            .bind(reading.batt_pct)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// The row with the highest id, or `None` when nothing has been stored yet.
    pub async fn latest(&self) -> Result<Option<Reading>, StorageError> {
        let row = sqlx::query_as::<_, Reading>(SELECT_LATEST)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Up to `limit` rows, most recent (highest id) first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Reading>, StorageError> {
        let rows = sqlx::query_as::<_, Reading>(SELECT_RECENT)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Distinct `YYYY-MM-DD` days that have at least one reading, newest first.
    pub async fn dates(&self) -> Result<Vec<String>, StorageError> {
        let days = sqlx::query_scalar::<_, String>(SELECT_DATES)
            .fetch_all(&self.pool)
            .await?;
        Ok(days)
    }

    /// Every reading stamped on `day`, or every reading when `day` is `None`,
    /// oldest first so the rows plot left to right.
    pub async fn on_date(&self, day: Option<NaiveDate>) -> Result<Vec<Reading>, StorageError> {
        let rows = match day {
            Some(day) => {
                sqlx::query_as::<_, Reading>(SELECT_ON_DATE_ASC)
                    .bind(day.format(DATE_FORMAT).to_string())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Reading>(SELECT_ALL_ASC)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// A single-connection in-memory pool. The connection never idles out, so the
/// database lives as long as the pool.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

#[cfg(test)]
pub(crate) async fn memory_store() -> ReadingStore {
    let store = ReadingStore::new(memory_pool().await);
    store.initialize().await.unwrap();
    store
}

/// A store on a fresh database file in the system temp dir, opened through
/// `create_pool` like the server does (WAL, busy timeout, several connections).
#[cfg(test)]
pub(crate) async fn file_store(name: &str, max_connections: u32) -> (ReadingStore, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!(
        "plant-telemetry-{}-{name}.db",
        std::process::id()
    ));
    remove_db_files(&path);

    let url = format!("sqlite://{}", path.display());
    let store = ReadingStore::new(create_pool(&url, max_connections).await.unwrap());
    store.initialize().await.unwrap();
    (store, path)
}

#[cfg(test)]
pub(crate) fn remove_db_files(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
