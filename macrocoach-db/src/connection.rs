use std::{env, sync::Arc};

use dotenv::dotenv;
use log::debug;
use sqlx::{Connection as SqlxConnection, Executor, SqliteConnection};
use tokio::sync::{Mutex, MutexGuard};

use crate::StoreError;

const SETUP_QUERY: &str = "PRAGMA mmap_size = 30000000000;
PRAGMA cache_size = -1000;
PRAGMA page_size = 4096;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;";

const SCHEMA_QUERY: &str = "CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT,
    is_admin BOOLEAN NOT NULL DEFAULT FALSE,
    is_premium BOOLEAN NOT NULL DEFAULT FALSE,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS metrics (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS metric_values (
    metric_id TEXT NOT NULL,
    value_type INTEGER NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (metric_id, value_type)
);
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    sender_id TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    read_at INTEGER
);
CREATE TABLE IF NOT EXISTS assessments (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    goal TEXT NOT NULL,
    activity_level TEXT NOT NULL,
    dietary_notes TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS meals (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    calories INTEGER NOT NULL,
    protein INTEGER NOT NULL,
    carbs INTEGER NOT NULL,
    fat INTEGER NOT NULL,
    image_url TEXT,
    recipe TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS nutrition_plans (
    id TEXT PRIMARY KEY NOT NULL,
    assessment_id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    calories INTEGER,
    protein INTEGER,
    carbs INTEGER,
    fat INTEGER,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL
);";

#[derive(Clone)]
pub struct Connection {
    inner: Arc<Mutex<SqliteConnection>>,
}

impl Connection {
    /// Connects to the database named by `DATABASE_URL`, reading `.env` if present.
    pub async fn establish() -> Result<Self, StoreError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL").map_err(|_| StoreError::MissingUrl)?;
        Self::open(&database_url).await
    }

    pub async fn open(database_url: &str) -> Result<Self, StoreError> {
        debug!("Opening database {}", database_url);
        let mut connection = SqliteConnection::connect(database_url).await?;

        connection.execute(SETUP_QUERY).await?;
        connection.execute(SCHEMA_QUERY).await?;

        Ok(Self {
            inner: Arc::new(Mutex::new(connection)),
        })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn lock(&self) -> MutexGuard<'_, SqliteConnection> {
        self.inner.lock().await
    }
}
