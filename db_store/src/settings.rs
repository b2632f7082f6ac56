use crate::{Error, Result};
use serde::Deserialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Max open connections to the database. If absent a default is calculated
    /// by application code
    pub max_connections: Option<u32>,
    /// URL of the sqlite database. For example:
    /// sqlite:///var/data/mocn/mocn.db
    #[serde(default = "default_url")]
    pub url: String,
}

pub fn default_url() -> String {
    "sqlite://mocn.db".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_connections: None,
            url: default_url(),
        }
    }
}

impl Settings {
    /// Open (creating when missing) the sqlite database in WAL mode so that
    /// readers are never blocked by the single writer.
    pub async fn connect(&self, default_max_connections: usize) -> Result<Pool<Sqlite>> {
        if !self.url.starts_with("sqlite:") {
            return Err(Error::InvalidUrl(self.url.clone()));
        }
        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|_| Error::InvalidUrl(self.url.clone()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let max_connections = self
            .max_connections
            .unwrap_or(default_max_connections as u32);
        tracing::debug!(url = %self.url, max_connections, "connecting to database");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(pool)
    }
}
