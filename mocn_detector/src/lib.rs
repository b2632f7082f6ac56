mod error;
mod settings;

pub mod cli;
pub mod export;
pub mod interval;
pub mod mocn;
pub mod monitor;
pub mod observation;
pub mod radio;
pub mod rat;
pub mod telemetry;

pub use error::{Error, Result};
pub use settings::Settings;

use sqlx::{Pool, Sqlite};

/// Connects to the configured database and applies any pending migrations.
pub async fn connect(settings: &Settings) -> Result<Pool<Sqlite>> {
    let pool = settings.database.connect(4).await?;
    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}
