use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] db_store::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("store error: {0}")]
    Store(#[from] crate::observation::StoreError),
    #[error("interval error: {0}")]
    Interval(#[from] crate::interval::IntervalError),
    #[error("monitor error: {0}")]
    Monitor(#[from] crate::monitor::MonitorError),
    #[error("export error: {0}")]
    Export(#[from] crate::export::ExportError),
}
