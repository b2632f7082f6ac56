use crate::{observation::ObservationStore, Settings};
use anyhow::Result;

#[derive(Debug, clap::Args)]
pub struct Cmd {}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let pool = crate::connect(settings).await?;
        let deleted = ObservationStore::new(pool).delete_all().await?;
        tracing::info!(deleted, "deleted all observations");
        Ok(())
    }
}
