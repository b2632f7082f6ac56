use crate::{export, observation::ObservationStore, Settings};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct Cmd {
    /// File to write to. Writes to stdout when absent
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let pool = crate::connect(settings).await?;
        let store = ObservationStore::new(pool);

        let written = match &self.output {
            Some(path) => export::export_to_file(&store, path).await?,
            None => export::export_all(&store, tokio::io::stdout()).await?,
        };
        tracing::info!(written, "export complete");
        Ok(())
    }
}
