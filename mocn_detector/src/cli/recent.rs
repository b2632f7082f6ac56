use crate::{
    observation::{ObservationStore, DEFAULT_RECENT_LIMIT},
    Settings,
};
use anyhow::Result;
use futures::StreamExt;

#[derive(Debug, clap::Args)]
pub struct Cmd {
    /// Maximum number of observations to print, newest first
    #[clap(long, default_value_t = DEFAULT_RECENT_LIMIT)]
    limit: u32,
    /// Keep printing the recent observations whenever they change
    #[clap(long)]
    follow: bool,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let pool = crate::connect(settings).await?;
        let store = ObservationStore::new(pool);

        let mut recent = store.watch_recent(self.limit);
        while let Some(page) = recent.next().await {
            for observation in page? {
                println!("{}", serde_json::to_string(&observation)?);
            }
            if !self.follow {
                break;
            }
            println!();
        }
        Ok(())
    }
}
