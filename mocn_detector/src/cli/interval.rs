use crate::{interval::IntervalConfig, Settings};
use anyhow::Result;
use futures::StreamExt;

#[derive(Debug, clap::Args)]
pub struct Cmd {
    #[clap(subcommand)]
    cmd: IntervalCmd,
}

#[derive(Debug, clap::Subcommand)]
enum IntervalCmd {
    /// Print the refresh interval in seconds
    Get,
    /// Set the refresh interval, between 5 and 600 seconds
    Set { seconds: u32 },
    /// Print the refresh interval now and every time it changes
    Watch,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let pool = crate::connect(settings).await?;
        let interval = IntervalConfig::new(pool);

        match self.cmd {
            IntervalCmd::Get => println!("{}", interval.get().await?),
            IntervalCmd::Set { seconds } => interval.set(seconds).await?,
            IntervalCmd::Watch => {
                let mut changes = interval.watch();
                while let Some(seconds) = changes.next().await {
                    println!("{seconds}");
                }
            }
        }
        Ok(())
    }
}
