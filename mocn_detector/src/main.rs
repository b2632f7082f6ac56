use anyhow::Result;
use clap::Parser;
use mocn_detector::{
    cli::{check, export, interval, purge, recent, server},
    Settings,
};
use std::path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::Parser)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "MOCN and RAN sharing detector")]
pub struct Cli {
    /// Optional configuration file to use. If present the toml file at the
    /// given path will be loaded. Environment variables can override the
    /// settings in the given file.
    #[clap(short = 'c')]
    config: Option<path::PathBuf>,

    #[clap(subcommand)]
    cmd: Cmd,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let settings = Settings::new(self.config)?;
        // Logs go to stderr so exports to stdout stay clean
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(&settings.log))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        self.cmd.run(settings).await
    }
}

#[derive(clap::Subcommand)]
pub enum Cmd {
    /// Run the monitoring loop until interrupted
    Server(server::Cmd),
    /// Classify the current radio state once without recording it
    Check(check::Cmd),
    /// Print the most recent observations
    Recent(recent::Cmd),
    /// Export every recorded observation as JSON lines
    Export(export::Cmd),
    /// Delete every recorded observation
    Purge(purge::Cmd),
    /// Read or change the refresh interval
    Interval(interval::Cmd),
}

impl Cmd {
    pub async fn run(self, settings: Settings) -> Result<()> {
        match self {
            Self::Server(cmd) => cmd.run(&settings).await,
            Self::Check(cmd) => cmd.run(&settings).await,
            Self::Recent(cmd) => cmd.run(&settings).await,
            Self::Export(cmd) => cmd.run(&settings).await,
            Self::Purge(cmd) => cmd.run(&settings).await,
            Self::Interval(cmd) => cmd.run(&settings).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
