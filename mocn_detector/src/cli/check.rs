use crate::{mocn::MocnClassifier, monitor, radio::FileRadio, radio::PermissionCheck, Settings};
use anyhow::{bail, Result};

#[derive(Debug, clap::Args)]
pub struct Cmd {}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let radio = FileRadio::from_settings(&settings.radio);
        if !radio.has_required_permissions() {
            bail!("radio snapshot {} is not readable", radio.path().display());
        }

        let classifier = MocnClassifier::new(settings.cell_attribution);
        let observations = monitor::check_once(&radio, &classifier).await;
        if observations.is_empty() {
            tracing::info!("no registered cells to classify");
        }

        for (subscription, observation) in observations {
            println!(
                "{}",
                serde_json::json!({
                    "subscription": subscription,
                    "observation": observation,
                })
            );
        }
        Ok(())
    }
}
