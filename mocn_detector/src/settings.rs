use crate::{mocn::CellAttribution, radio, telemetry};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// RUST_LOG compatible settings string. Default to
    /// "mocn_detector=debug,db_store=info"
    #[serde(default = "default_log")]
    pub log: String,
    #[serde(default)]
    pub database: db_store::Settings,
    #[serde(default)]
    pub radio: radio::Settings,
    /// Prometheus scrape endpoint. Metrics are not exported when absent
    pub metrics: Option<telemetry::Settings>,
    /// Which identity each recorded cell is described by. Default "each_cell"
    #[serde(default)]
    pub cell_attribution: CellAttribution,
}

pub fn default_log() -> String {
    "mocn_detector=debug,db_store=info".to_string()
}

impl Settings {
    /// Load Settings from a given path. Settings are loaded from a given
    /// optional path and can be overriden with environment variables.
    ///
    /// Environment overrides have the same name as the entries in the settings
    /// file in uppercase and prefixed with "MOCN_", with "__" between a section
    /// and its key. For example "MOCN_DATABASE__URL" will override the database
    /// url and "MOCN_CELL_ATTRIBUTION" the cell attribution.
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = path {
            // Add optional settings file
            builder = builder
                .add_source(File::with_name(&file.as_ref().to_string_lossy()).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("MOCN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|config| config.try_deserialize())
    }
}
